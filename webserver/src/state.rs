//! Shared handler state

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use supervisor::Fleet;

/// State handed to every route
pub struct AppState {
    pub fleet: Arc<Fleet>,
    /// Directory holding `index.html` and the `static/` asset tree
    pub static_dir: PathBuf,
    pub server_start_time: Instant,
    connection_count: AtomicU32,
}

impl AppState {
    pub fn new(fleet: Arc<Fleet>, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            fleet,
            static_dir: static_dir.into(),
            server_start_time: Instant::now(),
            connection_count: AtomicU32::new(0),
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.server_start_time.elapsed().as_secs()
    }

    /// Open WebSocket connections
    pub fn get_connection_count(&self) -> u32 {
        self.connection_count.load(Ordering::Relaxed)
    }

    pub fn increment_connection_count(&self) -> u32 {
        self.connection_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn decrement_connection_count(&self) -> u32 {
        self.connection_count.fetch_sub(1, Ordering::Relaxed).saturating_sub(1)
    }
}
