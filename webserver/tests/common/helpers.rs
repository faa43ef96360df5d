//! Test helper utilities for webserver integration tests

use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use shared::{ChannelId, ChannelStatus};
use supervisor::{Fleet, JsonConfigStore};
use webserver::WebServer;

use super::fixtures;

/// A webserver on an ephemeral port over a fleet loaded from a temp dir
pub struct TestServer {
    pub addr: SocketAddr,
    pub fleet: Arc<Fleet>,
    pub dir: TempDir,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    pub async fn start(channels: Value) -> Self {
        let dir = TempDir::new().unwrap();
        let config_path = fixtures::write_config(&dir, &fixtures::config_document(&dir, channels));
        let frontend = fixtures::write_frontend(&dir);

        let fleet = Fleet::load(Arc::new(JsonConfigStore::new(config_path))).await.unwrap();
        let server = WebServer::new(Arc::clone(&fleet), frontend);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            server
                .serve(listener, async {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            fleet,
            dir,
            shutdown: Some(shutdown),
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn status_of(&self, id: u32) -> ChannelStatus {
        self.fleet.channel(ChannelId::new(id).unwrap()).unwrap().status()
    }

    /// Shut the HTTP side down and stop every channel
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
        }
        self.fleet.stop_all().await;
    }
}

/// Poll `condition` until it holds or `timeout_ms` passes
pub async fn wait_for_condition<F>(mut condition: F, timeout_ms: u64) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() > deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
