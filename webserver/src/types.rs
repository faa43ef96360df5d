//! Request and response bodies of the HTTP API
//!
//! Channel creation and update bodies are the supervisor's own
//! `NewChannel` and `ChannelUpdate`; snapshots are served as-is.

use serde::{Deserialize, Serialize};

use shared::ChannelId;

pub use supervisor::{ChannelUpdate, NewChannel};

/// Success reply of a control operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub status: String,
    pub message: String,
}

impl CommandResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }
}

/// Reply to channel creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCreated {
    pub status: String,
    pub id: ChannelId,
}

impl ChannelCreated {
    pub fn new(id: ChannelId) -> Self {
        Self {
            status: "success".to_string(),
            id,
        }
    }
}

/// Liveness probe body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: i64,
    pub uptime_seconds: u64,
    pub channels: usize,
    pub connections: u32,
}

/// Control operations addressed by channel id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelCommand {
    Start,
    Stop,
    Restart,
}

impl ChannelCommand {
    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::Start => "started",
            Self::Stop => "stopped",
            Self::Restart => "restarted",
        }
    }
}
