//! Supervisor-specific error types

use shared::{ChannelId, SharedError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to spawn worker process `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Channel not found: {id}")]
    ChannelNotFound { id: ChannelId },

    #[error("Configuration persistence failed: {message}")]
    Persistence { message: String },

    #[error("Observer delivery failed: {message}")]
    Delivery { message: String },

    #[error("Shared component error: {0}")]
    Shared(#[from] SharedError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SupervisorError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence { message: message.into() }
    }

    pub fn delivery(message: impl Into<String>) -> Self {
        Self::Delivery { message: message.into() }
    }

    /// Whether the caller supplied something invalid, as opposed to a runtime failure
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Shared(_))
    }
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;
