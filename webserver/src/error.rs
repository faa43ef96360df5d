//! WebServer-specific error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use shared::SharedError;
use supervisor::SupervisorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebServerError {
    #[error("Server startup error: {0}")]
    ServerStartup(String),

    #[error("Invalid request format: {details}")]
    InvalidRequest { details: String },

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    #[error("Invalid identifier: {0}")]
    Shared(#[from] SharedError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WebServerError {
    pub fn startup(message: impl Into<String>) -> Self {
        Self::ServerStartup(message.into())
    }

    pub fn invalid_request(details: impl Into<String>) -> Self {
        Self::InvalidRequest { details: details.into() }
    }

    /// HTTP status reported for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Supervisor(SupervisorError::ChannelNotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Supervisor(e) if e.is_config() => StatusCode::BAD_REQUEST,
            Self::InvalidRequest { .. } | Self::Shared(_) | Self::Json(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }
        (status, Json(json!({ "status": "error", "detail": self.to_string() }))).into_response()
    }
}

pub type WebServerResult<T> = Result<T, WebServerError>;
