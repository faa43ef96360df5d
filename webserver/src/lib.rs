//! Webserver for the channel supervisor
//!
//! Exposes the fleet over HTTP: channel queries and control operations, a
//! WebSocket feed of live status snapshots and the static frontend.

pub mod error;
pub mod state;
pub mod types;
pub mod web;
pub mod webserver_impl;

// Re-export main types
pub use error::{WebServerError, WebServerResult};
pub use state::AppState;
pub use types::*;
pub use webserver_impl::WebServer;
