//! Shared types for the channel relay supervisor
//!
//! Contains only the types that cross crate boundaries: channel identity and
//! status, the snapshot pushed to observers, the shared error type and the
//! logging utilities used by every crate in the workspace.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
