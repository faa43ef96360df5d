//! Trait definitions with mockall annotations for testing
//!
//! These are the seams between the supervisor core and its collaborators:
//! configuration persistence, status-change notification and the observers
//! that receive fleet snapshots.

use shared::{ChannelId, ChannelStatus, FleetSnapshot};

use crate::config::FleetConfig;
use crate::error::SupervisorResult;

/// A channel changed status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub channel: ChannelId,
    pub status: ChannelStatus,
}

/// Persistence of the fleet configuration document
///
/// Loaded once at startup and written back whole whenever a channel is
/// created or updated.
#[mockall::automock]
#[async_trait::async_trait]
pub trait ConfigStore: Send + Sync {
    /// Read the stored configuration
    async fn load(&self) -> SupervisorResult<FleetConfig>;

    /// Replace the stored configuration
    async fn save(&self, config: &FleetConfig) -> SupervisorResult<()>;
}

/// Notification capability handed to each channel
///
/// A channel reports its own transitions through this sink and never holds a
/// reference to the fleet that owns it. Implementations must not block.
#[mockall::automock]
pub trait StatusNotifier: Send + Sync {
    fn status_changed(&self, change: StatusChange);
}

/// Receiver of fleet snapshots
#[mockall::automock]
#[async_trait::async_trait]
pub trait StatusObserver: Send + Sync {
    /// Deliver one snapshot; an error or a hang gets the observer dropped
    async fn deliver(&self, snapshot: &FleetSnapshot) -> SupervisorResult<()>;
}
