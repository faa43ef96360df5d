//! Channel process supervisor
//!
//! Supervises a fleet of long-running relay worker processes. Each channel
//! owns one worker, watches its output to decide whether a stream is flowing,
//! and reports status transitions. The fleet restarts crashed workers, demotes
//! stalled streams and pushes snapshots to every connected observer.

pub mod config;
pub mod core;
pub mod error;
pub mod fleet;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use config::{ChannelSpec, ChannelUpdate, FleetConfig, FleetSettings, NewChannel, SupervisorTimings};
pub use crate::core::{Channel, LivenessEvent, ObserverId, StatusBroadcastHub, WorkerProcess};
pub use error::{SupervisorError, SupervisorResult};
pub use fleet::Fleet;
pub use services::{JsonConfigStore, QueuedNotifier, SnapshotSender};
pub use traits::{ConfigStore, StatusChange, StatusNotifier, StatusObserver};
