//! Service implementations
//!
//! Production implementations of the collaborator traits.

pub mod config_store;
pub mod notifier;
pub mod observer;

pub use config_store::JsonConfigStore;
pub use notifier::QueuedNotifier;
pub use observer::SnapshotSender;
