//! Core supervision logic
//!
//! Process handling, output-driven liveness detection, the channel state
//! machine and the observer hub. The fleet in `crate::fleet` ties them
//! together.

pub mod broadcast;
pub mod channel;
pub mod liveness;
pub mod log_sink;
pub mod process;

#[cfg(test)]
pub(crate) mod tests;

pub use broadcast::{BroadcastReport, ObserverId, StatusBroadcastHub};
pub use channel::Channel;
pub use liveness::{classify_line, ClassifiedLine, LivenessDetector, LivenessEvent};
pub use log_sink::LogSink;
pub use process::{OutputLines, WorkerProcess};
