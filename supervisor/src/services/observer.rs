//! Observer backed by a bounded queue
//!
//! The consumer side (a WebSocket writer, a test) drains the receiver. When it
//! falls behind the queue fills up and `deliver` waits, which the broadcast
//! round turns into a timeout and a dropped observer.

use async_trait::async_trait;
use shared::FleetSnapshot;
use tokio::sync::mpsc;

use crate::error::{SupervisorError, SupervisorResult};
use crate::traits::StatusObserver;

pub struct SnapshotSender {
    sender: mpsc::Sender<FleetSnapshot>,
}

impl SnapshotSender {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<FleetSnapshot>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl StatusObserver for SnapshotSender {
    async fn deliver(&self, snapshot: &FleetSnapshot) -> SupervisorResult<()> {
        self.sender
            .send(snapshot.clone())
            .await
            .map_err(|_| SupervisorError::delivery("observer receiver closed"))
    }
}
