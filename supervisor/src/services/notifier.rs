//! Queue-backed status notifier
//!
//! Channels push their transitions into an unbounded queue; the fleet drains
//! it on its own task. Pushing never blocks or fails from the channel's side.

use tokio::sync::mpsc;

use crate::traits::{StatusChange, StatusNotifier};

#[derive(Clone)]
pub struct QueuedNotifier {
    sender: mpsc::UnboundedSender<StatusChange>,
}

impl QueuedNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StatusChange>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl StatusNotifier for QueuedNotifier {
    fn status_changed(&self, change: StatusChange) {
        // Receiver gone means the fleet is shutting down
        let _ = self.sender.send(change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{ChannelId, ChannelStatus};

    #[tokio::test]
    async fn test_changes_arrive_in_order() {
        let (notifier, mut receiver) = QueuedNotifier::new();
        let channel = ChannelId::new(1).unwrap();

        notifier.status_changed(StatusChange { channel, status: ChannelStatus::Listening });
        notifier.status_changed(StatusChange { channel, status: ChannelStatus::Active });

        assert_eq!(receiver.recv().await.unwrap().status, ChannelStatus::Listening);
        assert_eq!(receiver.recv().await.unwrap().status, ChannelStatus::Active);
    }

    #[test]
    fn test_send_after_receiver_dropped_is_silent() {
        let (notifier, receiver) = QueuedNotifier::new();
        drop(receiver);
        notifier.status_changed(StatusChange {
            channel: ChannelId::new(1).unwrap(),
            status: ChannelStatus::Inactive,
        });
    }
}
