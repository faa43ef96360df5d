//! Status broadcast hub
//!
//! Keeps the set of connected observers and pushes fleet snapshots to them.
//! Every observer gets its own delivery future with its own timeout, so a
//! stalled or closed observer is pruned without delaying the rest.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use futures_util::future::join_all;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared::FleetSnapshot;

use crate::traits::StatusObserver;

/// Handle returned by `connect`, used to disconnect later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(Uuid);

impl ObserverId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of one broadcast round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
}

pub struct StatusBroadcastHub {
    observers: RwLock<HashMap<ObserverId, Arc<dyn StatusObserver>>>,
    delivery_timeout: Duration,
}

impl StatusBroadcastHub {
    pub fn new(delivery_timeout: Duration) -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            delivery_timeout,
        }
    }

    /// Register an observer, then hand it the snapshot `current` produces
    ///
    /// The observer is registered before the initial delivery, so broadcasts
    /// issued while that delivery is in flight reach it too. An observer that
    /// cannot take the initial snapshot is removed again, but it still gets an
    /// id so the caller's disconnect path stays uniform.
    pub async fn connect<F>(&self, observer: Arc<dyn StatusObserver>, current: F) -> ObserverId
    where
        F: FnOnce() -> FleetSnapshot,
    {
        let id = ObserverId::new();
        let count = {
            let mut observers = self.observers.write().await;
            observers.insert(id, Arc::clone(&observer));
            observers.len()
        };

        let snapshot = current();
        let failure = match timeout(self.delivery_timeout, observer.deliver(&snapshot)).await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some("timed out".to_string()),
        };

        match failure {
            None => info!(observer = %id, observers = count, "👋 Observer connected"),
            Some(reason) => {
                self.observers.write().await.remove(&id);
                warn!(observer = %id, reason = %reason, "Initial snapshot delivery failed, observer dropped");
            }
        }
        id
    }

    /// Remove an observer; returns whether it was still registered
    pub async fn disconnect(&self, id: ObserverId) -> bool {
        let removed = self.observers.write().await.remove(&id).is_some();
        if removed {
            info!(observer = %id, "👋 Observer disconnected");
        }
        removed
    }

    pub async fn observer_count(&self) -> usize {
        self.observers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.observers.read().await.is_empty()
    }

    /// Deliver `snapshot` to every observer concurrently
    ///
    /// Observers that fail or exceed the delivery timeout are deregistered.
    pub async fn broadcast(&self, snapshot: &FleetSnapshot) -> BroadcastReport {
        // Clone the handles out so the lock is not held across deliveries
        let targets: Vec<(ObserverId, Arc<dyn StatusObserver>)> = {
            let observers = self.observers.read().await;
            observers.iter().map(|(id, observer)| (*id, Arc::clone(observer))).collect()
        };

        if targets.is_empty() {
            return BroadcastReport::default();
        }

        let deliveries = targets.iter().map(|(id, observer)| {
            let id = *id;
            async move {
                match timeout(self.delivery_timeout, observer.deliver(snapshot)).await {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => {
                        warn!(observer = %id, error = %e, "Snapshot delivery failed");
                        Some(id)
                    }
                    Err(_) => {
                        warn!(observer = %id, timeout_secs = self.delivery_timeout.as_secs_f64(), "Snapshot delivery timed out");
                        Some(id)
                    }
                }
            }
        });
        let failed: Vec<ObserverId> = join_all(deliveries).await.into_iter().flatten().collect();

        if !failed.is_empty() {
            let mut observers = self.observers.write().await;
            for id in &failed {
                if observers.remove(id).is_some() {
                    info!(observer = %id, "🗑️ Removed unresponsive observer");
                }
            }
        }

        let report = BroadcastReport {
            delivered: targets.len() - failed.len(),
            dropped: failed.len(),
        };
        debug!(delivered = report.delivered, dropped = report.dropped, "📡 Snapshot broadcast complete");
        report
    }
}
