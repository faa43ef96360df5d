//! Fleet supervisor
//!
//! Owns every channel, runs the periodic health sweep and is the single source
//! of truth for fleet status. Channel transitions arrive through a queued
//! notifier and are coalesced into snapshot broadcasts on a pump task.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use futures_util::future::join_all;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use shared::{channel_warn, ChannelId, FleetSnapshot};

use crate::config::{ChannelUpdate, FleetConfig, FleetSettings, NewChannel};
use crate::core::{BroadcastReport, Channel, ObserverId, StatusBroadcastHub};
use crate::error::{SupervisorError, SupervisorResult};
use crate::services::QueuedNotifier;
use crate::traits::{ConfigStore, StatusChange, StatusNotifier, StatusObserver};

pub struct Fleet {
    settings: Arc<FleetSettings>,
    channels: RwLock<BTreeMap<ChannelId, Arc<Channel>>>,
    hub: StatusBroadcastHub,
    store: Arc<dyn ConfigStore>,
    notifier: Arc<dyn StatusNotifier>,
    /// Serializes read-modify-write cycles on the persisted document
    config_lock: Mutex<()>,
}

impl Fleet {
    /// Build the fleet from a validated configuration
    ///
    /// Spawns the notification pump, so this must run inside a tokio runtime.
    /// No channel is started; call `start_all` for that.
    pub fn new(config: FleetConfig, store: Arc<dyn ConfigStore>) -> SupervisorResult<Arc<Self>> {
        config.validate()?;

        let settings = Arc::new(config.settings);
        let (notifier, receiver) = QueuedNotifier::new();
        let notifier: Arc<dyn StatusNotifier> = Arc::new(notifier);

        let channels = config
            .channels
            .into_iter()
            .map(|spec| {
                let id = spec.id;
                (id, Channel::new(spec, Arc::clone(&settings), Arc::clone(&notifier)))
            })
            .collect::<BTreeMap<_, _>>();

        info!(channels = channels.len(), "🏗️ Fleet created");

        let fleet = Arc::new(Self {
            hub: StatusBroadcastHub::new(settings.timings.broadcast_timeout),
            settings,
            channels: RwLock::new(channels),
            store,
            notifier,
            config_lock: Mutex::new(()),
        });

        tokio::spawn(pump_notifications(Arc::downgrade(&fleet), receiver));
        Ok(fleet)
    }

    /// Load the configuration from `store` and build the fleet from it
    pub async fn load(store: Arc<dyn ConfigStore>) -> SupervisorResult<Arc<Self>> {
        let config = store.load().await?;
        Self::new(config, store)
    }

    pub fn settings(&self) -> &FleetSettings {
        &self.settings
    }

    pub fn channel(&self, id: ChannelId) -> SupervisorResult<Arc<Channel>> {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or(SupervisorError::ChannelNotFound { id })
    }

    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.channels.read().unwrap_or_else(PoisonError::into_inner).keys().copied().collect()
    }

    fn all_channels(&self) -> Vec<Arc<Channel>> {
        self.channels.read().unwrap_or_else(PoisonError::into_inner).values().cloned().collect()
    }

    /// Per-channel snapshots ordered by id; never waits on a channel operation
    pub fn get_all_statuses(&self) -> FleetSnapshot {
        self.all_channels().iter().map(|channel| channel.snapshot()).collect()
    }

    /// The configuration document as it would be persisted right now
    pub fn current_config(&self) -> FleetConfig {
        FleetConfig {
            settings: (*self.settings).clone(),
            channels: self.all_channels().iter().map(|channel| channel.spec()).collect(),
        }
    }

    /// Start every enabled channel concurrently
    ///
    /// Individual failures leave that channel in `Error` and are logged.
    pub async fn start_all(&self) {
        let channels: Vec<Arc<Channel>> = self.all_channels().into_iter().filter(|c| c.is_enabled()).collect();
        info!(channels = channels.len(), "🚀 Starting all enabled channels");

        let results = join_all(channels.iter().map(|channel| channel.start())).await;
        for (channel, result) in channels.iter().zip(results) {
            if let Err(e) = result {
                error!(channel = %channel.label(), error = %e, "Channel failed to start");
            }
        }
    }

    /// Stop every channel concurrently
    pub async fn stop_all(&self) {
        let channels = self.all_channels();
        info!(channels = channels.len(), "🛑 Stopping all channels");

        let results = join_all(channels.iter().map(|channel| channel.stop())).await;
        for (channel, result) in channels.iter().zip(results) {
            if let Err(e) = result {
                error!(channel = %channel.label(), error = %e, "Channel failed to stop cleanly");
            }
        }
    }

    pub async fn start_channel(&self, id: ChannelId) -> SupervisorResult<()> {
        self.channel(id)?.start().await
    }

    pub async fn stop_channel(&self, id: ChannelId) -> SupervisorResult<()> {
        self.channel(id)?.stop().await
    }

    pub async fn restart_channel(&self, id: ChannelId) -> SupervisorResult<()> {
        self.channel(id)?.restart().await
    }

    /// Create, persist and start a new channel
    ///
    /// An explicit id must be free; otherwise the next id after the highest in
    /// use is allocated. A start failure does not undo the creation, it shows
    /// up as the channel's `Error` status.
    pub async fn add_channel(&self, request: NewChannel) -> SupervisorResult<ChannelId> {
        let channel = {
            let _config = self.config_lock.lock().await;
            let mut config = self.current_config();

            let id = match request.id {
                Some(id) if config.channels.iter().any(|spec| spec.id == id) => {
                    return Err(SupervisorError::config(format!("channel id {} is already in use", id)));
                }
                Some(id) => id,
                None => config.next_channel_id()?,
            };

            let spec = request.into_spec(id);
            spec.validate(&self.settings)?;
            config.channels.push(spec.clone());
            self.store.save(&config).await?;

            let channel = Channel::new(spec, Arc::clone(&self.settings), Arc::clone(&self.notifier));
            self.channels
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(id, Arc::clone(&channel));
            channel
        };
        info!(channel = %channel.label(), "➕ Channel created");

        if channel.is_enabled() {
            if let Err(e) = channel.start().await {
                channel_warn!(channel.label(), "New channel failed to start: {}", e);
            }
        }
        self.broadcast().await;
        Ok(channel.id())
    }

    /// Apply `update`, persist it and restart the channel with the new record
    pub async fn update_channel(&self, id: ChannelId, update: ChannelUpdate) -> SupervisorResult<()> {
        let channel = self.channel(id)?;
        {
            let _config = self.config_lock.lock().await;
            let updated = update.apply(&channel.spec());
            updated.validate(&self.settings)?;

            let mut config = self.current_config();
            if let Some(slot) = config.channels.iter_mut().find(|spec| spec.id == id) {
                *slot = updated.clone();
            }
            self.store.save(&config).await?;
            channel.replace_spec(updated);
        }
        info!(channel = %channel.label(), "✏️ Channel updated, restarting");
        channel.restart().await
    }

    /// Register an observer; it receives the current snapshot immediately
    pub async fn connect_observer(&self, observer: Arc<dyn StatusObserver>) -> ObserverId {
        self.hub.connect(observer, || self.get_all_statuses()).await
    }

    pub async fn disconnect_observer(&self, id: ObserverId) -> bool {
        self.hub.disconnect(id).await
    }

    pub async fn observer_count(&self) -> usize {
        self.hub.observer_count().await
    }

    /// Push the current snapshot to every observer
    pub async fn broadcast(&self) -> BroadcastReport {
        let snapshot = self.get_all_statuses();
        self.hub.broadcast(&snapshot).await
    }

    /// One health sweep at the current time
    pub async fn sweep(&self) -> bool {
        self.sweep_at(Instant::now()).await
    }

    /// One health sweep as of `now`; returns whether any status changed
    ///
    /// Crashed channels are handed to a recovery task that restarts them after
    /// the crash delay. Until it finishes, later sweeps skip that channel.
    pub async fn sweep_at(&self, now: Instant) -> bool {
        let timings = self.settings.timings;
        let mut changed = false;

        for channel in self.all_channels() {
            if channel.begin_crash_recovery() {
                channel_warn!(channel.label(), "💥 Worker is gone, channel marked crashed");
                tokio::spawn(Arc::clone(&channel).recover_from_crash(timings.crash_restart_delay));
                changed = true;
                continue;
            }

            if channel.revert_if_stalled(now, timings.stall_timeout) {
                channel_warn!(
                    channel.label(),
                    "📉 No activity for {:.0}s, channel back to listening",
                    timings.stall_timeout.as_secs_f64()
                );
                changed = true;
            }
        }

        if changed {
            self.broadcast().await;
        }
        changed
    }

    /// Run sweeps on the configured period until the fleet is dropped
    pub fn spawn_health_monitor(self: &Arc<Self>) -> JoinHandle<()> {
        let fleet = Arc::downgrade(self);
        let timings = self.settings.timings;

        tokio::spawn(async move {
            tokio::time::sleep(timings.initial_settle).await;

            let mut ticker = interval(timings.sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(fleet) = fleet.upgrade() else {
                    break;
                };
                fleet.sweep().await;
            }
            debug!("Health monitor finished");
        })
    }
}

/// Turn queued status changes into broadcasts, one per burst
async fn pump_notifications(fleet: Weak<Fleet>, mut receiver: mpsc::UnboundedReceiver<StatusChange>) {
    while let Some(change) = receiver.recv().await {
        let mut coalesced = 1usize;
        while receiver.try_recv().is_ok() {
            coalesced += 1;
        }

        let Some(fleet) = fleet.upgrade() else {
            break;
        };
        debug!(channel = %change.channel, status = %change.status, coalesced, "Status change");
        fleet.broadcast().await;
    }
    debug!("Notification pump finished");
}
