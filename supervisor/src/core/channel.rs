//! Channel: one supervised worker and its derived endpoints
//!
//! A channel owns at most one worker process and the log sink capturing its
//! output. `start`, `stop` and `restart` are serialized by a lifecycle lock;
//! status reads never wait on that lock.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;

use shared::{
    channel_debug, channel_error, channel_info, channel_warn, ChannelId, ChannelMode, ChannelSnapshot, ChannelStatus,
};

use crate::config::{ChannelSpec, FleetSettings};
use crate::core::liveness::{LivenessDetector, LivenessEvent};
use crate::core::log_sink::LogSink;
use crate::core::process::WorkerProcess;
use crate::error::{SupervisorError, SupervisorResult};
use crate::traits::{StatusChange, StatusNotifier};

/// Mutable runtime state, guarded by a short-lived lock
#[derive(Debug, Default)]
struct ChannelState {
    status: ChannelStatus,
    process: Option<WorkerProcess>,
    pid: Option<u32>,
    last_active_at: Option<Instant>,
    /// Set while a stop is waiting for the worker to exit
    terminating: bool,
    /// Bumped on every start, stop and crash so stale output monitors can tell
    generation: u64,
}

pub struct Channel {
    id: ChannelId,
    settings: Arc<FleetSettings>,
    spec: RwLock<ChannelSpec>,
    state: Mutex<ChannelState>,
    log_sink: tokio::sync::Mutex<Option<LogSink>>,
    lifecycle: tokio::sync::Mutex<()>,
    recovering: AtomicBool,
    notifier: Arc<dyn StatusNotifier>,
}

impl Channel {
    pub fn new(spec: ChannelSpec, settings: Arc<FleetSettings>, notifier: Arc<dyn StatusNotifier>) -> Arc<Self> {
        Arc::new(Self {
            id: spec.id,
            settings,
            spec: RwLock::new(spec),
            state: Mutex::new(ChannelState::default()),
            log_sink: tokio::sync::Mutex::new(None),
            lifecycle: tokio::sync::Mutex::new(()),
            recovering: AtomicBool::new(false),
            notifier,
        })
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn spec(&self) -> ChannelSpec {
        self.spec.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn name(&self) -> String {
        self.spec.read().unwrap_or_else(PoisonError::into_inner).name.clone()
    }

    pub fn mode(&self) -> ChannelMode {
        self.spec.read().unwrap_or_else(PoisonError::into_inner).mode
    }

    pub fn is_enabled(&self) -> bool {
        self.spec.read().unwrap_or_else(PoisonError::into_inner).enabled
    }

    pub fn status(&self) -> ChannelStatus {
        self.state().status
    }

    pub fn pid(&self) -> Option<u32> {
        self.state().pid
    }

    pub fn last_active_at(&self) -> Option<Instant> {
        self.state().last_active_at
    }

    /// Whether the channel currently holds a worker that has not exited
    pub fn is_running(&self) -> bool {
        let mut state = self.state();
        state.terminating || state.process.as_mut().is_some_and(WorkerProcess::is_alive)
    }

    pub fn snapshot(&self) -> ChannelSnapshot {
        let name = self.name();
        let state = self.state();
        ChannelSnapshot {
            id: self.id,
            name,
            status: state.status,
            pid: state.pid,
        }
    }

    /// Full argument vector for this channel's worker
    pub fn build_command(&self) -> SupervisorResult<Vec<String>> {
        self.settings.build_command(&self.spec())
    }

    pub fn log_path(&self) -> PathBuf {
        self.settings.log_path(&self.spec())
    }

    /// Start the worker; a no-op when one is already running
    pub async fn start(self: &Arc<Self>) -> SupervisorResult<()> {
        let _lifecycle = self.lifecycle.lock().await;
        self.start_locked().await
    }

    /// Stop the worker; always leaves the channel `Inactive`
    pub async fn stop(&self) -> SupervisorResult<()> {
        let _lifecycle = self.lifecycle.lock().await;
        self.stop_locked().await
    }

    /// Stop followed by start, without anything interleaving
    pub async fn restart(self: &Arc<Self>) -> SupervisorResult<()> {
        let _lifecycle = self.lifecycle.lock().await;
        if let Err(e) = self.stop_locked().await {
            channel_warn!(self.label(), "Stop during restart failed: {}", e);
        }
        self.state().last_active_at = None;
        self.start_locked().await
    }

    async fn start_locked(self: &Arc<Self>) -> SupervisorResult<()> {
        let label = self.label();
        {
            let mut state = self.state();
            if let Some(process) = state.process.as_mut() {
                if process.is_alive() {
                    channel_info!(label, "Worker already running (PID {}), start ignored", process.pid());
                    return Ok(());
                }
            }
            // Reap an exited predecessor
            state.process = None;
            state.pid = None;
        }
        self.release_log_sink().await;

        let spec = self.spec();
        let command = match self.settings.build_command(&spec) {
            Ok(command) => command,
            Err(e) => return Err(self.fail_start(e)),
        };
        channel_info!(label, "▶️ Starting worker: {}", command.join(" "));

        let sink = match LogSink::create(&self.settings.log_path(&spec)).await {
            Ok(sink) => sink,
            Err(e) => return Err(self.fail_start(e.into())),
        };

        let (process, output) = match WorkerProcess::spawn(&command) {
            Ok(spawned) => spawned,
            Err(e) => {
                if let Err(close_err) = sink.close().await {
                    channel_warn!(label, "Failed to close log sink: {}", close_err);
                }
                return Err(self.fail_start(e));
            }
        };
        *self.log_sink.lock().await = Some(sink);

        let pid = process.pid();
        let generation = {
            let mut state = self.state();
            state.generation += 1;
            state.process = Some(process);
            state.pid = Some(pid);
            state.status = ChannelStatus::Listening;
            state.last_active_at = None;
            state.generation
        };
        self.notify(ChannelStatus::Listening);
        channel_info!(label, "🎧 Worker started with PID {}, listening", pid);

        tokio::spawn(Arc::clone(self).monitor_output(generation, LivenessDetector::new(output)));
        Ok(())
    }

    fn fail_start(&self, error: SupervisorError) -> SupervisorError {
        {
            let mut state = self.state();
            state.status = ChannelStatus::Error;
            state.process = None;
            state.pid = None;
            state.last_active_at = None;
            state.generation += 1;
        }
        self.notify(ChannelStatus::Error);
        channel_error!(self.label(), "❌ Failed to start worker: {}", error);
        error
    }

    async fn stop_locked(&self) -> SupervisorResult<()> {
        let label = self.label();
        let (running, previous) = {
            let mut state = self.state();
            let previous = state.status;
            let mut taken = state.process.take();
            let alive = taken.as_mut().is_some_and(WorkerProcess::is_alive);
            let running = match taken {
                Some(process) if alive => {
                    state.status = ChannelStatus::Stopping;
                    state.terminating = true;
                    Some(process)
                }
                _ => {
                    state.status = ChannelStatus::Inactive;
                    state.pid = None;
                    state.last_active_at = None;
                    state.generation += 1;
                    None
                }
            };
            (running, previous)
        };

        let Some(mut process) = running else {
            self.release_log_sink().await;
            if previous != ChannelStatus::Inactive {
                self.notify(ChannelStatus::Inactive);
            }
            return Ok(());
        };

        // Observers see Stopping before termination, which can take the whole grace period
        self.notify(ChannelStatus::Stopping);
        channel_info!(label, "⏹️ Stopping worker PID {}", process.pid());

        let result = process.terminate(self.settings.timings.termination_grace).await;
        if let Err(e) = &result {
            channel_error!(label, "Failed to terminate worker PID {}: {}", process.pid(), e);
        }

        self.release_log_sink().await;
        drop(process);
        {
            let mut state = self.state();
            state.status = ChannelStatus::Inactive;
            state.terminating = false;
            state.pid = None;
            state.last_active_at = None;
            state.generation += 1;
        }
        self.notify(ChannelStatus::Inactive);
        channel_info!(label, "Channel stopped");
        result
    }

    /// Consume the worker's output until it closes or the generation moves on
    async fn monitor_output(self: Arc<Self>, generation: u64, mut detector: LivenessDetector) {
        let label = self.label();
        while let Some(item) = detector.next_event().await {
            let classified = match item {
                Ok(classified) => classified,
                Err(e) => {
                    channel_warn!(label, "Output stream failed, monitoring ends: {}", e);
                    break;
                }
            };
            if classified.event == LivenessEvent::NoSignal {
                continue;
            }
            if self.state().generation != generation {
                break;
            }

            tracing::trace!(channel = %label, "{}", classified.line);
            self.capture_line(&classified.line).await;

            if let Some(status) = self.apply_liveness(generation, classified.event, classified.observed_at) {
                channel_info!(label, "📺 Stream detected, channel is {}", status);
                self.notify(status);
            }
        }
        channel_debug!(label, "Output monitoring finished (generation {})", generation);
    }

    async fn capture_line(&self, line: &str) {
        let mut sink = self.log_sink.lock().await;
        if let Some(sink) = sink.as_mut() {
            if let Err(e) = sink.append_line(line).await {
                channel_warn!(self.label(), "Failed to write log line: {}", e);
            }
        }
    }

    /// Apply one liveness event; returns the new status on a transition
    pub(crate) fn apply_liveness(&self, generation: u64, event: LivenessEvent, at: Instant) -> Option<ChannelStatus> {
        let mut state = self.state();
        if state.generation != generation || !state.status.has_live_process() {
            return None;
        }
        match event {
            LivenessEvent::Activity => {
                state.last_active_at = Some(at);
                if state.status == ChannelStatus::Listening {
                    state.status = ChannelStatus::Active;
                    return Some(ChannelStatus::Active);
                }
            }
            LivenessEvent::Heartbeat => state.last_active_at = Some(at),
            LivenessEvent::NoSignal => {}
        }
        None
    }

    #[cfg(test)]
    pub(crate) fn generation(&self) -> u64 {
        self.state().generation
    }

    /// Mark the channel crashed if its worker is gone while it should be running
    ///
    /// Channels mid-transition or already recovering are left alone. A `true`
    /// return obliges the caller to run `recover_from_crash`.
    pub(crate) fn begin_crash_recovery(&self) -> bool {
        let Ok(_lifecycle) = self.lifecycle.try_lock() else {
            return false;
        };
        if self.recovering.load(Ordering::Acquire) {
            return false;
        }

        let mut state = self.state();
        if matches!(state.status, ChannelStatus::Inactive | ChannelStatus::Crashed) {
            return false;
        }
        if state.process.as_mut().is_some_and(WorkerProcess::is_alive) {
            return false;
        }

        state.status = ChannelStatus::Crashed;
        state.process = None;
        state.pid = None;
        state.last_active_at = None;
        state.generation += 1;
        self.recovering.store(true, Ordering::Release);
        true
    }

    /// Release the sink, wait out the delay, then restart
    pub(crate) async fn recover_from_crash(self: Arc<Self>, delay: Duration) {
        let label = self.label();
        self.release_log_sink().await;

        channel_info!(label, "🔄 Restarting crashed channel in {:.1}s", delay.as_secs_f64());
        tokio::time::sleep(delay).await;

        if self.status() == ChannelStatus::Crashed {
            if let Err(e) = self.restart().await {
                channel_error!(label, "Crash recovery failed: {}", e);
            }
        } else {
            channel_info!(label, "Status changed during restart delay, recovery skipped");
        }
        self.recovering.store(false, Ordering::Release);
    }

    #[cfg(test)]
    pub(crate) fn is_recovering(&self) -> bool {
        self.recovering.load(Ordering::Acquire)
    }

    /// Demote an active channel whose last activity is older than `stall_timeout`
    pub(crate) fn revert_if_stalled(&self, now: Instant, stall_timeout: Duration) -> bool {
        let mut state = self.state();
        if state.status != ChannelStatus::Active {
            return false;
        }
        match state.last_active_at {
            Some(last) if now.saturating_duration_since(last) > stall_timeout => {
                state.status = ChannelStatus::Listening;
                state.last_active_at = None;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn replace_spec(&self, spec: ChannelSpec) {
        *self.spec.write().unwrap_or_else(PoisonError::into_inner) = spec;
    }

    pub(crate) async fn release_log_sink(&self) {
        let sink = self.log_sink.lock().await.take();
        if let Some(sink) = sink {
            if let Err(e) = sink.close().await {
                channel_warn!(self.label(), "Failed to close log sink: {}", e);
            }
        }
    }

    #[cfg(test)]
    pub(crate) async fn has_log_sink(&self) -> bool {
        self.log_sink.lock().await.is_some()
    }

    fn notify(&self, status: ChannelStatus) {
        self.notifier.status_changed(StatusChange { channel: self.id, status });
    }

    pub(crate) fn label(&self) -> String {
        format!("{}:{}", self.id, self.name())
    }

    fn state(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
