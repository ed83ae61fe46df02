//! Backend liveness monitoring with an adaptive heartbeat.
//!
//! # States
//!
//! ```text
//! ONLINE / NORMAL  --[failed probe]-->  OFFLINE / RECOVERY
//!       ^                                       |
//!       +-----------[successful probe]----------+
//! ```
//!
//! Side effects run on edges only. Repeated probes with the same outcome
//! change nothing but the counters.
//!
//! The NORMAL heartbeat is slow and skips probing while nothing is on
//! screen and no request is running. The RECOVERY heartbeat is fast and
//! always probes.
//!
//! Going offline arms a delayed "navigate away" on the host. The action is
//! fire-and-forget: if the backend comes back before the delay elapses the
//! navigation still happens.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::context::ClientContext;
use crate::traits::{Backend, Navigator};
use crate::view::Notice;

/// Liveness of the backend as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessState {
    Online,
    Offline,
}

impl LivenessState {
    pub fn mode(&self) -> HeartbeatMode {
        match self {
            LivenessState::Online => HeartbeatMode::Normal,
            LivenessState::Offline => HeartbeatMode::Recovery,
        }
    }
}

impl std::fmt::Display for LivenessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LivenessState::Online => write!(f, "online"),
            LivenessState::Offline => write!(f, "offline"),
        }
    }
}

/// Probing cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatMode {
    /// Slow, and only when there is a reason to probe.
    Normal,
    /// Fast and unconditional, until the backend is back.
    Recovery,
}

impl std::fmt::Display for HeartbeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeartbeatMode::Normal => write!(f, "normal"),
            HeartbeatMode::Recovery => write!(f, "recovery"),
        }
    }
}

/// Configuration for the heartbeat.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Period of the NORMAL heartbeat.
    pub normal_interval: Duration,

    /// Period of the RECOVERY heartbeat.
    pub recovery_interval: Duration,

    /// Timeout for a single health probe.
    pub probe_timeout: Duration,

    /// Delay between an outage and the host navigating away.
    pub navigate_delay: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            normal_interval: Duration::from_secs(15),
            recovery_interval: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(3),
            navigate_delay: Duration::from_secs(3),
        }
    }
}

impl HeartbeatConfig {
    pub fn interval_for(&self, mode: HeartbeatMode) -> Duration {
        match mode {
            HeartbeatMode::Normal => self.normal_interval,
            HeartbeatMode::Recovery => self.recovery_interval,
        }
    }

    pub fn with_normal_interval(mut self, interval: Duration) -> Self {
        self.normal_interval = interval;
        self
    }

    pub fn with_recovery_interval(mut self, interval: Duration) -> Self {
        self.recovery_interval = interval;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_navigate_delay(mut self, delay: Duration) -> Self {
        self.navigate_delay = delay;
        self
    }
}

/// Why a heartbeat tick did not probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// NORMAL mode with nothing displayed and nothing running.
    Idle,
    /// Another probe has not finished yet.
    InFlight,
}

/// Events emitted by the monitor for logging.
#[derive(Debug, Clone)]
pub enum LivenessEvent<'a> {
    Started {
        mode: HeartbeatMode,
        interval: Duration,
    },
    Probing {
        mode: HeartbeatMode,
        base_url: &'a str,
    },
    ProbeSkipped {
        reason: SkipReason,
    },
    StartupFailed {
        error: &'a str,
    },
    WentOffline {
        error: &'a str,
    },
    Recovered,
    NavigationArmed {
        delay: Duration,
    },
    NavigationFired,
    Stopped,
}

/// Trait for receiving monitor events (decoupled logging).
pub trait LivenessReporter: Send + Sync {
    fn report(&self, event: LivenessEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLivenessReporter;

impl LivenessReporter for TracingLivenessReporter {
    fn report(&self, event: LivenessEvent<'_>) {
        match event {
            LivenessEvent::Started { mode, interval } => {
                tracing::info!(%mode, interval_secs = interval.as_secs(), "Heartbeat started");
            }
            LivenessEvent::Probing { mode, base_url } => {
                tracing::debug!(%mode, %base_url, "Probing backend health");
            }
            LivenessEvent::ProbeSkipped { reason } => {
                tracing::trace!(?reason, "Heartbeat tick skipped");
            }
            LivenessEvent::StartupFailed { error } => {
                tracing::warn!(%error, "Backend not running at startup");
            }
            LivenessEvent::WentOffline { error } => {
                tracing::warn!(%error, "Backend went offline, switching to recovery heartbeat");
            }
            LivenessEvent::Recovered => {
                tracing::info!("Backend is back online");
            }
            LivenessEvent::NavigationArmed { delay } => {
                tracing::info!(delay_secs = delay.as_secs(), "Navigation away armed");
            }
            LivenessEvent::NavigationFired => {
                tracing::info!("Navigating away");
            }
            LivenessEvent::Stopped => {
                tracing::info!("Heartbeat stopped");
            }
        }
    }
}

/// Counters and current state for monitoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessStats {
    pub state: LivenessState,
    pub mode: HeartbeatMode,
    pub probes: u64,
    pub skipped: u64,
    pub outages: u64,
    pub recoveries: u64,
    pub navigations_armed: u64,
    pub last_error: Option<String>,
}

#[derive(Debug)]
struct MonitorInner {
    state: LivenessState,
    probes: u64,
    skipped: u64,
    outages: u64,
    recoveries: u64,
    navigations_armed: u64,
    last_error: Option<String>,
}

impl MonitorInner {
    fn new() -> Self {
        Self {
            state: LivenessState::Online,
            probes: 0,
            skipped: 0,
            outages: 0,
            recoveries: 0,
            navigations_armed: 0,
            last_error: None,
        }
    }
}

enum Edge {
    WentOffline(String),
    Recovered,
}

/// Owns the heartbeat and the ONLINE/OFFLINE state.
pub struct LivenessMonitor<B: Backend> {
    backend: B,
    ctx: Arc<ClientContext>,
    config: HeartbeatConfig,
    navigator: Arc<dyn Navigator>,
    reporter: Arc<dyn LivenessReporter>,
    inner: Mutex<MonitorInner>,
    /// Held for the duration of a probe.
    probe_gate: tokio::sync::Mutex<()>,
    /// Wakes the heartbeat loop so it re-arms its timer after a mode switch.
    mode_changed: Notify,
}

impl<B: Backend> LivenessMonitor<B> {
    pub fn new(
        backend: B,
        ctx: Arc<ClientContext>,
        config: HeartbeatConfig,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            backend,
            ctx,
            config,
            navigator,
            reporter: Arc::new(TracingLivenessReporter),
            inner: Mutex::new(MonitorInner::new()),
            probe_gate: tokio::sync::Mutex::new(()),
            mode_changed: Notify::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn LivenessReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Acquires the inner mutex lock, recovering from poison if necessary.
    fn lock_inner(&self) -> std::sync::MutexGuard<'_, MonitorInner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned liveness mutex");
            poisoned.into_inner()
        })
    }

    pub fn state(&self) -> LivenessState {
        self.lock_inner().state
    }

    pub fn mode(&self) -> HeartbeatMode {
        self.state().mode()
    }

    pub fn is_online(&self) -> bool {
        self.state() == LivenessState::Online
    }

    /// Period of the heartbeat in the current mode.
    pub fn current_interval(&self) -> Duration {
        self.config.interval_for(self.mode())
    }

    pub fn stats(&self) -> LivenessStats {
        let inner = self.lock_inner();
        LivenessStats {
            state: inner.state,
            mode: inner.state.mode(),
            probes: inner.probes,
            skipped: inner.skipped,
            outages: inner.outages,
            recoveries: inner.recoveries,
            navigations_armed: inner.navigations_armed,
            last_error: inner.last_error.clone(),
        }
    }

    /// Initial probe. On failure the monitor goes straight to OFFLINE and
    /// arms the navigation; the caller should not start the heartbeat loop.
    pub async fn start(&self) -> LivenessState {
        let _gate = self.probe_gate.lock().await;
        self.lock_inner().probes += 1;
        let outcome = self.probe().await;

        let Err(error) = outcome else {
            return self.apply(Ok(()));
        };

        {
            let mut inner = self.lock_inner();
            inner.state = LivenessState::Offline;
            inner.last_error = Some(error.clone());
        }
        self.reporter
            .report(LivenessEvent::StartupFailed { error: &error });
        self.ctx.set_notice(Notice::outage(format!(
            "Backend is not running, returning home in {}s...",
            self.config.navigate_delay.as_secs()
        )));
        self.arm_navigation();
        self.mode_changed.notify_one();
        LivenessState::Offline
    }

    /// One heartbeat tick. Returns the state after probing, or `None` if
    /// the tick was skipped.
    pub async fn tick(&self) -> Option<LivenessState> {
        if self.mode() == HeartbeatMode::Normal && !self.ctx.has_reason_to_probe() {
            self.skip(SkipReason::Idle);
            return None;
        }

        let Ok(_gate) = self.probe_gate.try_lock() else {
            self.skip(SkipReason::InFlight);
            return None;
        };

        Some(self.probe_and_apply().await)
    }

    /// Out-of-band probe, regardless of mode. Waits for an in-flight probe
    /// to finish first so probes never overlap.
    pub async fn check_now(&self) -> LivenessState {
        let _gate = self.probe_gate.lock().await;
        self.probe_and_apply().await
    }

    /// Run the heartbeat until cancellation.
    ///
    /// A single timer is armed at a time; a mode switch wakes the loop and
    /// re-arms it with the new period.
    pub async fn run(&self, cancel_token: CancellationToken) {
        self.reporter.report(LivenessEvent::Started {
            mode: self.mode(),
            interval: self.current_interval(),
        });

        loop {
            let interval = self.current_interval();
            tokio::select! {
                () = cancel_token.cancelled() => break,
                () = self.mode_changed.notified() => continue,
                () = tokio::time::sleep(interval) => {
                    self.tick().await;
                }
            }
        }

        self.reporter.report(LivenessEvent::Stopped);
    }

    fn skip(&self, reason: SkipReason) {
        self.lock_inner().skipped += 1;
        self.reporter.report(LivenessEvent::ProbeSkipped { reason });
    }

    /// Healthy only if the backend answered in time with the healthy marker.
    async fn probe(&self) -> Result<(), String> {
        let base_url = self.ctx.base_url();
        self.reporter.report(LivenessEvent::Probing {
            mode: self.mode(),
            base_url: &base_url,
        });

        match self
            .backend
            .health(&base_url, self.config.probe_timeout)
            .await
        {
            Ok(report) if report.is_healthy() => Ok(()),
            Ok(report) => Err(format!("unhealthy status '{}'", report.status)),
            Err(e) => Err(e.to_string()),
        }
    }

    async fn probe_and_apply(&self) -> LivenessState {
        self.lock_inner().probes += 1;
        let outcome = self.probe().await;
        self.apply(outcome)
    }

    /// Record a probe outcome and run edge side effects.
    fn apply(&self, outcome: Result<(), String>) -> LivenessState {
        let edge = {
            let mut inner = self.lock_inner();
            match (inner.state, outcome) {
                (LivenessState::Online, Err(error)) => {
                    inner.state = LivenessState::Offline;
                    inner.outages += 1;
                    inner.last_error = Some(error.clone());
                    Some(Edge::WentOffline(error))
                }
                (LivenessState::Offline, Ok(())) => {
                    inner.state = LivenessState::Online;
                    inner.recoveries += 1;
                    inner.last_error = None;
                    Some(Edge::Recovered)
                }
                (LivenessState::Offline, Err(error)) => {
                    inner.last_error = Some(error);
                    None
                }
                (LivenessState::Online, Ok(())) => None,
            }
        };

        match edge {
            Some(Edge::WentOffline(error)) => self.on_outage(&error),
            Some(Edge::Recovered) => self.on_recovery(),
            None => {}
        }

        self.state()
    }

    fn on_outage(&self, error: &str) {
        self.reporter.report(LivenessEvent::WentOffline { error });
        {
            let mut view = self.ctx.view();
            view.clear_results();
            view.set_notice(Notice::outage(format!(
                "Backend disconnected, returning home in {}s...",
                self.config.navigate_delay.as_secs()
            )));
        }
        self.arm_navigation();
        self.mode_changed.notify_one();
    }

    fn on_recovery(&self) {
        self.reporter.report(LivenessEvent::Recovered);
        self.ctx.view().clear_notice();
        self.mode_changed.notify_one();
    }

    /// Fire-and-forget: not cancelled by a later recovery.
    fn arm_navigation(&self) {
        let delay = self.config.navigate_delay;
        self.lock_inner().navigations_armed += 1;
        self.reporter.report(LivenessEvent::NavigationArmed { delay });

        let navigator = Arc::clone(&self.navigator);
        let reporter = Arc::clone(&self.reporter);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            reporter.report(LivenessEvent::NavigationFired);
            navigator.navigate_away();
        });
    }
}
