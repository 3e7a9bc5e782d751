//! Connectivity tracking for the gateway's EnOcean link.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use vmiwatch_types::HealthReport;

use crate::client::BackendClient;
use crate::scheduler::RefreshTask;

/// Link status as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// No probe has completed yet.
    Unknown,
    Connected,
    Disconnected,
}

impl LinkStatus {
    /// Returns a short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            LinkStatus::Unknown => "checking",
            LinkStatus::Connected => "connected",
            LinkStatus::Disconnected => "disconnected",
        }
    }
}

/// Result of the most recent probe.
#[derive(Debug, Clone, Default)]
pub struct HealthState {
    /// Connected iff the last probe returned a report with the link up.
    pub connected: bool,
    /// The last report received, if the last probe returned one.
    pub report: Option<HealthReport>,
    /// When the last probe completed.
    pub probed_at: Option<Instant>,
    /// When a probe last reported the link as up.
    pub last_success: Option<Instant>,
}

impl HealthState {
    /// Status for display, `Unknown` until the first probe completes.
    pub fn status(&self) -> LinkStatus {
        match (self.probed_at, self.connected) {
            (None, _) => LinkStatus::Unknown,
            (Some(_), true) => LinkStatus::Connected,
            (Some(_), false) => LinkStatus::Disconnected,
        }
    }
}

/// Polls the health endpoint and keeps a binary connectivity flag.
///
/// Every probe fully determines the flag: there is no debounce, so a single
/// failed probe flips the indicator to disconnected.
#[derive(Debug)]
pub struct HealthMonitor {
    client: BackendClient,
    state: watch::Sender<Arc<HealthState>>,
    stale_after: Option<Duration>,
    /// When the first probe was issued.
    first_probe: Mutex<Option<Instant>>,
}

impl HealthMonitor {
    /// Create a monitor with no staleness limit.
    pub fn new(client: BackendClient) -> Self {
        let (state, _) = watch::channel(Arc::new(HealthState::default()));
        Self {
            client,
            state,
            stale_after: None,
            first_probe: Mutex::new(None),
        }
    }

    /// Treat the connection as lost when no probe has succeeded for `after`.
    ///
    /// This also covers a first probe that never completes.
    pub fn with_stale_after(mut self, after: Duration) -> Self {
        self.stale_after = Some(after);
        self
    }

    /// Probe the backend once and record the outcome.
    ///
    /// Returns the new connectivity flag.
    pub async fn probe(&self) -> bool {
        self.first_probe.lock().get_or_insert_with(Instant::now);
        let report = self.client.health().await;
        self.record(report)
    }

    fn record(&self, report: Option<HealthReport>) -> bool {
        let connected = report.as_ref().is_some_and(HealthReport::is_connected);
        let now = Instant::now();
        let previous = self.state.borrow().status();

        self.state.send_modify(|current| {
            let last_success = if connected {
                Some(now)
            } else {
                current.last_success
            };
            *current = Arc::new(HealthState {
                connected,
                report,
                probed_at: Some(now),
                last_success,
            });
        });

        match (previous, connected) {
            (LinkStatus::Connected, false) => warn!("gateway link lost"),
            (LinkStatus::Disconnected | LinkStatus::Unknown, true) => info!("gateway link up"),
            (LinkStatus::Unknown, false) => warn!("gateway unreachable on first probe"),
            _ => debug!(connected, "health probe"),
        }
        connected
    }

    /// The full state of the last probe.
    pub fn state(&self) -> Arc<HealthState> {
        self.state.borrow().clone()
    }

    /// Status for display, taking staleness into account.
    pub fn status(&self) -> LinkStatus {
        let state = self.state();
        if self.is_stale(&state) {
            return LinkStatus::Disconnected;
        }
        state.status()
    }

    /// Whether the gateway is currently considered connected.
    pub fn is_connected(&self) -> bool {
        self.status() == LinkStatus::Connected
    }

    /// Subscribe to probe results.
    pub fn subscribe(&self) -> watch::Receiver<Arc<HealthState>> {
        self.state.subscribe()
    }

    fn is_stale(&self, state: &HealthState) -> bool {
        let Some(limit) = self.stale_after else {
            return false;
        };
        match state.probed_at {
            Some(at) => state.connected && at.elapsed() > limit,
            // Still waiting on the first answer
            None => {
                let issued = *self.first_probe.lock();
                issued.is_some_and(|at| at.elapsed() > limit)
            }
        }
    }
}

#[async_trait]
impl RefreshTask for HealthMonitor {
    async fn run(&self) {
        self.probe().await;
    }
}
