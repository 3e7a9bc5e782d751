//! The dashboard engine: client, caches and scheduler wired together.
//!
//! [`Dashboard`] is what a front end holds. It exposes read access to the
//! current state and the few user actions (manual refresh, history queries,
//! cleanup, export). Rendering never reaches below this type.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::{json, Map, Value};
use tokio::sync::watch;
use tracing::{info, warn};

use vmiwatch_types::{Device, HealthReport, WindowHours};

use crate::client::BackendClient;
use crate::config::Settings;
use crate::data::{HealthMonitor, HistoryEngine, Selection, SnapshotCache, SnapshotView};
use crate::scheduler::{RefreshScheduler, Timer, TimerKind, Visibility};

/// Timing and window options for a [`Dashboard`].
#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub snapshot_interval: Duration,
    pub health_interval: Duration,
    pub health_stale_after: Duration,
    pub snapshot_stale_after: Duration,
    pub window: WindowHours,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            snapshot_interval: TimerKind::Snapshot.default_period(),
            health_interval: TimerKind::Health.default_period(),
            health_stale_after: Duration::from_secs(15),
            snapshot_stale_after: Duration::from_secs(90),
            window: WindowHours::default(),
        }
    }
}

impl From<&Settings> for DashboardOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            snapshot_interval: settings.refresh.snapshot_interval,
            health_interval: settings.refresh.health_interval,
            health_stale_after: settings.refresh.health_stale_after,
            snapshot_stale_after: settings.refresh.snapshot_stale_after,
            window: settings.history.window,
        }
    }
}

/// Composition root of the refresh engine.
#[derive(Debug)]
pub struct Dashboard {
    client: BackendClient,
    snapshots: Arc<SnapshotCache>,
    health: Arc<HealthMonitor>,
    history: Arc<HistoryEngine>,
    scheduler: RefreshScheduler,
    devices: watch::Sender<Arc<Vec<Device>>>,
    options: DashboardOptions,
}

impl Dashboard {
    pub fn new(client: BackendClient, options: DashboardOptions) -> Self {
        let snapshots = Arc::new(SnapshotCache::new(client.clone()));
        let health = Arc::new(
            HealthMonitor::new(client.clone()).with_stale_after(options.health_stale_after),
        );
        let history = Arc::new(HistoryEngine::new(client.clone()));
        let scheduler = RefreshScheduler::new(
            snapshots.clone(),
            options.snapshot_interval,
            health.clone(),
            options.health_interval,
        );
        let (devices, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            client,
            snapshots,
            health,
            history,
            scheduler,
            devices,
            options,
        }
    }

    /// Build a dashboard talking HTTP to the configured backend.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = BackendClient::http(&settings.backend.url, settings.backend.timeout)?;
        Ok(Self::new(client, DashboardOptions::from(settings)))
    }

    pub fn snapshots(&self) -> &Arc<SnapshotCache> {
        &self.snapshots
    }

    pub fn health(&self) -> &Arc<HealthMonitor> {
        &self.health
    }

    pub fn history(&self) -> &Arc<HistoryEngine> {
        &self.history
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    pub fn options(&self) -> &DashboardOptions {
        &self.options
    }

    /// Start both recurring timers. Must be called within a tokio runtime.
    pub fn start(&self) {
        self.scheduler.start();
    }

    pub fn set_visibility(&self, visibility: Visibility) {
        info!(?visibility, "visibility changed");
        self.scheduler.set_visibility(visibility);
    }

    /// Refresh the snapshot now, unless a refresh is already in flight.
    pub fn refresh_now(&self) -> bool {
        self.scheduler.trigger(TimerKind::Snapshot)
    }

    /// Selection for `device_id`/`metric` over the configured window.
    pub fn selection(&self, device_id: &str, metric: &str) -> Selection {
        Selection::new(device_id, metric).with_window(self.options.window)
    }

    /// Whether the current snapshot is older than the configured limit.
    pub fn snapshot_is_stale(&self) -> bool {
        self.snapshots.is_stale(self.options.snapshot_stale_after)
    }

    /// Reload the configured device list.
    pub async fn load_devices(&self) -> Arc<Vec<Device>> {
        let devices = Arc::new(self.client.devices().await);
        self.devices.send_replace(devices.clone());
        devices
    }

    /// The device list from the last [`Dashboard::load_devices`].
    pub fn devices(&self) -> Arc<Vec<Device>> {
        self.devices.borrow().clone()
    }

    /// Ask the backend to purge old readings and return its acknowledgment.
    pub async fn cleanup(&self) -> bool {
        let acknowledged = self.client.cleanup().await;
        if acknowledged {
            info!("cleanup acknowledged");
        } else {
            warn!("cleanup failed");
        }
        acknowledged
    }

    /// Stop all timers permanently.
    pub fn shutdown(&self) {
        self.scheduler.stop();
    }

    /// A JSON report of the current snapshot, health and timer activity.
    pub fn report(&self) -> Value {
        let health = self.health.state();
        let mut report =
            build_report(&self.snapshots.get(), health.report.as_ref(), self.health.is_connected());
        report["scheduler"] = json!({
            "snapshot": timer_report(self.scheduler.timer(TimerKind::Snapshot)),
            "health": timer_report(self.scheduler.timer(TimerKind::Health)),
        });
        report
    }

    /// Write [`Dashboard::report`] to `path` as pretty JSON.
    pub fn export_report(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.report())?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "report exported");
        Ok(())
    }
}

fn timer_report(timer: &Timer) -> Value {
    let counters = timer.counters();
    json!({
        "period_secs": timer.period().as_secs_f64(),
        "state": format!("{:?}", timer.state()),
        "in_flight": timer.is_in_flight(),
        "started": counters.started,
        "skipped": counters.skipped,
    })
}

fn build_report(
    view: &SnapshotView,
    report: Option<&HealthReport>,
    connected: bool,
) -> Value {
    let mut devices = Map::new();
    let mut metric_count = 0;

    for (id, state) in &view.snapshot {
        let mut metrics = Map::new();
        for reading in state.readings() {
            metric_count += 1;
            let kind = reading.kind();
            metrics.insert(
                reading.key.clone(),
                json!({
                    "value": reading.value,
                    "unit": kind.unit().trim(),
                    "display": reading.formatted(),
                }),
            );
        }
        devices.insert(
            id.clone(),
            json!({
                "name": state.name,
                "type": state.kind,
                "last_update": state.last_update.to_rfc3339(),
                "metrics": metrics,
            }),
        );
    }

    json!({
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "health": {
            "connected": connected,
            "status": report.and_then(|r| r.status.clone()),
        },
        "summary": {
            "devices": view.len(),
            "metrics": metric_count,
            "revision": view.revision,
        },
        "devices": devices,
    })
}
