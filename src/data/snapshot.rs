//! Snapshot cache: the single source of truth for current device readings.
//!
//! The cache holds exactly one [`SnapshotView`] at a time. A refresh builds a
//! complete new view (snapshot plus derived selector state) and swaps it in
//! with one channel send, so readers see either the old view or the new one,
//! never a mix of two poll cycles.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use vmiwatch_types::{Device, DeviceSnapshot, DeviceState};

use crate::client::BackendClient;
use crate::scheduler::RefreshTask;

/// An immutable, fully derived view of one snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotView {
    /// Device readings keyed by device id.
    pub snapshot: DeviceSnapshot,
    /// Known device ids, sorted.
    pub device_ids: Vec<String>,
    /// When this view replaced the previous one (`None` before the first refresh).
    pub refreshed_at: Option<Instant>,
    /// Incremented on every replacement.
    pub revision: u64,
}

impl SnapshotView {
    fn new(snapshot: DeviceSnapshot, revision: u64) -> Self {
        let device_ids = snapshot.keys().cloned().collect();
        Self {
            snapshot,
            device_ids,
            refreshed_at: Some(Instant::now()),
            revision,
        }
    }

    /// Check if the snapshot is empty (no devices).
    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    /// Number of devices in the snapshot.
    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    /// State of a specific device.
    pub fn get(&self, device_id: &str) -> Option<&DeviceState> {
        self.snapshot.get(device_id)
    }

    /// Device metadata for every device, in id order.
    pub fn devices(&self) -> Vec<Device> {
        self.snapshot
            .iter()
            .map(|(id, state)| state.device(id))
            .collect()
    }

    /// Metric keys reported by a device, empty if the device is unknown.
    pub fn metric_keys(&self, device_id: &str) -> Vec<String> {
        self.get(device_id)
            .map(|state| state.metric_keys().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Whether the device currently reports the metric.
    pub fn has_metric(&self, device_id: &str, metric: &str) -> bool {
        self.get(device_id)
            .is_some_and(|state| state.metrics.contains_key(metric))
    }

    /// Time since this view was installed.
    pub fn age(&self) -> Option<Duration> {
        self.refreshed_at.map(|at| at.elapsed())
    }
}

/// Holds the latest known snapshot and replaces it wholesale on refresh.
#[derive(Debug)]
pub struct SnapshotCache {
    client: BackendClient,
    state: watch::Sender<Arc<SnapshotView>>,
}

impl SnapshotCache {
    /// Create an empty cache fed by `client`.
    pub fn new(client: BackendClient) -> Self {
        let (state, _) = watch::channel(Arc::new(SnapshotView::default()));
        Self { client, state }
    }

    /// Fetch the current snapshot and install it.
    ///
    /// An empty result (including a failed fetch) still replaces the cached
    /// view, clearing devices that are no longer reported.
    pub async fn refresh(&self) -> Arc<SnapshotView> {
        let snapshot = self.client.current_snapshot().await;
        self.replace(snapshot)
    }

    /// Atomically replace the cached snapshot and rebuild derived state.
    pub fn replace(&self, snapshot: DeviceSnapshot) -> Arc<SnapshotView> {
        let previous = self.state.borrow().len();
        let mut installed = None;

        self.state.send_modify(|current| {
            let view = Arc::new(SnapshotView::new(snapshot, current.revision + 1));
            installed = Some(view.clone());
            *current = view;
        });

        let view = installed.unwrap_or_else(|| self.get());
        if view.len() != previous {
            info!(devices = view.len(), previous, "device set changed");
        }
        debug!(revision = view.revision, devices = view.len(), "snapshot replaced");
        view
    }

    /// The latest view. Never blocks and never triggers a fetch.
    pub fn get(&self) -> Arc<SnapshotView> {
        self.state.borrow().clone()
    }

    /// Subscribe to replacements.
    ///
    /// The receiver is marked changed each time a new view is installed.
    pub fn subscribe(&self) -> watch::Receiver<Arc<SnapshotView>> {
        self.state.subscribe()
    }

    /// Age of the current view, `None` before the first refresh.
    pub fn age(&self) -> Option<Duration> {
        self.get().age()
    }

    /// Whether the current view is older than `max_age` (or missing).
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.age().map_or(true, |age| age > max_age)
    }
}

#[async_trait]
impl RefreshTask for SnapshotCache {
    async fn run(&self) {
        self.refresh().await;
    }
}
