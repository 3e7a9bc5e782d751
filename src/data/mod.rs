//! Client-side state kept between refreshes.
//!
//! ## Submodules
//!
//! - [`snapshot`]: The [`SnapshotCache`], owner of the current device snapshot
//! - [`health`]: The [`HealthMonitor`] and its binary connectivity flag
//! - [`history`]: The [`HistoryEngine`] for on-demand metric series and statistics
//! - [`duration`]: Parsing and formatting of duration strings (e.g., "30s", "500ms")
//!
//! ## Data Flow
//!
//! ```text
//! RefreshScheduler tick
//!        │
//!        ├──▶ SnapshotCache::refresh() ──▶ BackendClient::current_snapshot()
//!        │           │
//!        │           └──▶ watch channel ──▶ UI re-render
//!        │
//!        └──▶ HealthMonitor::probe() ──▶ BackendClient::health()
//!
//! user selection ──▶ HistoryEngine::query() ──▶ BackendClient::metric_history()
//! ```

pub mod duration;
pub mod health;
pub mod history;
pub mod snapshot;

pub use health::{HealthMonitor, HealthState, LinkStatus};
pub use history::{
    DerivedStatistics, HistoryEngine, HistoryResult, HistoryTicket, QueryOutcome, Selection,
};
pub use snapshot::{SnapshotCache, SnapshotView};
