//! On-demand history queries for one device metric.
//!
//! A query fetches the series once and derives statistics from that same
//! series, so the chart and the figures next to it always describe the same
//! window. Each selection change issues a new ticket; a result whose ticket
//! is no longer current is dropped instead of replacing newer data.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use vmiwatch_types::{HistoryPoint, WindowHours};

use crate::client::BackendClient;

/// What the user asked to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub device_id: String,
    pub metric: String,
    pub window: WindowHours,
}

impl Selection {
    /// Select a metric over the default 24 hour window.
    pub fn new(device_id: impl Into<String>, metric: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            metric: metric.into(),
            window: WindowHours::default(),
        }
    }

    /// Use a different trailing window.
    pub fn with_window(mut self, window: WindowHours) -> Self {
        self.window = window;
        self
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.device_id, self.metric, self.window)
    }
}

/// Summary figures for a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub sample_count: usize,
}

impl DerivedStatistics {
    /// Compute statistics over `points`.
    ///
    /// Returns `None` for an empty series; a present value always has
    /// `sample_count >= 1` and a finite mean for finite inputs.
    pub fn compute(points: &[HistoryPoint]) -> Option<Self> {
        let first = points.first()?.value;
        let (min, max, sum) = points.iter().fold((first, first, 0.0), |(min, max, sum), p| {
            (min.min(p.value), max.max(p.value), sum + p.value)
        });

        Some(Self {
            min,
            max,
            mean: sum / points.len() as f64,
            sample_count: points.len(),
        })
    }
}

/// A completed query: the series and the statistics derived from it.
#[derive(Debug, Clone)]
pub struct HistoryResult {
    pub selection: Selection,
    /// Points in ascending timestamp order.
    pub points: Vec<HistoryPoint>,
    /// `None` when the series is empty.
    pub statistics: Option<DerivedStatistics>,
    pub fetched_at: Instant,
}

impl HistoryResult {
    fn new(selection: Selection, points: Vec<HistoryPoint>) -> Self {
        let statistics = DerivedStatistics::compute(&points);
        Self {
            selection,
            points,
            statistics,
            fetched_at: Instant::now(),
        }
    }

    /// Whether the query returned no data.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Identifies one issued query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTicket {
    generation: u64,
    selection: Selection,
}

/// Outcome of loading a ticket.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    /// The result became the current one.
    Applied(Arc<HistoryResult>),
    /// The selection changed while the query was in flight; the result was dropped.
    Superseded,
}

impl QueryOutcome {
    pub fn applied(&self) -> Option<&Arc<HistoryResult>> {
        match self {
            QueryOutcome::Applied(result) => Some(result),
            QueryOutcome::Superseded => None,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    generation: u64,
    selection: Option<Selection>,
    result: Option<Arc<HistoryResult>>,
}

/// Runs history queries and keeps the result for the current selection.
#[derive(Debug)]
pub struct HistoryEngine {
    client: BackendClient,
    inner: Mutex<Inner>,
}

impl HistoryEngine {
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Make `selection` current and issue a ticket for it.
    ///
    /// Any previous result is discarded immediately and any query still in
    /// flight for an earlier ticket will be superseded.
    pub fn select(&self, selection: Selection) -> HistoryTicket {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.selection = Some(selection.clone());
        inner.result = None;
        debug!(generation = inner.generation, %selection, "history selection");
        HistoryTicket {
            generation: inner.generation,
            selection,
        }
    }

    /// Fetch the series for `ticket` and apply it if the ticket is still current.
    pub async fn load(&self, ticket: HistoryTicket) -> QueryOutcome {
        let selection = &ticket.selection;
        let points = self
            .client
            .metric_history(&selection.device_id, &selection.metric, selection.window)
            .await;
        let result = Arc::new(HistoryResult::new(ticket.selection.clone(), points));

        let mut inner = self.inner.lock();
        if inner.generation != ticket.generation {
            info!(
                stale = %ticket.selection,
                generation = ticket.generation,
                current = inner.generation,
                "dropping superseded history result"
            );
            return QueryOutcome::Superseded;
        }
        inner.result = Some(result.clone());
        debug!(selection = %ticket.selection, samples = result.points.len(), "history applied");
        QueryOutcome::Applied(result)
    }

    /// Select and load in one step.
    pub async fn query(&self, selection: Selection) -> QueryOutcome {
        let ticket = self.select(selection);
        self.load(ticket).await
    }

    /// Re-run the current selection, if any.
    pub async fn refresh(&self) -> Option<QueryOutcome> {
        let selection = self.selection()?;
        Some(self.query(selection).await)
    }

    /// Forget the selection and its result.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.selection = None;
        inner.result = None;
    }

    /// Result for the current selection, if it has loaded.
    pub fn current(&self) -> Option<Arc<HistoryResult>> {
        self.inner.lock().result.clone()
    }

    pub fn selection(&self) -> Option<Selection> {
        self.inner.lock().selection.clone()
    }
}
