//! Historical series returned by the history endpoints.

use crate::Timestamp;

/// One point of a metric series (`GET /api/reading/{device}/{metric}`).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistoryPoint {
    /// When the value was recorded.
    #[cfg_attr(feature = "serde", serde(with = "crate::timestamp"))]
    pub timestamp: Timestamp,
    /// Recorded value.
    pub value: f64,
}

impl HistoryPoint {
    /// Create a new point.
    pub fn new(timestamp: Timestamp, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// One raw reading of any metric of a device (`GET /api/history/{device}`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    /// When the value was recorded.
    #[cfg_attr(feature = "serde", serde(with = "crate::timestamp"))]
    pub timestamp: Timestamp,
    /// Metric key.
    pub metric: String,
    /// Recorded value.
    pub value: f64,
    /// Unit recorded by the gateway, if any.
    #[cfg_attr(feature = "serde", serde(default))]
    pub unit: Option<String>,
}

/// Sort points by timestamp, oldest first.
///
/// The sort is stable, so points sharing a timestamp keep their backend order.
pub fn sort_chronologically(points: &mut [HistoryPoint]) {
    points.sort_by_key(|p| p.timestamp);
}
