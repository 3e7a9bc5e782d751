//! Devices and current-value snapshots.

use std::collections::BTreeMap;

use crate::{MetricReading, Timestamp};

/// A wireless device known to the gateway (the VMI unit, its assistant, sensors).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Device {
    /// Stable EnOcean identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Device type (e.g. "vmi", "co2_sensor").
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: String,
}

/// Current state of one device within a snapshot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceState {
    /// Display name.
    pub name: String,
    /// Device type.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: String,
    /// When the gateway last heard from the device.
    #[cfg_attr(feature = "serde", serde(with = "crate::timestamp"))]
    pub last_update: Timestamp,
    /// Latest value per metric key.
    #[cfg_attr(feature = "serde", serde(default))]
    pub metrics: BTreeMap<String, f64>,
}

impl DeviceState {
    /// Device metadata for the given id.
    pub fn device(&self, id: &str) -> Device {
        Device {
            id: id.to_string(),
            name: self.name.clone(),
            kind: self.kind.clone(),
        }
    }

    /// Iterate over the metrics as readings, in key order.
    pub fn readings(&self) -> impl Iterator<Item = MetricReading> + '_ {
        self.metrics
            .iter()
            .map(|(key, value)| MetricReading::new(key.clone(), *value))
    }

    /// Metric keys in key order.
    pub fn metric_keys(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }
}

/// The complete set of current readings from one poll, keyed by device id.
///
/// It matches the JSON object returned by `GET /api/current`.
pub type DeviceSnapshot = BTreeMap<String, DeviceState>;
