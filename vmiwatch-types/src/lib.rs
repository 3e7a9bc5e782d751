//! # vmiwatch-types
//!
//! Core types for the Ventilairsec VMI telemetry API. This crate defines the
//! shapes exchanged with the gateway backend (devices, current snapshots,
//! history series, health reports) and the small amount of domain knowledge
//! attached to them, such as the unit class implied by a metric key.
//!
//! ## Features
//!
//! - `serde`: JSON (de)serialization matching the backend's wire format,
//!   including ISO-8601 timestamp parsing
//!
//! ## Example
//!
//! ```rust
//! use vmiwatch_types::{MetricKind, WindowHours};
//!
//! let kind = MetricKind::from_key("indoor_temperature");
//! assert_eq!(kind.format(21.04), "21.0°C");
//!
//! assert_eq!(WindowHours::default().get(), 24);
//! assert!(WindowHours::new(0).is_none());
//! ```

mod device;
mod health;
mod history;
mod metric;
pub mod timestamp;
mod window;

pub use device::*;
pub use health::*;
pub use history::*;
pub use metric::*;
pub use window::*;

/// Timestamps are normalized to UTC at the API boundary.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
