// Library crate: public API items may not be used by the binary
#![allow(unused)]

//! # vmiwatch
//!
//! A terminal dashboard and refresh engine for a Ventilairsec VMI gateway.
//!
//! The gateway exposes a small JSON API over HTTP: the current reading of
//! every EnOcean device, per-device and per-metric history, a health probe
//! and a cleanup endpoint. This crate keeps a local picture of that state up
//! to date and renders it in an interactive terminal UI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Dashboard                           │
//! │  ┌───────────┐   ┌──────────────┐   ┌───────────────┐        │
//! │  │ scheduler │──▶│ SnapshotCache│──▶│  watch chan   │──▶ app │
//! │  │ (timers)  │──▶│ HealthMonitor│──▶│  watch chan   │──▶ ui  │
//! │  └───────────┘   └──────┬───────┘   └───────────────┘        │
//! │                         │          ┌───────────────┐         │
//! │    user selection ─────────────────▶ HistoryEngine │         │
//! │                         ▼          └───────┬───────┘         │
//! │                  ┌──────────────┐          │                 │
//! │                  │ BackendClient│◀─────────┘                 │
//! │                  └──────┬───────┘                            │
//! └─────────────────────────┼────────────────────────────────────┘
//!                           ▼
//!                     gateway /api
//! ```
//!
//! - **[`client`]**: typed access to the backend; failures become empty values
//! - **[`data`]**: the snapshot cache, health monitor and history query engine
//! - **[`scheduler`]**: periodic single-flight timers with visibility handling
//! - **[`dashboard`]**: wires the above together for a front end
//! - **[`app`]**, **[`events`]**, **[`ui`]**: the ratatui front end
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Watch a gateway on the local network
//! vmiwatch --url http://vmi.local:5000
//!
//! # Export the current state and exit
//! vmiwatch export state.json
//!
//! # Print the CO2 history of one device over the last 6 hours
//! vmiwatch history 0511A2B3 --metric co2 --hours 6
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use std::time::Duration;
//! use vmiwatch::{BackendClient, Dashboard, DashboardOptions};
//!
//! # tokio_test::block_on(async {
//! let client = BackendClient::http("http://localhost:5000", Duration::from_secs(10)).unwrap();
//! let dashboard = Dashboard::new(client, DashboardOptions::default());
//! dashboard.start();
//!
//! let mut updates = dashboard.snapshots().subscribe();
//! updates.changed().await.unwrap();
//! println!("{} devices", updates.borrow().len());
//! # });
//! ```

pub mod app;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod events;
pub mod logging;
pub mod scheduler;
pub mod ui;

// Re-export main types for convenience
pub use app::{App, View};
pub use client::{BackendClient, FetchError, HttpTransport, Transport};
pub use config::Settings;
pub use dashboard::{Dashboard, DashboardOptions};
pub use data::{
    DerivedStatistics, HealthMonitor, HealthState, HistoryEngine, HistoryResult, LinkStatus,
    QueryOutcome, Selection, SnapshotCache, SnapshotView,
};
pub use scheduler::{RefreshScheduler, RefreshTask, TimerKind, TimerState, Visibility};
pub use vmiwatch_types as types;
