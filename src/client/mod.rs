//! Typed client for the gateway's telemetry API.
//!
//! Every resource operation absorbs failures: a transport error, a
//! non-success status or a malformed payload is logged and turned into the
//! resource's "no data" value (empty map, empty list, `None`, `false`).
//! Callers therefore only ever deal with "empty vs present".
//!
//! The network itself sits behind the [`Transport`] trait so the rest of the
//! engine can be exercised without a running backend.

mod error;
mod http;
#[cfg(test)]
pub(crate) mod mock;

pub use error::{FailureClass, FetchError};
pub use http::{HttpTransport, HttpTransportBuilder};

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use vmiwatch_types::{
    sort_chronologically, Device, DeviceSnapshot, HealthReport, HistoryPoint, Reading,
    WindowHours,
};

/// Raw request/response exchange with the backend.
///
/// Implementations return the body of a successful response; any
/// non-success status must be reported as [`FetchError::Status`].
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Issue a GET for `path` with the given query parameters.
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<u8>, FetchError>;

    /// Issue a body-less POST for `path`.
    async fn post(&self, path: &str) -> Result<Vec<u8>, FetchError>;
}

/// Client for the `/api` surface of the gateway backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    transport: Arc<dyn Transport>,
}

impl BackendClient {
    /// Create a client over an arbitrary transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Create an HTTP client for the backend at `base_url`.
    pub fn http(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let transport = HttpTransport::builder()
            .base_url(base_url)
            .timeout(timeout)
            .build()?;
        Ok(Self::new(Arc::new(transport)))
    }

    /// Gateway health, or `None` if the probe failed in any way.
    pub async fn health(&self) -> Option<HealthReport> {
        let result = self.try_get::<HealthReport>("/api/health", &[]).await;
        absorb("health", result.map(Some), None)
    }

    /// Configured devices, or an empty list on failure.
    pub async fn devices(&self) -> Vec<Device> {
        let result = self.try_get("/api/devices", &[]).await;
        absorb("devices", result, Vec::new())
    }

    /// Latest readings of every device, or an empty snapshot on failure.
    pub async fn current_snapshot(&self) -> DeviceSnapshot {
        let result = self.try_get("/api/current", &[]).await;
        absorb("current", result, DeviceSnapshot::new())
    }

    /// All readings of a device over the trailing window, as returned by the backend.
    pub async fn history(&self, device_id: &str, window: WindowHours) -> Vec<Reading> {
        let path = format!("/api/history/{}", encode_segment(device_id));
        let result = self.try_get(&path, &window_query(window)).await;
        absorb("history", result, Vec::new())
    }

    /// One metric of a device over the trailing window, oldest first.
    pub async fn metric_history(
        &self,
        device_id: &str,
        metric: &str,
        window: WindowHours,
    ) -> Vec<HistoryPoint> {
        let path = format!(
            "/api/reading/{}/{}",
            encode_segment(device_id),
            encode_segment(metric)
        );
        let result = self
            .try_get::<Vec<HistoryPoint>>(&path, &window_query(window))
            .await
            .map(|mut points| {
                sort_chronologically(&mut points);
                points
            });
        absorb("metric_history", result, Vec::new())
    }

    /// Ask the backend to purge old readings.
    ///
    /// Returns the acknowledgment: `true` only if the backend answered with
    /// a success status.
    pub async fn cleanup(&self) -> bool {
        let result = self.transport.post("/api/cleanup").await.map(|_| true);
        absorb("cleanup", result, false)
    }

    /// Fetch and decode a resource without absorbing failures.
    pub async fn try_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        debug!(path, "GET");
        let body = self.transport.get(path, query).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Replace a failed fetch with the resource's empty value, logging the failure.
fn absorb<T>(resource: &'static str, result: Result<T, FetchError>, default: T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(resource, class = e.class().as_str(), error = %e, "request failed, using empty result");
            default
        }
    }
}

fn window_query(window: WindowHours) -> [(&'static str, String); 1] {
    [("hours", window.get().to_string())]
}

// Percent-encode a value for use as a single path segment
fn encode_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::mock::{MockReply, MockTransport};
    use super::*;
    use serde_json::json;

    fn client(mock: &Arc<MockTransport>) -> BackendClient {
        BackendClient::new(mock.clone())
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("0421574F"), "0421574F");
        assert_eq!(encode_segment("a/b"), "a%2Fb");
        assert_eq!(encode_segment("co2 level"), "co2%20level");
    }

    #[tokio::test]
    async fn test_health_present() {
        let mock = Arc::new(MockTransport::new());
        mock.reply("/api/health", MockReply::Json(json!({"status": "healthy", "enocean_connected": true})));

        let report = client(&mock).health().await.unwrap();
        assert!(report.enocean_connected);
    }

    #[tokio::test]
    async fn test_health_failures_are_absent() {
        let mock = Arc::new(MockTransport::new());
        let client = client(&mock);

        mock.reply("/api/health", MockReply::TransportError);
        assert!(client.health().await.is_none());

        mock.reply("/api/health", MockReply::Status(503));
        assert!(client.health().await.is_none());

        mock.reply("/api/health", MockReply::Json(json!({"status": "healthy"})));
        assert!(client.health().await.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_failure_is_empty_map() {
        let mock = Arc::new(MockTransport::new());
        mock.reply("/api/current", MockReply::Status(500));
        assert!(client(&mock).current_snapshot().await.is_empty());

        mock.reply("/api/current", MockReply::Raw(b"<html>oops</html>".to_vec()));
        assert!(client(&mock).current_snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_devices_and_failure() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(
            "/api/devices",
            MockReply::Json(json!([{"id": "0421574F", "name": "VMI", "type": "vmi"}])),
        );
        let devices = client(&mock).devices().await;
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "0421574F");

        mock.reply("/api/devices", MockReply::TransportError);
        assert!(client(&mock).devices().await.is_empty());
    }

    #[tokio::test]
    async fn test_metric_history_sends_window_and_sorts() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(
            "/api/reading/0421574F/indoor_temperature",
            MockReply::Json(json!([
                {"timestamp": "2024-05-01T12:00:00", "value": 21.0},
                {"timestamp": "2024-05-01T10:00:00", "value": 19.0}
            ])),
        );

        let window = WindowHours::new(6).unwrap();
        let points = client(&mock)
            .metric_history("0421574F", "indoor_temperature", window)
            .await;

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, 19.0);
        assert_eq!(
            mock.calls(),
            vec!["GET /api/reading/0421574F/indoor_temperature?hours=6".to_string()]
        );
    }

    #[tokio::test]
    async fn test_raw_history_uses_default_window() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(
            "/api/history/0421574F",
            MockReply::Json(json!([
                {"timestamp": "2024-05-01 10:00:00", "metric": "humidity", "value": 48.0, "unit": "%"}
            ])),
        );

        let readings = client(&mock)
            .history("0421574F", WindowHours::default())
            .await;
        assert_eq!(readings.len(), 1);
        assert_eq!(mock.calls(), vec!["GET /api/history/0421574F?hours=24".to_string()]);
    }

    #[tokio::test]
    async fn test_cleanup_acknowledgment() {
        let mock = Arc::new(MockTransport::new());
        let client = client(&mock);

        mock.reply("/api/cleanup", MockReply::Raw(Vec::new()));
        assert!(client.cleanup().await);

        mock.reply("/api/cleanup", MockReply::Status(500));
        assert!(!client.cleanup().await);

        mock.reply("/api/cleanup", MockReply::TransportError);
        assert!(!client.cleanup().await);
        assert_eq!(mock.calls().iter().filter(|c| c.starts_with("POST")).count(), 3);
    }

    #[tokio::test]
    async fn test_try_get_exposes_failure_class() {
        let mock = Arc::new(MockTransport::new());
        mock.reply("/api/current", MockReply::Status(404));

        let err = client(&mock)
            .try_get::<DeviceSnapshot>("/api/current", &[])
            .await
            .unwrap_err();
        assert_eq!(err.class(), FailureClass::Protocol);
    }
}
