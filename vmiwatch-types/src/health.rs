//! Gateway health report (`GET /api/health`).

/// Health report of the backend and its EnOcean link.
///
/// Only `enocean_connected` is required; a payload without it is malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HealthReport {
    /// Whether the gateway currently holds its EnOcean serial link.
    pub enocean_connected: bool,
    /// Free-form backend status ("healthy").
    #[cfg_attr(feature = "serde", serde(default))]
    pub status: Option<String>,
    /// Backend clock at the time of the report, as sent.
    #[cfg_attr(feature = "serde", serde(default))]
    pub timestamp: Option<String>,
}

impl HealthReport {
    /// Whether this report counts as connected.
    pub fn is_connected(&self) -> bool {
        self.enocean_connected
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_report() {
        let json = r#"{"status": "healthy", "timestamp": "2024-05-01T12:00:00", "enocean_connected": true}"#;
        let report: HealthReport = serde_json::from_str(json).unwrap();
        assert!(report.is_connected());
        assert_eq!(report.status.as_deref(), Some("healthy"));
    }

    #[test]
    fn test_missing_flag_is_malformed() {
        let json = r#"{"status": "healthy"}"#;
        assert!(serde_json::from_str::<HealthReport>(json).is_err());
    }
}
