//! Layered configuration.
//!
//! Sources, lowest priority first:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`--config`)
//! 3. environment variables prefixed `VMIWATCH_`, nested keys separated by
//!    `__` (e.g. `VMIWATCH_BACKEND__URL`, `VMIWATCH_REFRESH__HEALTH_INTERVAL`)
//! 4. command-line overrides
//!
//! ```toml
//! [backend]
//! url = "http://homeassistant.local:5000"
//! timeout = "10s"
//!
//! [refresh]
//! snapshot_interval = "30s"
//! health_interval = "5s"
//! health_stale_after = "15s"
//! snapshot_stale_after = "90s"
//!
//! [history]
//! window_hours = 24
//!
//! [logging]
//! level = "info"
//! file = "vmiwatch.log"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Deserializer};

use vmiwatch_types::WindowHours;

use crate::data::duration::parse_duration;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "VMIWATCH";

const DEFAULTS: &[(&str, &str)] = &[
    ("backend.url", "http://localhost:5000"),
    ("backend.timeout", "10s"),
    ("refresh.snapshot_interval", "30s"),
    ("refresh.health_interval", "5s"),
    ("refresh.health_stale_after", "15s"),
    ("refresh.snapshot_stale_after", "90s"),
    ("history.window_hours", "24"),
    ("logging.level", "info"),
    ("logging.file", "vmiwatch.log"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    pub url: String,
    #[serde(deserialize_with = "duration")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshSettings {
    #[serde(deserialize_with = "duration")]
    pub snapshot_interval: Duration,
    #[serde(deserialize_with = "duration")]
    pub health_interval: Duration,
    /// A connected indicator older than this is shown as disconnected.
    #[serde(deserialize_with = "duration")]
    pub health_stale_after: Duration,
    /// The snapshot is flagged as stale once older than this.
    #[serde(deserialize_with = "duration")]
    pub snapshot_stale_after: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistorySettings {
    #[serde(rename = "window_hours", deserialize_with = "window")]
    pub window: WindowHours,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    pub file: PathBuf,
}

/// Fully resolved settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub backend: BackendSettings,
    pub refresh: RefreshSettings,
    pub history: HistorySettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load settings from defaults, an optional file, the environment and `overrides`.
    ///
    /// `overrides` are `(key, value)` pairs using dotted keys such as `backend.url`.
    pub fn load(path: Option<&Path>, overrides: &[(&str, String)]) -> Result<Self> {
        let env = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__");
        Self::from_sources(path, Some(env), overrides)
    }

    fn from_sources(
        path: Option<&Path>,
        env: Option<Environment>,
        overrides: &[(&str, String)],
    ) -> Result<Self> {
        let mut builder = Config::builder();
        for (key, value) in DEFAULTS {
            builder = builder.set_default(*key, *value)?;
        }
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        if let Some(env) = env {
            builder = builder.add_source(env);
        }
        for (key, value) in overrides {
            builder = builder.set_override(*key, value.as_str())?;
        }

        let settings: Settings = builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        let url = &self.backend.url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("backend.url must be an http(s) URL, got '{}'", url);
        }

        let positive = [
            ("backend.timeout", self.backend.timeout),
            ("refresh.snapshot_interval", self.refresh.snapshot_interval),
            ("refresh.health_interval", self.refresh.health_interval),
            ("refresh.health_stale_after", self.refresh.health_stale_after),
            ("refresh.snapshot_stale_after", self.refresh.snapshot_stale_after),
        ];
        for (key, value) in positive {
            if value.is_zero() {
                bail!("{} must be greater than zero", key);
            }
        }

        let limits = [
            (
                "refresh.health_stale_after",
                self.refresh.health_stale_after,
                "refresh.health_interval",
                self.refresh.health_interval,
            ),
            (
                "refresh.snapshot_stale_after",
                self.refresh.snapshot_stale_after,
                "refresh.snapshot_interval",
                self.refresh.snapshot_interval,
            ),
        ];
        for (limit_key, limit, interval_key, interval) in limits {
            if limit <= interval {
                bail!(
                    "{} ({:?}) must be longer than {} ({:?})",
                    limit_key,
                    limit,
                    interval_key,
                    interval
                );
            }
        }
        Ok(())
    }
}

fn duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(serde::de::Error::custom)
}

fn window<'de, D: Deserializer<'de>>(deserializer: D) -> Result<WindowHours, D::Error> {
    let hours = u32::deserialize(deserializer)?;
    WindowHours::new(hours)
        .ok_or_else(|| serde::de::Error::custom("history window must be at least one hour"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn load_file(contents: &str) -> Result<Settings> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        Settings::from_sources(Some(file.path()), None, &[])
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_sources(None, None, &[]).unwrap();
        assert_eq!(settings.backend.url, "http://localhost:5000");
        assert_eq!(settings.backend.timeout, Duration::from_secs(10));
        assert_eq!(settings.refresh.snapshot_interval, Duration::from_secs(30));
        assert_eq!(settings.refresh.health_interval, Duration::from_secs(5));
        assert_eq!(settings.history.window.get(), 24);
        assert_eq!(settings.logging.file, PathBuf::from("vmiwatch.log"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let settings = load_file(
            r#"
            [backend]
            url = "http://gateway.local:8099"

            [refresh]
            health_interval = "2s"

            [history]
            window_hours = 6
            "#,
        )
        .unwrap();

        assert_eq!(settings.backend.url, "http://gateway.local:8099");
        assert_eq!(settings.refresh.health_interval, Duration::from_secs(2));
        assert_eq!(settings.refresh.snapshot_interval, Duration::from_secs(30));
        assert_eq!(settings.history.window.get(), 6);
    }

    #[test]
    fn test_overrides_win() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[backend]\nurl = \"http://from-file:5000\"").unwrap();

        let overrides = [("backend.url", "http://from-cli:5000".to_string())];
        let settings = Settings::from_sources(Some(file.path()), None, &overrides).unwrap();
        assert_eq!(settings.backend.url, "http://from-cli:5000");
    }

    #[test]
    fn test_zero_window_rejected() {
        let err = load_file("[history]\nwindow_hours = 0\n").unwrap_err();
        assert!(format!("{:#}", err).contains("at least one hour"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = load_file("[refresh]\nsnapshot_interval = \"0s\"\n").unwrap_err();
        assert!(err.to_string().contains("refresh.snapshot_interval"));
    }

    #[test]
    fn test_health_limit_must_exceed_interval() {
        let overrides = [("refresh.health_stale_after", "2s".to_string())];
        let err = Settings::from_sources(None, None, &overrides).unwrap_err();
        assert!(err.to_string().contains("refresh.health_stale_after"));

        let overrides = [("refresh.health_stale_after", "5s".to_string())];
        assert!(Settings::from_sources(None, None, &overrides).is_err());
    }

    #[test]
    fn test_snapshot_limit_must_exceed_interval() {
        let err = load_file("[refresh]\nsnapshot_interval = \"2m\"\n").unwrap_err();
        assert!(err.to_string().contains("refresh.snapshot_stale_after"));

        let settings = load_file(
            "[refresh]\nsnapshot_interval = \"2m\"\nsnapshot_stale_after = \"5m\"\n",
        )
        .unwrap();
        assert_eq!(settings.refresh.snapshot_stale_after, Duration::from_secs(300));
    }

    #[test]
    fn test_bad_duration_rejected() {
        assert!(load_file("[backend]\ntimeout = \"soon\"\n").is_err());
    }

    #[test]
    fn test_non_http_url_rejected() {
        assert!(load_file("[backend]\nurl = \"gateway:5000\"\n").is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let path = Path::new("/nonexistent/vmiwatch.toml");
        assert!(Settings::from_sources(Some(path), None, &[]).is_err());
    }
}
