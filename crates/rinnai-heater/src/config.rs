//! Heater configuration.
//!
//! Sources, lowest priority first:
//! 1. defaults
//! 2. TOML file
//! 3. environment variables (`RINNAI_*`)
//!
//! Command-line flags are layered on top by the host.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{HeaterError, HeaterResult};

/// Default poll interval in seconds.
pub const DEFAULT_SCAN_INTERVAL: f64 = 15.0;

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT: f64 = 10.0;

/// Upper bound for any interval or timeout, one day.
pub const MAX_SECONDS: f64 = 86_400.0;

/// Environment variable names.
pub mod env_vars {
    pub const HOST: &str = "RINNAI_HOST";
    pub const NAME: &str = "RINNAI_NAME";
    pub const SCAN_INTERVAL: &str = "RINNAI_SCAN_INTERVAL";
    pub const REQUEST_TIMEOUT: &str = "RINNAI_REQUEST_TIMEOUT";
}

/// Options of one configured heater.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaterConfig {
    /// Display name
    #[serde(default = "default_name")]
    pub name: String,
    /// Host or IP address of the heater
    #[serde(default)]
    pub host: String,
    /// Poll interval in seconds
    #[serde(default = "default_scan_interval")]
    pub scan_interval: f64,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: f64,
}

fn default_name() -> String {
    "Rinnai".to_string()
}

fn default_scan_interval() -> f64 {
    DEFAULT_SCAN_INTERVAL
}

fn default_request_timeout() -> f64 {
    DEFAULT_REQUEST_TIMEOUT
}

impl Default for HeaterConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            host: String::new(),
            scan_interval: DEFAULT_SCAN_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl HeaterConfig {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_scan_interval(mut self, seconds: f64) -> Self {
        self.scan_interval = seconds;
        self
    }

    pub fn with_request_timeout(mut self, seconds: f64) -> Self {
        self.request_timeout = seconds;
        self
    }

    /// Parse from TOML text.
    pub fn from_toml(content: &str) -> HeaterResult<Self> {
        toml::from_str(content)
            .map_err(|e| HeaterError::Configuration(format!("Invalid config: {}", e)))
    }

    /// Read a TOML file.
    pub fn load(path: impl AsRef<Path>) -> HeaterResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            HeaterError::Configuration(format!("Cannot read {}: {}", path.display(), e))
        })?;
        info!(category = "config", "Loading config from: {}", path.display());
        Self::from_toml(&content)
    }

    /// Apply `RINNAI_*` environment overrides.
    pub fn with_env_overrides(self) -> HeaterResult<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (environment in production).
    pub fn with_overrides_from<F>(mut self, lookup: F) -> HeaterResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(env_vars::HOST) {
            self.host = host;
        }
        if let Some(name) = lookup(env_vars::NAME) {
            self.name = name;
        }
        if let Some(v) = lookup(env_vars::SCAN_INTERVAL) {
            self.scan_interval = parse_seconds(env_vars::SCAN_INTERVAL, &v)?;
        }
        if let Some(v) = lookup(env_vars::REQUEST_TIMEOUT) {
            self.request_timeout = parse_seconds(env_vars::REQUEST_TIMEOUT, &v)?;
        }
        Ok(self)
    }

    /// Check the options are usable.
    pub fn validate(&self) -> HeaterResult<()> {
        if self.host.trim().is_empty() {
            return Err(HeaterError::Configuration("host is required".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(HeaterError::Configuration("name is required".to_string()));
        }
        for (key, value) in [
            ("scan_interval", self.scan_interval),
            ("request_timeout", self.request_timeout),
        ] {
            if !in_range(value) {
                return Err(HeaterError::Configuration(format!(
                    "{} must be between 0 and {} seconds, got {}",
                    key, MAX_SECONDS, value
                )));
            }
        }
        Ok(())
    }

    /// Entry title shown by the host.
    pub fn title(&self) -> String {
        format!("Rinnai Heater ({})", self.name)
    }

    /// Base URL of the device, `http://` assumed when no scheme is given.
    pub fn base_url(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("http://{}", host)
        }
    }

    /// Poll interval; the default when the option is out of range.
    pub fn scan_interval(&self) -> Duration {
        seconds_or(self.scan_interval, DEFAULT_SCAN_INTERVAL)
    }

    /// Request timeout; the default when the option is out of range.
    pub fn request_timeout(&self) -> Duration {
        seconds_or(self.request_timeout, DEFAULT_REQUEST_TIMEOUT)
    }
}

fn in_range(seconds: f64) -> bool {
    seconds.is_finite() && seconds > 0.0 && seconds <= MAX_SECONDS
}

fn seconds_or(seconds: f64, default: f64) -> Duration {
    Duration::from_secs_f64(if in_range(seconds) { seconds } else { default })
}

fn parse_seconds(key: &str, value: &str) -> HeaterResult<f64> {
    value.trim().parse().map_err(|_| {
        HeaterError::Configuration(format!("{} must be a number, got '{}'", key, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = HeaterConfig::new("Garage", "192.168.1.50");
        assert_eq!(config.scan_interval, 15.0);
        assert_eq!(config.scan_interval(), Duration::from_secs(15));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = HeaterConfig::from_toml(
            r#"
            host = "10.0.0.7"
            scan_interval = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.scan_interval(), Duration::from_secs(30));

        let config = HeaterConfig::from_toml(
            r#"
            host = "10.0.0.7"
            scan_interval = 2.5
            "#,
        )
        .unwrap();
        assert_eq!(config.host, "10.0.0.7");
        assert_eq!(config.name, "Rinnai");
        assert_eq!(config.scan_interval(), Duration::from_millis(2500));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name = \"Kitchen\"\nhost = \"heater.local\"").unwrap();

        let config = HeaterConfig::load(file.path()).unwrap();
        assert_eq!(config.name, "Kitchen");
        assert_eq!(config.title(), "Rinnai Heater (Kitchen)");

        assert!(HeaterConfig::load("/nonexistent/rinnai.toml").is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (env_vars::HOST, "10.1.1.1"),
            (env_vars::SCAN_INTERVAL, "5"),
        ]
        .into_iter()
        .collect();

        let config = HeaterConfig::new("Garage", "old")
            .with_overrides_from(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.host, "10.1.1.1");
        assert_eq!(config.name, "Garage");
        assert_eq!(config.scan_interval, 5.0);

        let bad = HeaterConfig::default()
            .with_overrides_from(|k| (k == env_vars::REQUEST_TIMEOUT).then(|| "soon".to_string()));
        assert!(matches!(bad, Err(HeaterError::Configuration(_))));
    }

    #[test]
    fn test_validate() {
        assert!(HeaterConfig::default().validate().is_err());
        assert!(HeaterConfig::new("a", "h").with_scan_interval(0.0).validate().is_err());
        assert!(HeaterConfig::new("a", "h")
            .with_request_timeout(f64::NAN)
            .validate()
            .is_err());
        assert!(HeaterConfig::new(" ", "h").validate().is_err());
    }

    #[test]
    fn test_huge_seconds_rejected_without_panic() {
        let config = HeaterConfig::new("a", "h")
            .with_scan_interval(1e30)
            .with_request_timeout(f64::INFINITY);
        assert!(matches!(
            config.validate(),
            Err(HeaterError::Configuration(msg)) if msg.contains("scan_interval")
        ));
        assert!(HeaterConfig::new("a", "h")
            .with_scan_interval(MAX_SECONDS + 1.0)
            .validate()
            .is_err());
        assert!(HeaterConfig::new("a", "h")
            .with_scan_interval(MAX_SECONDS)
            .validate()
            .is_ok());

        // accessors fall back to the defaults instead of panicking
        assert_eq!(config.scan_interval(), Duration::from_secs(15));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        let nan = HeaterConfig::new("a", "h").with_request_timeout(f64::NAN);
        assert_eq!(nan.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_base_url() {
        assert_eq!(HeaterConfig::new("a", "10.0.0.2").base_url(), "http://10.0.0.2");
        assert_eq!(
            HeaterConfig::new("a", "http://heater:8080/").base_url(),
            "http://heater:8080"
        );
    }
}
