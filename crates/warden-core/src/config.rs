//! Supervisor configuration.
//!
//! Configuration is validated at load time, with defaults matching the
//! daemon's usual invocation (`--address`, 500ms polling).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SupervisorError};
use crate::launch::DEFAULT_ADDRESS_FLAG;
use crate::probe::{DEFAULT_POLL_INTERVAL, DEFAULT_SKIP_SENTINEL};

/// Supervisor configuration.
///
/// `binary_path`, `args` and `address` are only consulted by
/// [`DaemonSupervisor::start_configured`](crate::DaemonSupervisor::start_configured);
/// the explicit `start` ignores them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupervisorConfig {
    /// Path to the daemon binary.
    #[serde(default)]
    pub binary_path: PathBuf,

    /// Extra command-line arguments placed before the address flag.
    #[serde(default)]
    pub args: Vec<String>,

    /// Address the daemon listens on.
    #[serde(default)]
    pub address: String,

    /// Flag used to pass the address.
    #[serde(default = "default_address_flag")]
    pub address_flag: String,

    /// Readiness polling interval.
    #[serde(default = "default_poll_interval", with = "humantime_str")]
    pub poll_interval: Duration,

    /// How long `wait_for_start` callers should wait by default.
    #[serde(default = "default_startup_timeout", with = "humantime_str")]
    pub startup_timeout: Duration,

    /// Init-error marker meaning "component declined to load".
    #[serde(default = "default_skip_sentinel")]
    pub skip_sentinel: String,
}

fn default_address_flag() -> String {
    DEFAULT_ADDRESS_FLAG.to_string()
}

const fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

const fn default_startup_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_skip_sentinel() -> String {
    DEFAULT_SKIP_SENTINEL.to_string()
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::new(),
            args: Vec::new(),
            address: String::new(),
            address_flag: default_address_flag(),
            poll_interval: default_poll_interval(),
            startup_timeout: default_startup_timeout(),
            skip_sentinel: default_skip_sentinel(),
        }
    }
}

impl SupervisorConfig {
    /// Creates a configuration for launching `binary_path` on `address`.
    #[must_use]
    pub fn new(binary_path: impl Into<PathBuf>, address: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
            address: address.into(),
            ..Self::default()
        }
    }

    /// Sets the extra arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the polling interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the default startup timeout.
    #[must_use]
    pub const fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.address_flag.is_empty() {
            return Err(SupervisorError::config("address_flag cannot be empty"));
        }
        if self.poll_interval.is_zero() {
            return Err(SupervisorError::config("poll_interval must be positive"));
        }
        if self.startup_timeout < self.poll_interval {
            return Err(SupervisorError::config(format!(
                "startup_timeout ({}) is shorter than poll_interval ({})",
                humantime::format_duration(self.startup_timeout),
                humantime::format_duration(self.poll_interval),
            )));
        }
        if self.skip_sentinel.is_empty() {
            return Err(SupervisorError::config("skip_sentinel cannot be empty"));
        }
        Ok(())
    }

    /// Validates the fields `start_configured` needs on top of [`validate`](Self::validate).
    pub(crate) fn validate_launch(&self) -> Result<()> {
        self.validate()?;
        if self.binary_path.as_os_str().is_empty() {
            return Err(SupervisorError::config("binary_path cannot be empty"));
        }
        if self.address.is_empty() {
            return Err(SupervisorError::config("address cannot be empty"));
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| SupervisorError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SupervisorError::config(format!("failed to read config: {e}")))?;
        Self::from_toml_str(&content)
    }
}

/// Durations as humantime strings ("500ms", "30s").
mod humantime_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SupervisorConfig::default();
        assert_eq!(config.address_flag, "--address");
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.skip_sentinel, "skip plugin");
        assert!(config.validate().is_ok());
        assert!(config.validate_launch().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let config = SupervisorConfig::from_toml_str(
            r#"
            binary_path = "/usr/local/bin/containerd"
            args = ["--log-level", "debug"]
            address = "/run/test/containerd.sock"
            poll_interval = "250ms"
            startup_timeout = "1m"
            "#,
        )
        .unwrap();

        assert_eq!(config.binary_path, PathBuf::from("/usr/local/bin/containerd"));
        assert_eq!(config.args, ["--log-level", "debug"]);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.startup_timeout, Duration::from_secs(60));
        assert_eq!(config.address_flag, "--address");
        assert!(config.validate_launch().is_ok());
    }

    #[test]
    fn test_reject_bad_duration() {
        let err = SupervisorConfig::from_toml_str(r#"poll_interval = "soon""#).unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn test_reject_unknown_field() {
        assert!(SupervisorConfig::from_toml_str("restart_policy = \"always\"").is_err());
    }

    #[test]
    fn test_validate_timeout_shorter_than_interval() {
        let config = SupervisorConfig::default()
            .with_poll_interval(Duration::from_secs(2))
            .with_startup_timeout(Duration::from_secs(1));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("startup_timeout"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "address = \"127.0.0.1:9000\"").unwrap();
        writeln!(file, "binary_path = \"daemon-bin\"").unwrap();

        let config = SupervisorConfig::load(file.path()).unwrap();
        assert_eq!(config.address, "127.0.0.1:9000");
    }

    #[test]
    fn test_load_missing_file() {
        let err = SupervisorConfig::load("/nonexistent/warden.toml").unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }

    #[test]
    fn test_roundtrip_durations_as_strings() {
        let config = SupervisorConfig::new("bin", "addr");
        let text = toml::to_string(&config).unwrap();
        assert!(text.contains("poll_interval = \"500ms\""));
        assert_eq!(SupervisorConfig::from_toml_str(&text).unwrap(), config);
    }
}
