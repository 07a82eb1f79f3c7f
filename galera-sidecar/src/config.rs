//! Sidecar configuration, loaded once at startup from a YAML file.

pub mod duration;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{Result, SidecarError};
use duration::{deserialize_duration, deserialize_optional_duration};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SidecarConfig {
    /// Name of the service monit supervises (`mysql`, or `garbd` on arbitrators)
    pub service_name: String,

    /// Where the declared state marker lives
    pub state_file_path: PathBuf,

    /// host:port of the node's readiness endpoint
    pub galera_init_address: String,

    #[serde(default)]
    pub readiness: ReadinessConfig,

    pub monit: MonitConfig,
}

/// Polling behavior while waiting for a started node to become ready
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadinessConfig {
    #[serde(default = "default_tick_interval", deserialize_with = "deserialize_duration")]
    pub tick_interval: Duration,

    #[serde(default = "default_probe_timeout", deserialize_with = "deserialize_duration")]
    pub probe_timeout: Duration,

    /// Upper bound on the whole wait. Unset means wait until the node
    /// answers or the process dies.
    #[serde(default, deserialize_with = "deserialize_optional_duration")]
    pub max_wait: Option<Duration>,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            probe_timeout: default_probe_timeout(),
            max_wait: None,
        }
    }
}

/// Connection settings for monit's HTTP interface
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitConfig {
    #[serde(default = "default_monit_host")]
    pub host: String,
    #[serde(default = "default_monit_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
}

fn default_tick_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(1)
}

fn default_monit_host() -> String {
    "127.0.0.1".to_string()
}

fn default_monit_port() -> u16 {
    2822
}

impl SidecarConfig {
    /// Read, parse, and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SidecarError::ConfigNotFound(path.to_path_buf())
            } else {
                SidecarError::ConfigRead {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        Self::parse(&contents, path)
    }

    /// Parse config from YAML text; `path` is only used in error messages
    pub fn parse(contents: &str, path: &Path) -> Result<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(contents);
        let config: SidecarConfig =
            serde_path_to_error::deserialize(deserializer).map_err(|e| SidecarError::ConfigParse {
                path: path.to_path_buf(),
                source: e,
            })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.service_name.trim().is_empty() {
            return Err(SidecarError::Config("service_name must not be empty".to_string()));
        }
        if self.galera_init_address.trim().is_empty() {
            return Err(SidecarError::Config(
                "galera_init_address must not be empty".to_string(),
            ));
        }
        if self.galera_init_address.contains("://") {
            return Err(SidecarError::Config(format!(
                "galera_init_address must be host:port, got '{}'",
                self.galera_init_address
            )));
        }
        if self.readiness.tick_interval.is_zero() {
            return Err(SidecarError::Config(
                "readiness.tick_interval must be greater than zero".to_string(),
            ));
        }
        if self.readiness.probe_timeout.is_zero() {
            return Err(SidecarError::Config(
                "readiness.probe_timeout must be greater than zero".to_string(),
            ));
        }
        if self.readiness.max_wait.is_some_and(|d| d.is_zero()) {
            return Err(SidecarError::Config(
                "readiness.max_wait must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }
}
