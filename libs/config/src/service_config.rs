//! Adaptor Configuration Module
//!
//! Loads [`AdaptorConfig`] from an optional TOML file layered with
//! `INFRABSTRACT_` environment overrides. Nested keys use a double underscore,
//! e.g. `INFRABSTRACT_ADAPTOR__MAX_WORKERS=64`.

use anyhow::{Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "INFRABSTRACT";

/// Main adaptor configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct AdaptorConfig {
    pub adaptor: AdaptorSettings,
    pub bus: BusConfig,
    pub heartbeat: HeartbeatConfig,
    pub repository: RepositoryConfig,
    pub backends: BackendConfig,
    pub segments: SegmentConfig,
    pub chain: ChainConfig,
    pub logging: LoggingConfig,
}

/// Plugin identity and worker pool
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AdaptorSettings {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Upper bound on concurrently running call processors
    pub max_workers: usize,
    /// Bound on any single backend call awaited by a processor
    pub call_timeout_ms: u64,
    /// How long register/deregister wait for the plugin manager
    pub registration_timeout_ms: u64,
}

impl Default for AdaptorSettings {
    fn default() -> Self {
        Self {
            name: crate::protocol::identity::APP_ID.to_string(),
            version: "0.0.1".to_string(),
            description: crate::protocol::identity::DESCRIPTION.to_string(),
            max_workers: 32,
            call_timeout_ms: 600_000,
            registration_timeout_ms: 100_000,
        }
    }
}

impl AdaptorSettings {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn registration_timeout(&self) -> Duration {
        Duration::from_millis(self.registration_timeout_ms)
    }
}

/// Bus bridge connection
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BusConfig {
    /// `host:port` of the broker bridge
    pub address: String,
    pub connect_timeout_ms: u64,
    /// Capacity of the inbound and outbound queues
    pub queue_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:5673".to_string(),
            connect_timeout_ms: 5_000,
            queue_capacity: 1024,
        }
    }
}

impl BusConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub enabled: bool,
    pub interval_ms: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 10_000,
        }
    }
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Which repository backs the wrapper registry
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RepositoryConfig {
    pub backend: RepositoryBackend,
    /// Snapshot file for the `file` backend. `$VARS` and `~` are expanded.
    pub path: PathBuf,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            backend: RepositoryBackend::Memory,
            path: PathBuf::from("./data/vim-repository.json"),
        }
    }
}

/// Wire-level settings of the backend drivers
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BackendConfig {
    pub ovs_agent_port: u16,
    pub ovs_timeout_ms: u64,
    pub vtn_port: u16,
    pub http_timeout_ms: u64,
    pub gatekeeper_port: u16,
    pub poll_initial_ms: u64,
    pub poll_max_ms: u64,
    pub poll_attempts: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            ovs_agent_port: crate::protocol::ovs::AGENT_PORT,
            ovs_timeout_ms: 30_000,
            vtn_port: crate::protocol::vtn::SERVER_PORT,
            http_timeout_ms: 30_000,
            gatekeeper_port: crate::protocol::gatekeeper::PORT,
            poll_initial_ms: 1_000,
            poll_max_ms: 15_000,
            poll_attempts: 50,
        }
    }
}

impl BackendConfig {
    pub fn ovs_timeout(&self) -> Duration {
        Duration::from_millis(self.ovs_timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn poll_initial(&self) -> Duration {
        Duration::from_millis(self.poll_initial_ms)
    }

    pub fn poll_max(&self) -> Duration {
        Duration::from_millis(self.poll_max_ms)
    }
}

/// Segments used when a call carries no network attachment points
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SegmentConfig {
    pub ingress: String,
    pub egress: String,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            ingress: "10.100.16.0/24".to_string(),
            egress: "10.100.32.0/24".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct ChainConfig {
    /// Best-effort deconfigure of already configured groups when a later group fails
    pub compensate_on_failure: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AdaptorConfig {
    /// Load configuration from an optional file with environment overrides.
    ///
    /// An explicitly given file must exist. Without one, `config/adaptor.toml`
    /// is used when present and defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        builder = match path {
            Some(path) => {
                info!("Loading adaptor config: {:?}", path);
                builder.add_source(File::from(path).required(true))
            }
            None => builder.add_source(File::with_name("config/adaptor").required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let mut adaptor: AdaptorConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        adaptor.expand_env_vars()?;
        adaptor.validate()?;

        debug!(?adaptor, "Configuration loaded");
        Ok(adaptor)
    }

    /// Expand environment variables in path and address values
    pub fn expand_env_vars(&mut self) -> Result<()> {
        let path = self.repository.path.to_string_lossy().into_owned();
        let expanded = shellexpand::full(&path).context("Failed to expand repository path")?;
        self.repository.path = PathBuf::from(expanded.as_ref());

        let expanded =
            shellexpand::env(&self.bus.address).context("Failed to expand bus address")?;
        self.bus.address = expanded.into_owned();

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.adaptor.max_workers == 0 {
            anyhow::bail!("adaptor.max_workers must be at least 1");
        }
        if self.backends.poll_attempts == 0 {
            anyhow::bail!("backends.poll_attempts must be at least 1");
        }
        if self.bus.queue_capacity == 0 {
            anyhow::bail!("bus.queue_capacity must be at least 1");
        }
        Ok(())
    }

    /// Render as TOML, used by `--print-config`
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("adaptor.toml");

        let config_content = r#"
[adaptor]
max_workers = 4

[repository]
backend = "file"
path = "/tmp/infrabstract/repo.json"

[chain]
compensate_on_failure = true
"#;
        fs::write(&config_path, config_content).unwrap();

        let config = AdaptorConfig::load(Some(&config_path)).unwrap();

        assert_eq!(config.adaptor.max_workers, 4);
        assert_eq!(config.repository.backend, RepositoryBackend::File);
        assert!(config.chain.compensate_on_failure);
        assert_eq!(config.backends.ovs_agent_port, 55555);
        assert_eq!(config.backends.poll_max(), Duration::from_secs(15));
        assert_eq!(config.heartbeat.interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(AdaptorConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("adaptor.toml");
        fs::write(&config_path, "[adaptor]\nmax_workers = 0\n").unwrap();
        assert!(AdaptorConfig::load(Some(&config_path)).is_err());
    }

    #[test]
    fn test_defaults_render_as_toml() {
        let rendered = AdaptorConfig::default().to_toml().unwrap();
        assert!(rendered.contains("compensate_on_failure = false"));
    }
}
