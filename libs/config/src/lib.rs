//! # Adaptor Configuration
//!
//! Configuration loading and wire constants shared by the adaptor crates.
//!
//! ## Features
//!
//! - **Layered Loading**: optional TOML file, then `INFRABSTRACT_` environment overrides
//! - **Protocol Constants**: bus topics, agent ports, gatekeeper paths
//! - **Typed Durations**: millisecond settings exposed as [`std::time::Duration`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use adaptor_config::{protocol, AdaptorConfig};
//!
//! let config = AdaptorConfig::load(None)?;
//! let register = protocol::plugin::REGISTER;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod protocol;
pub mod service_config;

// Re-export commonly used types
pub use service_config::{
    AdaptorConfig, AdaptorSettings, BackendConfig, BusConfig, ChainConfig, HeartbeatConfig,
    LoggingConfig, RepositoryBackend, RepositoryConfig, SegmentConfig,
};
