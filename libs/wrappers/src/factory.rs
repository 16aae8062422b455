//! Wrapper construction from stored configurations

use crate::backoff::Backoff;
use crate::error::{Result, WrapperError};
use crate::mock::{CallJournal, ComputeMock, NetworkMock, WimMock};
use crate::ovs::OvsWrapper;
use crate::sp::SonataSpWrapper;
use crate::traits::Wrapper;
use crate::vtn::VtnWrapper;
use adaptor_config::{BackendConfig, SegmentConfig};
use std::sync::Arc;
use tracing::debug;
use types::{Vendor, WrapperConfiguration, WrapperKind};

/// Builds live wrappers. One factory is shared by the whole bay so that
/// every HTTP driver reuses the same connection pool.
#[derive(Debug, Clone)]
pub struct WrapperFactory {
    backends: BackendConfig,
    segments: SegmentConfig,
    http: reqwest::Client,
    journal: CallJournal,
}

impl WrapperFactory {
    pub fn new(backends: BackendConfig, segments: SegmentConfig) -> Self {
        Self::with_journal(backends, segments, CallJournal::new())
    }

    /// Factory whose mocks record into `journal`
    pub fn with_journal(
        backends: BackendConfig,
        segments: SegmentConfig,
        journal: CallJournal,
    ) -> Self {
        Self {
            backends,
            segments,
            http: reqwest::Client::new(),
            journal,
        }
    }

    pub fn journal(&self) -> &CallJournal {
        &self.journal
    }

    pub fn create(&self, config: &WrapperConfiguration) -> Result<Wrapper> {
        if config.kind == WrapperKind::Storage {
            return Err(WrapperError::configuration(
                "storage wrappers are not supported",
                Some("kind"),
            ));
        }
        if config.vendor.kind() != config.kind {
            return Err(WrapperError::configuration(
                format!(
                    "vendor '{}' cannot drive a {} wrapper",
                    config.vendor.as_str(),
                    config.kind
                ),
                Some("vendor"),
            ));
        }

        debug!(uuid = %config.uuid, kind = %config.kind, vendor = config.vendor.as_str(), "Creating wrapper");
        let config = config.clone();
        let wrapper = match config.vendor {
            Vendor::ComputeMock => Wrapper::Compute(Arc::new(ComputeMock::new(config))),
            Vendor::SonataSp => Wrapper::Compute(Arc::new(SonataSpWrapper::new(
                config,
                self.http.clone(),
                self.backends.gatekeeper_port,
                self.backends.http_timeout(),
                Backoff::from_config(&self.backends),
            ))),
            Vendor::NetworkMock => {
                Wrapper::Network(Arc::new(NetworkMock::new(config, self.journal.clone())))
            }
            Vendor::Ovs => Wrapper::Network(Arc::new(OvsWrapper::new(
                config,
                self.backends.ovs_agent_port,
                self.backends.ovs_timeout(),
                self.segments.clone(),
            ))),
            Vendor::WimMock => Wrapper::Wim(Arc::new(WimMock::new(config, self.journal.clone()))),
            Vendor::Vtn => Wrapper::Wim(Arc::new(VtnWrapper::new(
                config,
                self.http.clone(),
                self.backends.vtn_port,
                self.backends.http_timeout(),
                self.segments.clone(),
            ))),
        };
        Ok(wrapper)
    }
}

impl Default for WrapperFactory {
    fn default() -> Self {
        Self::new(BackendConfig::default(), SegmentConfig::default())
    }
}
