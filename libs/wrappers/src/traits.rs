//! Wrapper capability contracts
//!
//! A wrapper is the adaptor's handle on one backend. Capabilities are grouped
//! per kind; every operation a driver does not implement falls through to a
//! default body returning [`WrapperError::Unsupported`], so a missing capability
//! is always an explicit error and never a silent no-op.
//!
//! ```mermaid
//! graph LR
//!     Bay -->|get_wrapper| W[Wrapper]
//!     W --> C[ComputeWrapper]
//!     W --> N[NetworkWrapper]
//!     W --> M[WimWrapper]
//!     C --> CM[ComputeMock]
//!     C --> SP[SonataSpWrapper]
//!     N --> NM[NetworkMock]
//!     N --> OVS[OvsWrapper]
//!     M --> WM[WimMock]
//!     M --> VTN[VtnWrapper]
//! ```

use crate::error::{Result, WrapperError};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use types::{
    ApiResponse, CloudServiceDeployPayload, CloudServiceDeployResponse, FunctionDeployPayload,
    FunctionDeployResponse, FunctionScalePayload, NetworkConfigurePayload, ResourceUtilisation,
    ServiceDeployPayload, ServiceDeployResponse, VnfImage, WrapperConfiguration, WrapperKind,
};

/// Backend identifiers assigned when a service environment is prepared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedService {
    pub vim_instance_id: String,
    pub vim_instance_name: String,
}

/// Compute backend: hosts functions and cloud services
#[async_trait]
pub trait ComputeWrapper: Send + Sync + fmt::Debug {
    fn config(&self) -> &WrapperConfiguration;

    async fn deploy_function(
        &self,
        _payload: &FunctionDeployPayload,
    ) -> Result<FunctionDeployResponse> {
        Err(WrapperError::unsupported("deploy_function", self.config().vendor))
    }

    async fn scale_function(&self, _payload: &FunctionScalePayload) -> Result<ApiResponse> {
        Err(WrapperError::unsupported("scale_function", self.config().vendor))
    }

    async fn deploy_cloud_service(
        &self,
        _payload: &CloudServiceDeployPayload,
    ) -> Result<CloudServiceDeployResponse> {
        Err(WrapperError::unsupported("deploy_cloud_service", self.config().vendor))
    }

    /// Whole-service deployment on a single backend
    async fn deploy_service(&self, _payload: &ServiceDeployPayload) -> Result<ServiceDeployResponse> {
        Err(WrapperError::unsupported("deploy_service", self.config().vendor))
    }

    /// Create the per-service environment (tenant, network, ...) on this backend
    async fn prepare_service(&self, _instance_id: &str) -> Result<PreparedService> {
        Err(WrapperError::unsupported("prepare_service", self.config().vendor))
    }

    async fn remove_service(&self, _instance_uuid: &str) -> Result<()> {
        Err(WrapperError::unsupported("remove_service", self.config().vendor))
    }

    async fn is_image_stored(&self, _image: &VnfImage) -> Result<bool> {
        Err(WrapperError::unsupported("is_image_stored", self.config().vendor))
    }

    async fn upload_image(&self, _image: &VnfImage) -> Result<()> {
        Err(WrapperError::unsupported("upload_image", self.config().vendor))
    }

    async fn remove_image(&self, _image: &VnfImage) -> Result<()> {
        Err(WrapperError::unsupported("remove_image", self.config().vendor))
    }

    async fn resource_utilisation(&self) -> Result<ResourceUtilisation> {
        Err(WrapperError::unsupported("resource_utilisation", self.config().vendor))
    }
}

/// Network backend: chains traffic between functions of one compute PoP
#[async_trait]
pub trait NetworkWrapper: Send + Sync + fmt::Debug {
    fn config(&self) -> &WrapperConfiguration;

    /// Apply the (single-path) forwarding graph carried by `payload`
    async fn configure(&self, _payload: &NetworkConfigurePayload) -> Result<()> {
        Err(WrapperError::unsupported("configure", self.config().vendor))
    }

    async fn deconfigure(&self, _service_instance_id: &str) -> Result<()> {
        Err(WrapperError::unsupported("deconfigure", self.config().vendor))
    }
}

/// WAN backend: steers traffic between PoPs
#[async_trait]
pub trait WimWrapper: Send + Sync + fmt::Debug {
    fn config(&self) -> &WrapperConfiguration;

    /// Install one rule from `ingress` to `egress` across `vim_addresses`, in order
    async fn configure_network(
        &self,
        _instance_id: &str,
        _ingress: Option<&str>,
        _egress: Option<&str>,
        _vim_addresses: &[String],
    ) -> Result<()> {
        Err(WrapperError::unsupported("configure_network", self.config().vendor))
    }

    async fn remove_network(&self, _instance_id: &str) -> Result<()> {
        Err(WrapperError::unsupported("remove_network", self.config().vendor))
    }
}

/// A live wrapper instance, one per configuration uuid
#[derive(Clone, Debug)]
pub enum Wrapper {
    Compute(Arc<dyn ComputeWrapper>),
    Network(Arc<dyn NetworkWrapper>),
    Wim(Arc<dyn WimWrapper>),
}

impl Wrapper {
    pub fn config(&self) -> &WrapperConfiguration {
        match self {
            Self::Compute(w) => w.config(),
            Self::Network(w) => w.config(),
            Self::Wim(w) => w.config(),
        }
    }

    pub fn uuid(&self) -> &str {
        &self.config().uuid
    }

    pub fn kind(&self) -> WrapperKind {
        match self {
            Self::Compute(_) => WrapperKind::Compute,
            Self::Network(_) => WrapperKind::Network,
            Self::Wim(_) => WrapperKind::Wim,
        }
    }

    pub fn as_compute(&self) -> Option<Arc<dyn ComputeWrapper>> {
        match self {
            Self::Compute(w) => Some(Arc::clone(w)),
            _ => None,
        }
    }

    pub fn as_network(&self) -> Option<Arc<dyn NetworkWrapper>> {
        match self {
            Self::Network(w) => Some(Arc::clone(w)),
            _ => None,
        }
    }

    pub fn as_wim(&self) -> Option<Arc<dyn WimWrapper>> {
        match self {
            Self::Wim(w) => Some(Arc::clone(w)),
            _ => None,
        }
    }
}

impl fmt::Display for Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.config())
    }
}
