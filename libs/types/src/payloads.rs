//! API request and response bodies
//!
//! Field names follow the bus wire format (snake_case). Optional fields are
//! omitted on write, unknown fields are ignored on read.

use crate::descriptors::{ServiceDescriptor, VnfDescriptor, VnfRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal status of an API call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    Completed,
    Error,
    Warning,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("COMPLETED"),
            Self::Error => f.write_str("ERROR"),
            Self::Warning => f.write_str("WARNING"),
        }
    }
}

/// Generic `{request_status, uuid?, message?}` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub request_status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiResponse {
    pub fn completed() -> Self {
        Self {
            request_status: RequestStatus::Completed,
            uuid: None,
            message: Some(String::new()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            request_status: RequestStatus::Error,
            uuid: None,
            message: Some(message.into()),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            request_status: RequestStatus::Warning,
            uuid: None,
            message: Some(message.into()),
        }
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    pub fn is_completed(&self) -> bool {
        self.request_status == RequestStatus::Completed
    }
}

// ---------------------------------------------------------------------------
// Management
// ---------------------------------------------------------------------------

/// Body of `infrastructure.management.<kind>.add`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddVimRequest {
    pub vim_type: String,
    pub vim_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub pass: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub configuration: serde_json::Value,
}

/// Body of `infrastructure.management.<kind>.remove`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveVimRequest {
    pub uuid: String,
}

/// Body of `infrastructure.management.wan.attach`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachVimRequest {
    pub wim_uuid: String,
    pub vim_uuid: String,
    pub vim_address: String,
}

/// Entry of a list response. Resource counters are `-1` when unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VimResources {
    pub vim_uuid: String,
    pub vim_name: String,
    pub vim_city: String,
    pub vim_domain: String,
    pub vim_endpoint: String,
    pub vim_type: String,
    pub core_total: i64,
    pub core_used: i64,
    pub memory_total: i64,
    pub memory_used: i64,
}

/// Resource usage reported by a compute backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceUtilisation {
    pub tot_cores: i64,
    pub used_cores: i64,
    pub tot_memory: i64,
    pub used_memory: i64,
}

impl ResourceUtilisation {
    pub const UNKNOWN: Self = Self {
        tot_cores: -1,
        used_cores: -1,
        tot_memory: -1,
        used_memory: -1,
    };

    /// Whether `cores` and `memory` still fit. Unknown totals never fit.
    pub fn can_host(&self, cores: i64, memory: i64) -> bool {
        if self.tot_cores < 0 || self.tot_memory < 0 {
            return false;
        }
        self.tot_cores - self.used_cores.max(0) >= cores
            && self.tot_memory - self.used_memory.max(0) >= memory
    }
}

/// Body of `infrastructure.management.compute.resourceAvailability`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAvailabilityPayload {
    pub vim_uuid: String,
    pub resource_request: ResourceRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequest {
    #[serde(default)]
    pub cpu: i64,
    #[serde(default)]
    pub memory: i64,
}

// ---------------------------------------------------------------------------
// Functions and cloud services
// ---------------------------------------------------------------------------

/// Body of `infrastructure.function.deploy`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeployPayload {
    pub vnfd: VnfDescriptor,
    pub vim_uuid: String,
    pub service_instance_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeployResponse {
    pub request_status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_vim_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_name: Option<String>,
    pub vim_uuid: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnfr: Option<VnfRecord>,
}

/// Body of `infrastructure.function.scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionScalePayload {
    pub function_instance_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vim_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_instance_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnfd: Option<VnfDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudServiceDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub instance_uuid: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_deployment_units: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudServiceRecord {
    pub id: String,
    pub descriptor_reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Body of `infrastructure.cloud_service.deploy`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudServiceDeployPayload {
    pub csd: CloudServiceDescriptor,
    pub vim_uuid: String,
    pub service_instance_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudServiceDeployResponse {
    pub request_status: RequestStatus,
    pub vim_uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_name: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csr: Option<CloudServiceRecord>,
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// Body of `infrastructure.service.deploy`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDeployPayload {
    pub vim_uuid: String,
    pub nsd: ServiceDescriptor,
    #[serde(default, rename = "vnfd_list", skip_serializing_if = "Vec::is_empty")]
    pub vnfds: Vec<VnfDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDeployResponse {
    pub request_status: RequestStatus,
    pub vim_uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_vim_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_name: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vnfrs: Vec<VnfRecord>,
}

/// Body of `infrastructure.service.prepare`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePreparePayload {
    pub instance_id: String,
    #[serde(default)]
    pub vim_list: Vec<VimPreDeploymentList>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VimPreDeploymentList {
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<VnfImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VnfImage {
    pub image_uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_md5: Option<String>,
}

/// Body of `infrastructure.service.remove`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRemovePayload {
    pub instance_uuid: String,
}

// ---------------------------------------------------------------------------
// Chaining and WAN
// ---------------------------------------------------------------------------

/// Network attachment points of a service chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAttachmentPoints {
    #[serde(default)]
    pub ingresses: Vec<NapObject>,
    #[serde(default)]
    pub egresses: Vec<NapObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NapObject {
    #[serde(default)]
    pub location: String,
    /// Network segment, e.g. `10.100.32.0/24`
    pub nap: String,
}

/// Body of `infrastructure.service.chain.configure`, also the shape of each
/// per-backend sub-request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfigurePayload {
    pub service_instance_id: String,
    pub nsd: ServiceDescriptor,
    #[serde(default)]
    pub vnfds: Vec<VnfDescriptor>,
    #[serde(default)]
    pub vnfrs: Vec<VnfRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nap: Option<NetworkAttachmentPoints>,
}

/// Body of `infrastructure.service.chain.deconfigure`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDeconfigurePayload {
    pub service_instance_id: String,
}

/// Body of `infrastructure.wan.configure`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WanConfigurePayload {
    pub instance_id: String,
    pub vim_list: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nap: Option<NetworkAttachmentPoints>,
}

/// Body of `infrastructure.wan.deconfigure`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WanDeconfigurePayload {
    pub instance_id: String,
}

// ---------------------------------------------------------------------------
// Plugin lifecycle
// ---------------------------------------------------------------------------

/// Body sent on `platform.management.plugin.register`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRegistration {
    pub name: String,
    pub version: String,
    pub description: String,
}

/// Plugin manager answer to register/deregister
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManagerReply {
    pub status: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PluginManagerReply {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("OK")
    }
}

/// Periodic heartbeat body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub uuid: String,
    pub state: String,
}
