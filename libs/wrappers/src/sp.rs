//! Remote service-platform compute driver
//!
//! Treats another service platform as a compute backend. Functions are
//! deployed by instantiating the matching service through the remote
//! gatekeeper, then long-polling the request until it settles.

use crate::backoff::{Backoff, PollStatus};
use crate::error::{Result, WrapperError};
use crate::traits::{ComputeWrapper, PreparedService};
use adaptor_config::protocol::gatekeeper;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use types::{
    FunctionDeployPayload, FunctionDeployResponse, RequestStatus, ResourceUtilisation,
    VimResources, VnfImage, VnfRecord, WrapperConfiguration,
};

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct SessionToken {
    token: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    token: SessionToken,
}

#[derive(Debug, Deserialize)]
struct ServiceSummary {
    name: String,
    #[serde(default)]
    vendor: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

/// Entry of `GET /services`
#[derive(Debug, Deserialize)]
struct ServiceListEntry {
    uuid: String,
    nsd: ServiceSummary,
}

/// Gatekeeper request object
#[derive(Debug, Clone, Deserialize)]
pub struct GkRequest {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub service_instance_uuid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecordReference {
    vnfr_id: String,
}

#[derive(Debug, Deserialize)]
struct ServiceRecord {
    #[serde(default)]
    network_functions: Vec<RecordReference>,
}

#[derive(Debug, Deserialize)]
struct VimRequestItems {
    request_uuid: String,
}

#[derive(Debug, Deserialize)]
struct VimRequestCreated {
    status: u16,
    items: VimRequestItems,
}

#[derive(Debug)]
pub struct SonataSpWrapper {
    config: WrapperConfiguration,
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    backoff: Backoff,
}

impl SonataSpWrapper {
    pub fn new(
        config: WrapperConfiguration,
        client: reqwest::Client,
        port: u16,
        timeout: Duration,
        backoff: Backoff,
    ) -> Self {
        let base_url = format!("http://{}:{}", config.endpoint, port);
        Self {
            config,
            client,
            base_url,
            timeout,
            backoff,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn backend_error(&self, message: impl Into<String>) -> WrapperError {
        WrapperError::backend(self.config.uuid.clone(), message)
    }

    async fn authenticate(&self) -> Result<String> {
        let response = self
            .client
            .post(self.url(gatekeeper::SESSIONS_PATH))
            .timeout(self.timeout)
            .json(&Credentials {
                username: &self.config.auth_user,
                password: &self.config.auth_secret,
            })
            .send()
            .await
            .map_err(|e| WrapperError::http("gatekeeper authentication", self.timeout, e))?;

        if response.status() != StatusCode::OK {
            return Err(self.backend_error(format!(
                "authentication failed with {}",
                response.status()
            )));
        }
        let session: SessionResponse = response.json().await.map_err(|e| {
            WrapperError::backend_with_source(self.config.uuid.clone(), "invalid session", e)
        })?;
        debug!(vim = %self.config.uuid, "Gatekeeper client authenticated");
        Ok(session.token.token)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, token: &str, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| WrapperError::http(path, self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.backend_error(format!("GET {path} returned {status}")));
        }
        response.json().await.map_err(|e| {
            WrapperError::backend_with_source(self.config.uuid.clone(), format!("invalid {path} body"), e)
        })
    }

    async fn create_request(&self, token: &str, body: serde_json::Value) -> Result<GkRequest> {
        let response = self
            .client
            .post(self.url(gatekeeper::REQUESTS_PATH))
            .bearer_auth(token)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| WrapperError::http("gatekeeper request creation", self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.backend_error(format!("request creation returned {status}")));
        }
        response.json().await.map_err(|e| {
            WrapperError::backend_with_source(self.config.uuid.clone(), "invalid request object", e)
        })
    }

    /// Poll a gatekeeper request until it is READY or ERROR
    async fn wait_for(&self, token: &str, request_id: &str) -> Result<GkRequest> {
        let path = format!("{}/{}", gatekeeper::REQUESTS_PATH, request_id);
        let operation = format!("gatekeeper request {request_id}");

        let request = self
            .backoff
            .poll(&operation, |attempt| {
                let path = path.clone();
                async move {
                    let request: GkRequest = self.get_json(token, &path).await?;
                    debug!(vim = %self.config.uuid, attempt, status = %request.status, "Polled gatekeeper request");
                    match request.status.to_ascii_uppercase().as_str() {
                        "READY" | "ERROR" => Ok::<_, WrapperError>(PollStatus::Ready(request)),
                        _ => Ok(PollStatus::Pending),
                    }
                }
            })
            .await?;

        if request.status.eq_ignore_ascii_case("ERROR") {
            return Err(self.backend_error(format!("remote request {request_id} failed")));
        }
        Ok(request)
    }
}

#[async_trait]
impl ComputeWrapper for SonataSpWrapper {
    fn config(&self) -> &WrapperConfiguration {
        &self.config
    }

    async fn deploy_function(&self, payload: &FunctionDeployPayload) -> Result<FunctionDeployResponse> {
        let vnfd = &payload.vnfd;
        let token = self.authenticate().await?;

        let services: Vec<ServiceListEntry> = self
            .get_json(&token, &format!("{}?status=active", gatekeeper::SERVICES_PATH))
            .await?;
        let service = services
            .iter()
            .find(|s| {
                s.nsd.name == vnfd.name
                    && (vnfd.vendor.is_none() || s.nsd.vendor == vnfd.vendor)
                    && (vnfd.version.is_none() || s.nsd.version == vnfd.version)
            })
            .ok_or_else(|| {
                self.backend_error(format!("no active service '{}' on remote platform", vnfd.name))
            })?;

        info!(vim = %self.config.uuid, service = %service.uuid, "Instantiating remote service");
        let created = self
            .create_request(
                &token,
                serde_json::json!({ "service_uuid": service.uuid, "ingresses": [], "egresses": [] }),
            )
            .await?;
        let settled = self.wait_for(&token, &created.id).await?;

        let service_instance = settled
            .service_instance_uuid
            .ok_or_else(|| self.backend_error("READY request without service instance"))?;
        let record: ServiceRecord = self
            .get_json(
                &token,
                &format!("{}/{}", gatekeeper::SERVICE_RECORDS_PATH, service_instance),
            )
            .await?;
        let vnfr_id = record
            .network_functions
            .first()
            .map(|f| f.vnfr_id.clone())
            .ok_or_else(|| self.backend_error("remote service record has no functions"))?;
        let mut vnfr: VnfRecord = self
            .get_json(
                &token,
                &format!("{}/{}", gatekeeper::FUNCTION_RECORDS_PATH, vnfr_id),
            )
            .await?;

        // Present the remote record under the local identity
        if let Some(instance) = &vnfd.instance_uuid {
            vnfr.id = instance.clone();
        }
        vnfr.descriptor_reference = vnfd.reference().to_string();

        Ok(FunctionDeployResponse {
            request_status: RequestStatus::Completed,
            instance_vim_uuid: Some(service_instance.clone()),
            instance_name: Some(service_instance),
            vim_uuid: self.config.uuid.clone(),
            message: String::new(),
            vnfr: Some(vnfr),
        })
    }

    async fn prepare_service(&self, instance_id: &str) -> Result<PreparedService> {
        // The remote platform builds its own environment on instantiation
        Ok(PreparedService {
            vim_instance_id: instance_id.to_string(),
            vim_instance_name: instance_id.to_string(),
        })
    }

    async fn remove_service(&self, instance_uuid: &str) -> Result<()> {
        let token = self.authenticate().await?;
        let created = self
            .create_request(
                &token,
                serde_json::json!({ "service_instance_uuid": instance_uuid, "request_type": "TERMINATE" }),
            )
            .await?;
        self.wait_for(&token, &created.id).await?;
        info!(vim = %self.config.uuid, instance_uuid, "Remote service terminated");
        Ok(())
    }

    async fn is_image_stored(&self, _image: &VnfImage) -> Result<bool> {
        // Images are managed by the remote platform
        Ok(true)
    }

    async fn upload_image(&self, image: &VnfImage) -> Result<()> {
        warn!(vim = %self.config.uuid, image = %image.image_uuid, "Image upload ignored by remote platform");
        Ok(())
    }

    async fn resource_utilisation(&self) -> Result<ResourceUtilisation> {
        let token = self.authenticate().await?;
        let created: VimRequestCreated = self.get_json(&token, gatekeeper::VIMS_PATH).await?;
        if created.status != 201 {
            return Err(self.backend_error(format!(
                "unexpected status {} on VIM request creation",
                created.status
            )));
        }

        let path = format!("{}/{}", gatekeeper::VIMS_PATH, created.items.request_uuid);
        let vims: Vec<VimResources> = self
            .backoff
            .poll("gatekeeper vim list", |_| {
                let path = path.clone();
                let token = token.clone();
                async move {
                    let vims: Vec<VimResources> = self.get_json(&token, &path).await?;
                    if vims.is_empty() {
                        Ok::<_, WrapperError>(PollStatus::Pending)
                    } else {
                        Ok(PollStatus::Ready(vims))
                    }
                }
            })
            .await?;

        Ok(vims.iter().fold(
            ResourceUtilisation {
                tot_cores: 0,
                used_cores: 0,
                tot_memory: 0,
                used_memory: 0,
            },
            |acc, vim| ResourceUtilisation {
                tot_cores: acc.tot_cores + vim.core_total.max(0),
                used_cores: acc.used_cores + vim.core_used.max(0),
                tot_memory: acc.tot_memory + vim.memory_total.max(0),
                used_memory: acc.used_memory + vim.memory_used.max(0),
            },
        ))
    }
}
