//! Mock drivers
//!
//! Backend-free wrappers for every kind. The compute mock synthesises records
//! from the descriptors it is given; network and WIM mocks record each call in
//! a shared [`CallJournal`] and succeed, unless their configuration carries
//! `"mock_fail": true`.

use crate::error::{Result, WrapperError};
use crate::traits::{ComputeWrapper, NetworkWrapper, PreparedService, WimWrapper};
use async_trait::async_trait;
use dashmap::DashSet;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};
use types::{
    CloudServiceDeployPayload, CloudServiceDeployResponse, CloudServiceRecord,
    ConnectionPointRecord, FunctionDeployPayload, FunctionDeployResponse, InterfaceRecord,
    NetworkConfigurePayload, RequestStatus, ResourceUtilisation, ServiceDeployPayload,
    ServiceDeployResponse, VduRecord, VnfDescriptor, VnfImage, VnfRecord, VnfcInstance,
    WrapperConfiguration,
};

/// One recorded mock invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub wrapper_uuid: String,
    pub operation: &'static str,
    pub instance_id: String,
    /// Ordered connection-point references or VIM addresses, per operation
    pub targets: Vec<String>,
}

/// Shared record of mock invocations, in call order
#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl CallJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: MockCall) {
        self.calls.lock().push(call);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, wrapper_uuid: &str) -> Vec<MockCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.wrapper_uuid == wrapper_uuid)
            .cloned()
            .collect()
    }
}

fn should_fail(config: &WrapperConfiguration) -> bool {
    config
        .configuration
        .get("mock_fail")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

/// Compute mock
#[derive(Debug)]
pub struct ComputeMock {
    config: WrapperConfiguration,
    stored_images: DashSet<String>,
}

impl ComputeMock {
    pub fn new(config: WrapperConfiguration) -> Self {
        Self {
            config,
            stored_images: DashSet::new(),
        }
    }

    fn check(&self, operation: &str) -> Result<()> {
        if should_fail(&self.config) {
            return Err(WrapperError::backend(
                self.config.uuid.clone(),
                format!("mock configured to fail {operation}"),
            ));
        }
        Ok(())
    }

    /// Record as the backend would report it after a successful deploy
    fn synthesise_record(&self, vnfd: &VnfDescriptor) -> VnfRecord {
        let instance_id = vnfd.instance_uuid.clone().unwrap_or_else(types::new_sid);
        let units = vnfd
            .virtual_deployment_units
            .iter()
            .map(|vdu| VduRecord {
                id: vdu.id.clone(),
                number_of_instances: Some(1),
                vdu_reference: Some(format!("{}:{}", vnfd.name, vdu.id)),
                vm_image: vdu.vm_image.clone(),
                vnfc_instance: vec![VnfcInstance {
                    id: "0".to_string(),
                    vim_id: self.config.uuid.clone(),
                    vc_id: format!("Stack-{instance_id}-{}", vdu.id),
                    connection_points: vdu
                        .connection_points
                        .iter()
                        .map(|cp| ConnectionPointRecord {
                            id: cp.id.clone(),
                            cp_type: cp.cp_type.clone(),
                            interface: InterfaceRecord::default(),
                        })
                        .collect(),
                }],
            })
            .collect();

        VnfRecord {
            id: instance_id,
            descriptor_reference: vnfd.reference().to_string(),
            descriptor_version: Some("vnfr-schema-01".to_string()),
            status: Some("normal operation".to_string()),
            virtual_deployment_units: units,
        }
    }
}

#[async_trait]
impl ComputeWrapper for ComputeMock {
    fn config(&self) -> &WrapperConfiguration {
        &self.config
    }

    async fn deploy_function(&self, payload: &FunctionDeployPayload) -> Result<FunctionDeployResponse> {
        self.check("deploy_function")?;
        debug!(vim = %self.config.uuid, vnf = %payload.vnfd.name, "[ComputeMock] deploying function");

        let vnfr = self.synthesise_record(&payload.vnfd);
        let stack = format!("Stack-{}", vnfr.id);
        Ok(FunctionDeployResponse {
            request_status: RequestStatus::Completed,
            instance_vim_uuid: Some(stack.clone()),
            instance_name: Some(stack),
            vim_uuid: self.config.uuid.clone(),
            message: String::new(),
            vnfr: Some(vnfr),
        })
    }

    async fn deploy_cloud_service(
        &self,
        payload: &CloudServiceDeployPayload,
    ) -> Result<CloudServiceDeployResponse> {
        self.check("deploy_cloud_service")?;
        let csd = &payload.csd;
        Ok(CloudServiceDeployResponse {
            request_status: RequestStatus::Completed,
            vim_uuid: self.config.uuid.clone(),
            instance_name: Some(format!("Stack-{}", csd.instance_uuid)),
            message: String::new(),
            csr: Some(CloudServiceRecord {
                id: csd.instance_uuid.clone(),
                descriptor_reference: csd.uuid.clone().unwrap_or_else(|| csd.name.clone()),
                status: Some("normal operation".to_string()),
            }),
        })
    }

    async fn deploy_service(&self, payload: &ServiceDeployPayload) -> Result<ServiceDeployResponse> {
        self.check("deploy_service")?;
        let instance = payload
            .nsd
            .instance_uuid
            .clone()
            .unwrap_or_else(types::new_sid);
        Ok(ServiceDeployResponse {
            request_status: RequestStatus::Completed,
            vim_uuid: self.config.uuid.clone(),
            instance_vim_uuid: Some(format!("Stack-{instance}")),
            instance_name: Some(format!("Stack-{instance}")),
            message: String::new(),
            vnfrs: payload.vnfds.iter().map(|v| self.synthesise_record(v)).collect(),
        })
    }

    async fn prepare_service(&self, instance_id: &str) -> Result<PreparedService> {
        self.check("prepare_service")?;
        info!(vim = %self.config.uuid, instance_id, "[ComputeMock] preparing service");
        Ok(PreparedService {
            vim_instance_id: instance_id.to_string(),
            vim_instance_name: instance_id.to_string(),
        })
    }

    async fn remove_service(&self, instance_uuid: &str) -> Result<()> {
        self.check("remove_service")?;
        info!(vim = %self.config.uuid, instance_uuid, "[ComputeMock] removing service");
        Ok(())
    }

    async fn is_image_stored(&self, image: &VnfImage) -> Result<bool> {
        Ok(self.stored_images.contains(&image.image_uuid))
    }

    async fn upload_image(&self, image: &VnfImage) -> Result<()> {
        self.check("upload_image")?;
        self.stored_images.insert(image.image_uuid.clone());
        Ok(())
    }

    async fn remove_image(&self, image: &VnfImage) -> Result<()> {
        self.stored_images.remove(&image.image_uuid);
        Ok(())
    }

    async fn resource_utilisation(&self) -> Result<ResourceUtilisation> {
        Ok(ResourceUtilisation {
            tot_cores: 10,
            used_cores: 0,
            tot_memory: 10_000,
            used_memory: 0,
        })
    }
}

/// Network mock
#[derive(Debug)]
pub struct NetworkMock {
    config: WrapperConfiguration,
    journal: CallJournal,
}

impl NetworkMock {
    pub fn new(config: WrapperConfiguration, journal: CallJournal) -> Self {
        Self { config, journal }
    }

    fn record(&self, operation: &'static str, instance_id: &str, targets: Vec<String>) -> Result<()> {
        self.journal.record(MockCall {
            wrapper_uuid: self.config.uuid.clone(),
            operation,
            instance_id: instance_id.to_string(),
            targets,
        });
        if should_fail(&self.config) {
            return Err(WrapperError::backend(
                self.config.uuid.clone(),
                format!("mock configured to fail {operation}"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl NetworkWrapper for NetworkMock {
    fn config(&self) -> &WrapperConfiguration {
        &self.config
    }

    async fn configure(&self, payload: &NetworkConfigurePayload) -> Result<()> {
        let targets = payload
            .nsd
            .forwarding_graphs
            .iter()
            .flat_map(|fg| fg.network_forwarding_paths.iter())
            .flat_map(|path| path.connection_points.iter())
            .map(|cp| cp.connection_point_ref.clone())
            .collect();
        debug!(vim = %self.config.uuid, instance = %payload.service_instance_id, "[NetworkMock] configure");
        self.record("configure", &payload.service_instance_id, targets)
    }

    async fn deconfigure(&self, service_instance_id: &str) -> Result<()> {
        debug!(vim = %self.config.uuid, instance = %service_instance_id, "[NetworkMock] deconfigure");
        self.record("deconfigure", service_instance_id, Vec::new())
    }
}

/// WIM mock
#[derive(Debug)]
pub struct WimMock {
    config: WrapperConfiguration,
    journal: CallJournal,
}

impl WimMock {
    pub fn new(config: WrapperConfiguration, journal: CallJournal) -> Self {
        Self { config, journal }
    }
}

#[async_trait]
impl WimWrapper for WimMock {
    fn config(&self) -> &WrapperConfiguration {
        &self.config
    }

    async fn configure_network(
        &self,
        instance_id: &str,
        ingress: Option<&str>,
        egress: Option<&str>,
        vim_addresses: &[String],
    ) -> Result<()> {
        debug!(
            wim = %self.config.uuid,
            instance_id,
            ingress = ingress.unwrap_or("-"),
            egress = egress.unwrap_or("-"),
            "[WimMock] configure network"
        );
        self.journal.record(MockCall {
            wrapper_uuid: self.config.uuid.clone(),
            operation: "configure_network",
            instance_id: instance_id.to_string(),
            targets: vim_addresses.to_vec(),
        });
        if should_fail(&self.config) {
            return Err(WrapperError::backend(
                self.config.uuid.clone(),
                "mock configured to fail configure_network",
            ));
        }
        Ok(())
    }

    async fn remove_network(&self, instance_id: &str) -> Result<()> {
        self.journal.record(MockCall {
            wrapper_uuid: self.config.uuid.clone(),
            operation: "remove_network",
            instance_id: instance_id.to_string(),
            targets: Vec::new(),
        });
        Ok(())
    }
}
