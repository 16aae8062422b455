//! VIM repository contract
//!
//! The repository is the persistent side of the bay. It stores four tables:
//!
//! ```text
//! configurations   uuid ─▶ WrapperConfiguration
//! links            compute_uuid ─▶ network_uuid        (at most one per compute)
//! attachments      vim_uuid ─▶ (wim_uuid, vim_address)  (at most one per VIM)
//! instances        service / function / cloud-service instance records
//! ```
//!
//! Implementations only store; uniqueness rules are enforced by the bay.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use types::{WrapperConfiguration, WrapperKind};

/// Repository failures
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Repository I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Repository snapshot is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Compute backend and the network backend chaining its functions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyLink {
    pub compute_uuid: String,
    pub network_uuid: String,
}

/// VIM reachable through a WIM at `vim_address`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WimAttachment {
    pub vim_uuid: String,
    pub vim_address: String,
    pub wim_uuid: String,
}

/// Service environment on one compute backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstanceRecord {
    pub instance_uuid: String,
    pub vim_uuid: String,
    pub vim_instance_id: String,
    pub vim_instance_name: String,
}

/// Placement of a function or cloud service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRecord {
    pub instance_uuid: String,
    pub service_instance_uuid: String,
    pub vim_uuid: String,
}

impl fmt::Display for PlacementRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) on {}", self.instance_uuid, self.service_instance_uuid, self.vim_uuid)
    }
}

/// What a placement record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementKind {
    Function,
    CloudService,
}

#[async_trait]
pub trait VimRepository: Send + Sync + fmt::Debug {
    async fn put_configuration(&self, config: &WrapperConfiguration) -> RepositoryResult<()>;

    async fn get_configuration(&self, uuid: &str) -> RepositoryResult<Option<WrapperConfiguration>>;

    /// Returns whether a configuration was removed
    async fn delete_configuration(&self, uuid: &str) -> RepositoryResult<bool>;

    async fn list_configurations(&self, kind: WrapperKind) -> RepositoryResult<Vec<WrapperConfiguration>>;

    async fn put_link(&self, link: &TopologyLink) -> RepositoryResult<()>;

    async fn link_for_compute(&self, compute_uuid: &str) -> RepositoryResult<Option<TopologyLink>>;

    /// Remove every link where `uuid` is the compute or the network side
    async fn delete_links_for(&self, uuid: &str) -> RepositoryResult<()>;

    async fn put_attachment(&self, attachment: &WimAttachment) -> RepositoryResult<()>;

    async fn attachment_for_vim(&self, vim_uuid: &str) -> RepositoryResult<Option<WimAttachment>>;

    /// Remove every attachment where `uuid` is the VIM or the WIM side
    async fn delete_attachments_for(&self, uuid: &str) -> RepositoryResult<()>;

    async fn put_service_instance(&self, record: &ServiceInstanceRecord) -> RepositoryResult<()>;

    async fn service_instances(&self, instance_uuid: &str) -> RepositoryResult<Vec<ServiceInstanceRecord>>;

    async fn put_placement(&self, kind: PlacementKind, record: &PlacementRecord) -> RepositoryResult<()>;

    async fn get_placement(
        &self,
        kind: PlacementKind,
        instance_uuid: &str,
    ) -> RepositoryResult<Option<PlacementRecord>>;

    /// Drop the service records and every placement owned by the service
    async fn delete_service(&self, instance_uuid: &str) -> RepositoryResult<()>;
}

/// Full repository content, also the on-disk snapshot format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryState {
    pub configurations: Vec<WrapperConfiguration>,
    pub links: Vec<TopologyLink>,
    pub attachments: Vec<WimAttachment>,
    pub services: Vec<ServiceInstanceRecord>,
    pub functions: Vec<PlacementRecord>,
    pub cloud_services: Vec<PlacementRecord>,
}

impl RepositoryState {
    pub(crate) fn placements(&self, kind: PlacementKind) -> &Vec<PlacementRecord> {
        match kind {
            PlacementKind::Function => &self.functions,
            PlacementKind::CloudService => &self.cloud_services,
        }
    }

    pub(crate) fn placements_mut(&mut self, kind: PlacementKind) -> &mut Vec<PlacementRecord> {
        match kind {
            PlacementKind::Function => &mut self.functions,
            PlacementKind::CloudService => &mut self.cloud_services,
        }
    }

    // Mutations shared by every repository backend

    pub(crate) fn put_configuration(&mut self, config: &WrapperConfiguration) {
        self.configurations.retain(|c| c.uuid != config.uuid);
        self.configurations.push(config.clone());
    }

    pub(crate) fn delete_configuration(&mut self, uuid: &str) -> bool {
        let before = self.configurations.len();
        self.configurations.retain(|c| c.uuid != uuid);
        self.configurations.len() != before
    }

    pub(crate) fn put_link(&mut self, link: &TopologyLink) {
        self.links.retain(|l| l.compute_uuid != link.compute_uuid);
        self.links.push(link.clone());
    }

    pub(crate) fn delete_links_for(&mut self, uuid: &str) {
        self.links
            .retain(|l| l.compute_uuid != uuid && l.network_uuid != uuid);
    }

    pub(crate) fn put_attachment(&mut self, attachment: &WimAttachment) {
        self.attachments.retain(|a| a.vim_uuid != attachment.vim_uuid);
        self.attachments.push(attachment.clone());
    }

    pub(crate) fn delete_attachments_for(&mut self, uuid: &str) {
        self.attachments
            .retain(|a| a.vim_uuid != uuid && a.wim_uuid != uuid);
    }

    pub(crate) fn put_service_instance(&mut self, record: &ServiceInstanceRecord) {
        self.services
            .retain(|s| !(s.instance_uuid == record.instance_uuid && s.vim_uuid == record.vim_uuid));
        self.services.push(record.clone());
    }

    pub(crate) fn put_placement(&mut self, kind: PlacementKind, record: &PlacementRecord) {
        let placements = self.placements_mut(kind);
        placements.retain(|p| p.instance_uuid != record.instance_uuid);
        placements.push(record.clone());
    }

    pub(crate) fn delete_service(&mut self, instance_uuid: &str) {
        self.services.retain(|s| s.instance_uuid != instance_uuid);
        self.functions
            .retain(|p| p.service_instance_uuid != instance_uuid);
        self.cloud_services
            .retain(|p| p.service_instance_uuid != instance_uuid);
    }
}
