//! Wrapper registry ("bay")
//!
//! The bay owns every live wrapper and is the only writer of the VIM
//! repository. Mutations are serialised per uuid and always hit the
//! repository before the cache, so a reader sees either the state before or
//! the state after a change, never a cache entry without its record.
//!
//! ```mermaid
//! sequenceDiagram
//!     participant P as Processor
//!     participant B as WrapperBay
//!     participant R as VimRepository
//!     participant C as Cache
//!     P->>B: register_network(config, compute)
//!     B->>B: lock(compute, network)
//!     B->>R: link_for_compute(compute)
//!     B->>R: put_configuration / put_link
//!     B->>C: insert(wrapper)
//!     B-->>P: ApiResponse{COMPLETED, uuid}
//! ```

use crate::repository::{
    PlacementKind, PlacementRecord, RepositoryError, ServiceInstanceRecord, TopologyLink,
    VimRepository, WimAttachment,
};
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use types::{ApiResponse, ModelError, WrapperConfiguration, WrapperKind};
use wrappers::{ComputeWrapper, NetworkWrapper, WimWrapper, Wrapper, WrapperError, WrapperFactory};

/// Registry failures
#[derive(Debug, Error)]
pub enum BayError {
    #[error("Wrapper not found: {0}")]
    NotFound(String),

    #[error("Wrapper {uuid} is a {actual} wrapper, expected {expected}")]
    WrongKind {
        uuid: String,
        expected: WrapperKind,
        actual: WrapperKind,
    },

    #[error("Compute VIM {compute_uuid} is already linked to network VIM {network_uuid}")]
    AlreadyLinked {
        compute_uuid: String,
        network_uuid: String,
    },

    #[error("VIM {vim_uuid} is already attached to WIM {wim_uuid}")]
    AlreadyAttached { vim_uuid: String, wim_uuid: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Wrapper(#[from] WrapperError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type BayResult<T> = std::result::Result<T, BayError>;

#[derive(Debug)]
pub struct WrapperBay {
    repository: Arc<dyn VimRepository>,
    factory: WrapperFactory,
    wrappers: DashMap<String, Wrapper>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl WrapperBay {
    pub fn new(repository: Arc<dyn VimRepository>, factory: WrapperFactory) -> Self {
        Self {
            repository,
            factory,
            wrappers: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    pub fn repository(&self) -> &Arc<dyn VimRepository> {
        &self.repository
    }

    pub fn factory(&self) -> &WrapperFactory {
        &self.factory
    }

    /// Number of live wrapper instances
    pub fn cached(&self) -> usize {
        self.wrappers.len()
    }

    async fn lock(&self, uuid: &str) -> UuidGuard<'_> {
        let lock = self
            .locks
            .entry(uuid.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        UuidGuard {
            locks: &self.locks,
            key: uuid.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Lock two uuids in a fixed order
    async fn lock_pair(&self, a: &str, b: &str) -> (UuidGuard<'_>, Option<UuidGuard<'_>>) {
        if a == b {
            return (self.lock(a).await, None);
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first = self.lock(first).await;
        let second = self.lock(second).await;
        (first, Some(second))
    }

    // ---------------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------------

    pub async fn register_compute(&self, config: WrapperConfiguration) -> ApiResponse {
        let uuid = config.uuid.clone();
        respond("compute", &uuid, self.try_register(config, WrapperKind::Compute).await)
    }

    pub async fn register_wim(&self, config: WrapperConfiguration) -> ApiResponse {
        let uuid = config.uuid.clone();
        respond("wim", &uuid, self.try_register(config, WrapperKind::Wim).await)
    }

    pub async fn register_network(&self, config: WrapperConfiguration, compute_uuid: &str) -> ApiResponse {
        let uuid = config.uuid.clone();
        respond(
            "network",
            &uuid,
            self.try_register_network(config, compute_uuid).await,
        )
    }

    async fn try_register(&self, config: WrapperConfiguration, expected: WrapperKind) -> BayResult<()> {
        check_kind(&config, expected)?;
        let wrapper = self.factory.create(&config)?;

        let _guard = self.lock(&config.uuid).await;
        self.repository.put_configuration(&config).await?;
        self.wrappers.insert(config.uuid.clone(), wrapper);
        Ok(())
    }

    async fn try_register_network(&self, config: WrapperConfiguration, compute_uuid: &str) -> BayResult<()> {
        check_kind(&config, WrapperKind::Network)?;

        let _guards = self.lock_pair(compute_uuid, &config.uuid).await;
        let parent = self
            .repository
            .get_configuration(compute_uuid)
            .await?
            .ok_or_else(|| BayError::NotFound(compute_uuid.to_string()))?;
        check_kind(&parent, WrapperKind::Compute)?;

        if let Some(existing) = self.repository.link_for_compute(compute_uuid).await? {
            return Err(BayError::AlreadyLinked {
                compute_uuid: existing.compute_uuid,
                network_uuid: existing.network_uuid,
            });
        }

        let wrapper = self.factory.create(&config)?;
        self.repository.put_configuration(&config).await?;
        self.repository
            .put_link(&TopologyLink {
                compute_uuid: compute_uuid.to_string(),
                network_uuid: config.uuid.clone(),
            })
            .await?;
        self.wrappers.insert(config.uuid.clone(), wrapper);
        Ok(())
    }

    /// Attach a compute VIM to a WIM, reachable at `vim_address`
    pub async fn attach_vim(&self, wim_uuid: &str, vim_uuid: &str, vim_address: &str) -> BayResult<()> {
        let _guards = self.lock_pair(wim_uuid, vim_uuid).await;

        let wim = self
            .repository
            .get_configuration(wim_uuid)
            .await?
            .ok_or_else(|| BayError::NotFound(wim_uuid.to_string()))?;
        check_kind(&wim, WrapperKind::Wim)?;
        let vim = self
            .repository
            .get_configuration(vim_uuid)
            .await?
            .ok_or_else(|| BayError::NotFound(vim_uuid.to_string()))?;
        check_kind(&vim, WrapperKind::Compute)?;

        if let Some(existing) = self.repository.attachment_for_vim(vim_uuid).await? {
            if existing.wim_uuid != wim_uuid {
                return Err(BayError::AlreadyAttached {
                    vim_uuid: vim_uuid.to_string(),
                    wim_uuid: existing.wim_uuid,
                });
            }
        }

        self.repository
            .put_attachment(&WimAttachment {
                vim_uuid: vim_uuid.to_string(),
                vim_address: vim_address.to_string(),
                wim_uuid: wim_uuid.to_string(),
            })
            .await?;
        info!(wim_uuid, vim_uuid, vim_address, "VIM attached to WIM");
        Ok(())
    }

    pub async fn wim_for_vim(&self, vim_uuid: &str) -> BayResult<Option<WimAttachment>> {
        Ok(self.repository.attachment_for_vim(vim_uuid).await?)
    }

    /// Remove a wrapper with its links and attachments. Returns whether it existed.
    pub async fn remove(&self, uuid: &str) -> BayResult<bool> {
        let _guard = self.lock(uuid).await;

        self.repository.delete_links_for(uuid).await?;
        self.repository.delete_attachments_for(uuid).await?;
        let existed = self.repository.delete_configuration(uuid).await?;
        self.wrappers.remove(uuid);

        if existed {
            info!(uuid, "Wrapper removed");
        } else {
            debug!(uuid, "Remove of unknown wrapper ignored");
        }
        Ok(existed)
    }

    // ---------------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------------

    /// Live wrapper for `uuid`, instantiated from the repository on a cache miss
    pub async fn get_wrapper(&self, uuid: &str) -> BayResult<Wrapper> {
        if let Some(wrapper) = self.wrappers.get(uuid) {
            return Ok(wrapper.clone());
        }

        // Cold loads serialise with remove so a stale record is never cached
        let _guard = self.lock(uuid).await;
        if let Some(wrapper) = self.wrappers.get(uuid) {
            return Ok(wrapper.clone());
        }

        let config = self
            .repository
            .get_configuration(uuid)
            .await?
            .ok_or_else(|| BayError::NotFound(uuid.to_string()))?;
        let wrapper = self.factory.create(&config)?;
        debug!(uuid, kind = %config.kind, "Wrapper instantiated from repository");

        self.wrappers.insert(uuid.to_string(), wrapper.clone());
        Ok(wrapper)
    }

    pub async fn get_compute(&self, uuid: &str) -> BayResult<Arc<dyn ComputeWrapper>> {
        let wrapper = self.get_wrapper(uuid).await?;
        wrapper.as_compute().ok_or_else(|| wrong_kind(&wrapper, WrapperKind::Compute))
    }

    pub async fn get_network(&self, uuid: &str) -> BayResult<Arc<dyn NetworkWrapper>> {
        let wrapper = self.get_wrapper(uuid).await?;
        wrapper.as_network().ok_or_else(|| wrong_kind(&wrapper, WrapperKind::Network))
    }

    pub async fn get_wim(&self, uuid: &str) -> BayResult<Arc<dyn WimWrapper>> {
        let wrapper = self.get_wrapper(uuid).await?;
        wrapper.as_wim().ok_or_else(|| wrong_kind(&wrapper, WrapperKind::Wim))
    }

    pub async fn get_configuration(&self, uuid: &str) -> BayResult<Option<WrapperConfiguration>> {
        Ok(self.repository.get_configuration(uuid).await?)
    }

    /// Network VIM linked to `compute_uuid`, if any
    pub async fn resolve_network_for_compute(&self, compute_uuid: &str) -> BayResult<Option<String>> {
        Ok(self
            .repository
            .link_for_compute(compute_uuid)
            .await?
            .map(|link| link.network_uuid))
    }

    pub async fn list(&self, kind: WrapperKind) -> BayResult<Vec<WrapperConfiguration>> {
        let mut configs = self.repository.list_configurations(kind).await?;
        configs.sort_by(|a, b| a.uuid.cmp(&b.uuid));
        Ok(configs)
    }

    pub async fn list_compute(&self) -> BayResult<Vec<WrapperConfiguration>> {
        self.list(WrapperKind::Compute).await
    }

    pub async fn list_network(&self) -> BayResult<Vec<WrapperConfiguration>> {
        self.list(WrapperKind::Network).await
    }

    pub async fn list_wim(&self) -> BayResult<Vec<WrapperConfiguration>> {
        self.list(WrapperKind::Wim).await
    }

    // ---------------------------------------------------------------------
    // Instance records
    // ---------------------------------------------------------------------

    pub async fn put_service_instance(&self, record: ServiceInstanceRecord) -> BayResult<()> {
        let _guard = self.lock(&record.instance_uuid).await;
        self.repository.put_service_instance(&record).await?;
        debug!(instance = %record.instance_uuid, vim = %record.vim_uuid, "Service instance recorded");
        Ok(())
    }

    pub async fn service_instance(
        &self,
        instance_uuid: &str,
        vim_uuid: &str,
    ) -> BayResult<Option<ServiceInstanceRecord>> {
        Ok(self
            .repository
            .service_instances(instance_uuid)
            .await?
            .into_iter()
            .find(|r| r.vim_uuid == vim_uuid))
    }

    /// Compute VIMs hosting part of the service, sorted
    pub async fn compute_vims_for_instance(&self, instance_uuid: &str) -> BayResult<Vec<String>> {
        let mut vims: Vec<String> = self
            .repository
            .service_instances(instance_uuid)
            .await?
            .into_iter()
            .map(|r| r.vim_uuid)
            .collect();
        vims.sort();
        vims.dedup();
        Ok(vims)
    }

    pub async fn put_function_instance(&self, record: PlacementRecord) -> BayResult<()> {
        self.put_placement(PlacementKind::Function, record).await
    }

    pub async fn function_instance(&self, function_uuid: &str) -> BayResult<Option<PlacementRecord>> {
        Ok(self
            .repository
            .get_placement(PlacementKind::Function, function_uuid)
            .await?)
    }

    pub async fn put_cloud_service_instance(&self, record: PlacementRecord) -> BayResult<()> {
        self.put_placement(PlacementKind::CloudService, record).await
    }

    pub async fn cloud_service_instance(&self, instance_uuid: &str) -> BayResult<Option<PlacementRecord>> {
        Ok(self
            .repository
            .get_placement(PlacementKind::CloudService, instance_uuid)
            .await?)
    }

    async fn put_placement(&self, kind: PlacementKind, record: PlacementRecord) -> BayResult<()> {
        let _guard = self.lock(&record.instance_uuid).await;
        self.repository.put_placement(kind, &record).await?;
        debug!(?kind, %record, "Placement recorded");
        Ok(())
    }

    /// Forget every record owned by a service instance
    pub async fn remove_service_instance(&self, instance_uuid: &str) -> BayResult<()> {
        let _guard = self.lock(instance_uuid).await;
        self.repository.delete_service(instance_uuid).await?;
        debug!(instance = instance_uuid, "Service instance records removed");
        Ok(())
    }
}

/// Held per-uuid lock. The map entry goes away with the last holder.
struct UuidGuard<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UuidGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters keep their own clone, so a count of one means only the map holds it
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

fn check_kind(config: &WrapperConfiguration, expected: WrapperKind) -> BayResult<()> {
    if config.kind != expected {
        return Err(BayError::WrongKind {
            uuid: config.uuid.clone(),
            expected,
            actual: config.kind,
        });
    }
    Ok(())
}

fn wrong_kind(wrapper: &Wrapper, expected: WrapperKind) -> BayError {
    BayError::WrongKind {
        uuid: wrapper.uuid().to_string(),
        expected,
        actual: wrapper.kind(),
    }
}

fn respond(kind: &str, uuid: &str, outcome: BayResult<()>) -> ApiResponse {
    match outcome {
        Ok(()) => {
            info!(kind, uuid, "Wrapper registered");
            ApiResponse::completed().with_uuid(uuid)
        }
        Err(e) => {
            warn!(kind, uuid, error = %e, "Wrapper registration failed");
            ApiResponse::error(e.to_string())
        }
    }
}
