//! JSON-file repository
//!
//! Keeps the whole repository in memory and rewrites a JSON snapshot after
//! every mutation. The snapshot is written to a sibling temp file and renamed
//! into place, so a crash leaves either the old or the new content. A change
//! becomes visible to readers only once its snapshot is on disk.

use crate::memory::MemoryRepository;
use crate::repository::{
    PlacementKind, PlacementRecord, RepositoryError, RepositoryResult, RepositoryState,
    ServiceInstanceRecord, TopologyLink, VimRepository, WimAttachment,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};
use types::{WrapperConfiguration, WrapperKind};

#[derive(Debug)]
pub struct FileRepository {
    inner: MemoryRepository,
    path: PathBuf,
    persist_lock: Mutex<()>,
}

impl FileRepository {
    /// Load the snapshot at `path`, starting empty when the file does not exist
    pub async fn open(path: impl AsRef<Path>) -> RepositoryResult<Self> {
        let path = path.as_ref().to_path_buf();
        let io_error = |source| RepositoryError::Io {
            path: path.clone(),
            source,
        };

        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<RepositoryState>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
                }
                RepositoryState::default()
            }
            Err(e) => return Err(io_error(e)),
        };

        info!(
            path = %path.display(),
            configurations = state.configurations.len(),
            links = state.links.len(),
            "Opened VIM repository"
        );
        Ok(Self {
            inner: MemoryRepository::from_state(state),
            path,
            persist_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `mutate` to a copy of the content, write it, and only then make
    /// it visible. A failed write leaves the repository unchanged.
    async fn commit<T>(&self, mutate: impl FnOnce(&mut RepositoryState) -> T) -> RepositoryResult<T> {
        let _guard = self.persist_lock.lock().await;
        let current = self.inner.snapshot();
        let mut staged = current.clone();
        let outcome = mutate(&mut staged);

        if staged != current {
            self.write_snapshot(&staged).await?;
            self.inner.replace(staged);
        }
        Ok(outcome)
    }

    async fn write_snapshot(&self, state: &RepositoryState) -> RepositoryResult<()> {
        let body = serde_json::to_vec_pretty(state)?;

        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        tokio::fs::write(&temp, &body)
            .await
            .map_err(|source| RepositoryError::Io {
                path: temp.clone(),
                source,
            })?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|source| RepositoryError::Io {
                path: self.path.clone(),
                source,
            })?;

        debug!(path = %self.path.display(), bytes = body.len(), "Repository snapshot written");
        Ok(())
    }
}

#[async_trait]
impl VimRepository for FileRepository {
    async fn put_configuration(&self, config: &WrapperConfiguration) -> RepositoryResult<()> {
        self.commit(|state| state.put_configuration(config)).await
    }

    async fn get_configuration(&self, uuid: &str) -> RepositoryResult<Option<WrapperConfiguration>> {
        self.inner.get_configuration(uuid).await
    }

    async fn delete_configuration(&self, uuid: &str) -> RepositoryResult<bool> {
        self.commit(|state| state.delete_configuration(uuid)).await
    }

    async fn list_configurations(&self, kind: WrapperKind) -> RepositoryResult<Vec<WrapperConfiguration>> {
        self.inner.list_configurations(kind).await
    }

    async fn put_link(&self, link: &TopologyLink) -> RepositoryResult<()> {
        self.commit(|state| state.put_link(link)).await
    }

    async fn link_for_compute(&self, compute_uuid: &str) -> RepositoryResult<Option<TopologyLink>> {
        self.inner.link_for_compute(compute_uuid).await
    }

    async fn delete_links_for(&self, uuid: &str) -> RepositoryResult<()> {
        self.commit(|state| state.delete_links_for(uuid)).await
    }

    async fn put_attachment(&self, attachment: &WimAttachment) -> RepositoryResult<()> {
        self.commit(|state| state.put_attachment(attachment)).await
    }

    async fn attachment_for_vim(&self, vim_uuid: &str) -> RepositoryResult<Option<WimAttachment>> {
        self.inner.attachment_for_vim(vim_uuid).await
    }

    async fn delete_attachments_for(&self, uuid: &str) -> RepositoryResult<()> {
        self.commit(|state| state.delete_attachments_for(uuid)).await
    }

    async fn put_service_instance(&self, record: &ServiceInstanceRecord) -> RepositoryResult<()> {
        self.commit(|state| state.put_service_instance(record)).await
    }

    async fn service_instances(&self, instance_uuid: &str) -> RepositoryResult<Vec<ServiceInstanceRecord>> {
        self.inner.service_instances(instance_uuid).await
    }

    async fn put_placement(&self, kind: PlacementKind, record: &PlacementRecord) -> RepositoryResult<()> {
        self.commit(|state| state.put_placement(kind, record)).await
    }

    async fn get_placement(
        &self,
        kind: PlacementKind,
        instance_uuid: &str,
    ) -> RepositoryResult<Option<PlacementRecord>> {
        self.inner.get_placement(kind, instance_uuid).await
    }

    async fn delete_service(&self, instance_uuid: &str) -> RepositoryResult<()> {
        self.commit(|state| state.delete_service(instance_uuid)).await
    }
}
