//! In-memory repository

use crate::repository::{
    PlacementKind, PlacementRecord, RepositoryResult, RepositoryState, ServiceInstanceRecord,
    TopologyLink, VimRepository, WimAttachment,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use types::{WrapperConfiguration, WrapperKind};

#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: RwLock<RepositoryState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: RepositoryState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Copy of the current content
    pub fn snapshot(&self) -> RepositoryState {
        self.state.read().clone()
    }

    /// Swap in a new content wholesale
    pub(crate) fn replace(&self, state: RepositoryState) {
        *self.state.write() = state;
    }
}

#[async_trait]
impl VimRepository for MemoryRepository {
    async fn put_configuration(&self, config: &WrapperConfiguration) -> RepositoryResult<()> {
        self.state.write().put_configuration(config);
        Ok(())
    }

    async fn get_configuration(&self, uuid: &str) -> RepositoryResult<Option<WrapperConfiguration>> {
        Ok(self
            .state
            .read()
            .configurations
            .iter()
            .find(|c| c.uuid == uuid)
            .cloned())
    }

    async fn delete_configuration(&self, uuid: &str) -> RepositoryResult<bool> {
        Ok(self.state.write().delete_configuration(uuid))
    }

    async fn list_configurations(&self, kind: WrapperKind) -> RepositoryResult<Vec<WrapperConfiguration>> {
        Ok(self
            .state
            .read()
            .configurations
            .iter()
            .filter(|c| c.kind == kind)
            .cloned()
            .collect())
    }

    async fn put_link(&self, link: &TopologyLink) -> RepositoryResult<()> {
        self.state.write().put_link(link);
        Ok(())
    }

    async fn link_for_compute(&self, compute_uuid: &str) -> RepositoryResult<Option<TopologyLink>> {
        Ok(self
            .state
            .read()
            .links
            .iter()
            .find(|l| l.compute_uuid == compute_uuid)
            .cloned())
    }

    async fn delete_links_for(&self, uuid: &str) -> RepositoryResult<()> {
        self.state.write().delete_links_for(uuid);
        Ok(())
    }

    async fn put_attachment(&self, attachment: &WimAttachment) -> RepositoryResult<()> {
        self.state.write().put_attachment(attachment);
        Ok(())
    }

    async fn attachment_for_vim(&self, vim_uuid: &str) -> RepositoryResult<Option<WimAttachment>> {
        Ok(self
            .state
            .read()
            .attachments
            .iter()
            .find(|a| a.vim_uuid == vim_uuid)
            .cloned())
    }

    async fn delete_attachments_for(&self, uuid: &str) -> RepositoryResult<()> {
        self.state.write().delete_attachments_for(uuid);
        Ok(())
    }

    async fn put_service_instance(&self, record: &ServiceInstanceRecord) -> RepositoryResult<()> {
        self.state.write().put_service_instance(record);
        Ok(())
    }

    async fn service_instances(&self, instance_uuid: &str) -> RepositoryResult<Vec<ServiceInstanceRecord>> {
        Ok(self
            .state
            .read()
            .services
            .iter()
            .filter(|s| s.instance_uuid == instance_uuid)
            .cloned()
            .collect())
    }

    async fn put_placement(&self, kind: PlacementKind, record: &PlacementRecord) -> RepositoryResult<()> {
        self.state.write().put_placement(kind, record);
        Ok(())
    }

    async fn get_placement(
        &self,
        kind: PlacementKind,
        instance_uuid: &str,
    ) -> RepositoryResult<Option<PlacementRecord>> {
        Ok(self
            .state
            .read()
            .placements(kind)
            .iter()
            .find(|p| p.instance_uuid == instance_uuid)
            .cloned())
    }

    async fn delete_service(&self, instance_uuid: &str) -> RepositoryResult<()> {
        self.state.write().delete_service(instance_uuid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(instance: &str, vim: &str) -> ServiceInstanceRecord {
        ServiceInstanceRecord {
            instance_uuid: instance.into(),
            vim_uuid: vim.into(),
            vim_instance_id: format!("{instance}-{vim}"),
            vim_instance_name: format!("{instance}-{vim}"),
        }
    }

    #[tokio::test]
    async fn test_links_are_removed_from_both_sides() {
        let repo = MemoryRepository::new();
        repo.put_link(&TopologyLink {
            compute_uuid: "c1".into(),
            network_uuid: "n1".into(),
        })
        .await
        .unwrap();
        repo.put_link(&TopologyLink {
            compute_uuid: "c2".into(),
            network_uuid: "n2".into(),
        })
        .await
        .unwrap();

        repo.delete_links_for("n1").await.unwrap();
        assert!(repo.link_for_compute("c1").await.unwrap().is_none());

        repo.delete_links_for("c2").await.unwrap();
        assert!(repo.snapshot().links.is_empty());
    }

    #[tokio::test]
    async fn test_delete_service_drops_owned_placements() {
        let repo = MemoryRepository::new();
        repo.put_service_instance(&record("svc-1", "vim-1")).await.unwrap();
        repo.put_service_instance(&record("svc-1", "vim-2")).await.unwrap();
        repo.put_service_instance(&record("svc-2", "vim-1")).await.unwrap();
        repo.put_placement(
            PlacementKind::Function,
            &PlacementRecord {
                instance_uuid: "fn-1".into(),
                service_instance_uuid: "svc-1".into(),
                vim_uuid: "vim-1".into(),
            },
        )
        .await
        .unwrap();

        assert_eq!(repo.service_instances("svc-1").await.unwrap().len(), 2);
        repo.delete_service("svc-1").await.unwrap();

        assert!(repo.service_instances("svc-1").await.unwrap().is_empty());
        assert_eq!(repo.service_instances("svc-2").await.unwrap().len(), 1);
        assert!(repo
            .get_placement(PlacementKind::Function, "fn-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_service_record_is_unique_per_vim() {
        let repo = MemoryRepository::new();
        repo.put_service_instance(&record("svc-1", "vim-1")).await.unwrap();
        repo.put_service_instance(&record("svc-1", "vim-1")).await.unwrap();
        assert_eq!(repo.snapshot().services.len(), 1);
    }
}
