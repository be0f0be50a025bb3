//! `SiteRepository` implementation for `InMemorySiteRepository`.

use async_trait::async_trait;
use sitedir_core::{Site, SiteId, SitePatch, StorageProfile};
use sitedir_storage::{NewSite, SiteRepository, StorageError};

use crate::storage::InMemorySiteRepository;

#[async_trait]
impl SiteRepository for InMemorySiteRepository {
    async fn list_all_sites(&self) -> Result<Vec<Site>, StorageError> {
        Ok(self.list_sorted())
    }

    async fn get_site(&self, id: &SiteId) -> Result<Option<Site>, StorageError> {
        Ok(self.read_site(id))
    }

    async fn insert_site(&self, site: NewSite) -> Result<Site, StorageError> {
        let _guard = self.write_lock.lock().await;
        self.insert_locked(site)
    }

    async fn patch_site(&self, id: &SiteId, patch: &SitePatch) -> Result<u64, StorageError> {
        let _guard = self.write_lock.lock().await;
        self.patch_locked(id, patch)
    }

    async fn delete_site(&self, id: &SiteId) -> Result<u64, StorageError> {
        let _guard = self.write_lock.lock().await;
        self.delete_locked(id)
    }

    async fn insert_storage_profile(
        &self,
        profile: StorageProfile,
    ) -> Result<StorageProfile, StorageError> {
        let _guard = self.write_lock.lock().await;
        self.insert_profile_locked(profile)
    }

    async fn get_storage_profile(
        &self,
        site_id: &SiteId,
    ) -> Result<Option<StorageProfile>, StorageError> {
        Ok(self.read_profile(site_id))
    }

    async fn delete_storage_profile_by_site_id(
        &self,
        site_id: &SiteId,
    ) -> Result<u64, StorageError> {
        let _guard = self.write_lock.lock().await;
        Ok(self.delete_profile_locked(site_id))
    }

    fn backend_name(&self) -> &'static str {
        "in-memory-papaya"
    }
}
