//! Repository trait for durable site and storage profile records.

use async_trait::async_trait;
use sitedir_core::{Site, SiteId, SitePatch, StorageProfile};

use crate::error::StorageError;
use crate::types::NewSite;

/// Durable store for sites and their storage profiles.
///
/// Implementations must be thread-safe (`Send + Sync`) and must keep
/// hostnames unique across live sites. Mutating methods report the number
/// of affected rows; zero means "no such record" and is not an error.
///
/// # Example
///
/// ```ignore
/// use sitedir_storage::{SiteRepository, StorageError};
///
/// async fn count_sites(repo: &dyn SiteRepository) -> Result<usize, StorageError> {
///     Ok(repo.list_all_sites().await?.len())
/// }
/// ```
#[async_trait]
pub trait SiteRepository: Send + Sync {
    // ==================== Sites ====================

    /// Returns every site, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues.
    async fn list_all_sites(&self) -> Result<Vec<Site>, StorageError>;

    /// Reads a single site by id.
    ///
    /// Returns `None` if the site does not exist.
    async fn get_site(&self, id: &SiteId) -> Result<Option<Site>, StorageError>;

    /// Persists a new site and returns the stored record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if the hostname or id is taken.
    async fn insert_site(&self, site: NewSite) -> Result<Site, StorageError>;

    /// Applies a partial patch to a site.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if the patch would move the site
    /// onto a hostname owned by another site.
    async fn patch_site(&self, id: &SiteId, patch: &SitePatch) -> Result<u64, StorageError>;

    /// Deletes a site record. The caller removes its storage profile first.
    async fn delete_site(&self, id: &SiteId) -> Result<u64, StorageError>;

    // ==================== Storage Profiles ====================

    /// Persists the storage profile of an existing site.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the owning site does not exist.
    async fn insert_storage_profile(
        &self,
        profile: StorageProfile,
    ) -> Result<StorageProfile, StorageError>;

    /// Reads the storage profile of a site.
    async fn get_storage_profile(
        &self,
        site_id: &SiteId,
    ) -> Result<Option<StorageProfile>, StorageError>;

    /// Deletes every storage profile belonging to a site.
    async fn delete_storage_profile_by_site_id(
        &self,
        site_id: &SiteId,
    ) -> Result<u64, StorageError>;

    // ==================== Metadata ====================

    /// Returns the name of this backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
