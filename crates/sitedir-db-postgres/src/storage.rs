//! `SiteRepository` implementation backed by PostgreSQL.

use async_trait::async_trait;
use sqlx_postgres::PgPool;
use tracing::{debug, instrument};

use sitedir_core::{Site, SiteId, SitePatch, StorageProfile};
use sitedir_storage::{NewSite, SiteRepository, StorageError};

use crate::config::PostgresConfig;
use crate::queries::{profiles, sites};
use crate::{migrations, pool};

/// PostgreSQL site repository.
///
/// Hostname uniqueness and the profile-to-site reference are enforced by
/// table constraints; violations surface as `AlreadyExists`, `NotFound` or
/// `InvalidRecord`.
#[derive(Debug, Clone)]
pub struct PostgresSiteRepository {
    pool: PgPool,
}

impl PostgresSiteRepository {
    /// Connects using `config` and runs migrations when enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created or a migration fails.
    pub async fn new(config: PostgresConfig) -> Result<Self, StorageError> {
        let pool = pool::create_pool(&config).await?;
        pool::test_connection(&pool).await?;

        if config.run_migrations {
            migrations::run(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Wraps an existing pool. Migrations are not run.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SiteRepository for PostgresSiteRepository {
    #[instrument(skip(self))]
    async fn list_all_sites(&self) -> Result<Vec<Site>, StorageError> {
        let sites = sites::list_all(&self.pool).await?;
        debug!(count = sites.len(), "Listed sites");
        Ok(sites)
    }

    async fn get_site(&self, id: &SiteId) -> Result<Option<Site>, StorageError> {
        sites::get(&self.pool, id).await
    }

    #[instrument(skip(self, site), fields(hostname = %site.hostname))]
    async fn insert_site(&self, site: NewSite) -> Result<Site, StorageError> {
        sites::insert(&self.pool, site).await
    }

    #[instrument(skip(self, patch))]
    async fn patch_site(&self, id: &SiteId, patch: &SitePatch) -> Result<u64, StorageError> {
        sites::patch(&self.pool, id, patch).await
    }

    #[instrument(skip(self))]
    async fn delete_site(&self, id: &SiteId) -> Result<u64, StorageError> {
        sites::delete(&self.pool, id).await
    }

    #[instrument(skip(self, profile), fields(site_id = %profile.site_id))]
    async fn insert_storage_profile(
        &self,
        profile: StorageProfile,
    ) -> Result<StorageProfile, StorageError> {
        profiles::insert(&self.pool, profile).await
    }

    async fn get_storage_profile(
        &self,
        site_id: &SiteId,
    ) -> Result<Option<StorageProfile>, StorageError> {
        profiles::get_by_site_id(&self.pool, site_id).await
    }

    #[instrument(skip(self))]
    async fn delete_storage_profile_by_site_id(
        &self,
        site_id: &SiteId,
    ) -> Result<u64, StorageError> {
        profiles::delete_by_site_id(&self.pool, site_id).await
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
