//! Site lifecycle: create, update and delete against the repository.
//!
//! None of these operations touch the [`SiteDirectory`](crate::directory::SiteDirectory).
//! A freshly created or edited site becomes resolvable only after the next
//! reload, which the caller triggers (or the opt-in reload service does on
//! its behalf after receiving the [`SiteChange`] published here).

use std::sync::Arc;

use serde_json::Value;
use sitedir_core::{CoreError, Hostname, Site, SiteConfig, SiteId, SitePatch, StorageProfile};
use sitedir_storage::{DynSiteRepository, NewSite, StorageError};
use tracing::{debug, error, info, instrument, warn};

use crate::reload::{SiteChange, SiteChangeNotifier};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Rejected input: blank hostname or an ill-typed configuration document.
    #[error("Validation failed: {0}")]
    Validation(#[from] CoreError),

    /// The repository was unreachable or refused the write.
    #[error(transparent)]
    Repository(#[from] StorageError),

    /// The storage profile is gone but the site record survived.
    #[error("Site {site_id} lost its storage profile but could not be deleted: {source}")]
    OrphanRisk {
        site_id: SiteId,
        #[source]
        source: StorageError,
    },
}

impl LifecycleError {
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    #[must_use]
    pub fn is_orphan_risk(&self) -> bool {
        matches!(self, Self::OrphanRisk { .. })
    }
}

/// Writes sites and their storage profiles.
#[derive(Clone)]
pub struct SiteLifecycle {
    repository: DynSiteRepository,
    notifier: Option<Arc<SiteChangeNotifier>>,
}

impl SiteLifecycle {
    pub fn new(repository: DynSiteRepository) -> Self {
        Self {
            repository,
            notifier: None,
        }
    }

    /// Publish a [`SiteChange`] after every successful write.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<SiteChangeNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Creates an enabled site with its default storage profile.
    ///
    /// `config` is deep-merged over the default site configuration: leaves
    /// present in `config` win, every other leaf takes its default. `None`
    /// and `null` both mean "all defaults".
    ///
    /// If the profile cannot be stored, the new site record is removed again
    /// and the profile error is returned.
    ///
    /// # Errors
    ///
    /// - `LifecycleError::Validation` for a blank hostname or a config whose
    ///   leaves have the wrong type.
    /// - `LifecycleError::Repository` if either insert fails.
    #[instrument(skip(self, config))]
    pub async fn create_site(
        &self,
        hostname: &str,
        config: Option<Value>,
    ) -> Result<Site, LifecycleError> {
        let hostname = Hostname::new(hostname)?;
        let config = SiteConfig::from_overrides(config)?;

        let site = self
            .repository
            .insert_site(NewSite::new(hostname, config))
            .await?;

        let profile = StorageProfile::default_for(site.id.clone());
        if let Err(err) = self.repository.insert_storage_profile(profile).await {
            warn!(site_id = %site.id, error = %err, "Storage profile insert failed, removing site");
            self.compensate_create(&site.id).await;
            return Err(err.into());
        }

        info!(site_id = %site.id, hostname = %site.hostname, "Site created");
        self.notify(SiteChange::Created {
            site_id: site.id.clone(),
            hostname: site.hostname.clone(),
        });

        Ok(site)
    }

    async fn compensate_create(&self, site_id: &SiteId) {
        match self.repository.delete_site(site_id).await {
            Ok(_) => debug!(site_id = %site_id, "Removed site after failed profile insert"),
            Err(err) => error!(
                site_id = %site_id,
                error = %err,
                "Could not remove site after failed profile insert; site has no storage profile"
            ),
        }
    }

    /// Applies a partial patch. Returns the number of affected sites.
    ///
    /// An empty patch is a no-op and returns 0 without a repository call.
    #[instrument(skip(self, patch))]
    pub async fn update_site(&self, id: &SiteId, patch: SitePatch) -> Result<u64, LifecycleError> {
        if patch.is_empty() {
            debug!(site_id = %id, "Empty site patch ignored");
            return Ok(0);
        }

        let affected = self.repository.patch_site(id, &patch).await?;
        if affected > 0 {
            info!(site_id = %id, affected, "Site updated");
            self.notify(SiteChange::Updated {
                site_id: id.clone(),
            });
        }

        Ok(affected)
    }

    /// Deletes the storage profile of `id`, then the site itself.
    ///
    /// Returns the number of deleted site records.
    ///
    /// # Errors
    ///
    /// - `LifecycleError::Repository` if the profile delete fails (nothing
    ///   was removed) or the site delete fails when there was no profile.
    /// - `LifecycleError::OrphanRisk` if a profile was removed but the site
    ///   delete then failed.
    #[instrument(skip(self))]
    pub async fn delete_site(&self, id: &SiteId) -> Result<u64, LifecycleError> {
        let profiles = self.repository.delete_storage_profile_by_site_id(id).await?;

        let affected = match self.repository.delete_site(id).await {
            Ok(affected) => affected,
            Err(source) if profiles > 0 => {
                error!(
                    site_id = %id,
                    error = %source,
                    "Storage profile deleted but site delete failed"
                );
                return Err(LifecycleError::OrphanRisk {
                    site_id: id.clone(),
                    source,
                });
            }
            Err(source) => return Err(source.into()),
        };

        if affected > 0 {
            info!(site_id = %id, profiles, "Site deleted");
            self.notify(SiteChange::Deleted {
                site_id: id.clone(),
            });
        }

        Ok(affected)
    }

    fn notify(&self, change: SiteChange) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(change);
        }
    }

    #[must_use]
    pub fn repository(&self) -> &DynSiteRepository {
        &self.repository
    }
}

impl std::fmt::Debug for SiteLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteLifecycle")
            .field("backend", &self.repository.backend_name())
            .field("notifier", &self.notifier.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sitedir_db_memory::InMemorySiteRepository;
    use sitedir_storage::SiteRepository;

    fn lifecycle() -> (SiteLifecycle, Arc<InMemorySiteRepository>) {
        let repo = Arc::new(InMemorySiteRepository::new());
        (SiteLifecycle::new(repo.clone()), repo)
    }

    #[tokio::test]
    async fn test_create_applies_defaults_and_profile() {
        let (lifecycle, repo) = lifecycle();

        let site = lifecycle
            .create_site("acme.example", Some(json!({"title": "Acme", "theme": {"dark": true}})))
            .await
            .unwrap();

        assert!(site.is_enabled);
        assert_eq!(site.config.title, "Acme");
        assert!(site.config.theme.dark);
        assert_eq!(site.config.theme.color_primary, "#1976d2");
        assert_eq!(site.config.locale, "en");

        let profile = repo.get_storage_profile(&site.id).await.unwrap().unwrap();
        assert_eq!(profile, StorageProfile::default_for(site.id.clone()));
    }

    #[tokio::test]
    async fn test_create_requires_hostname() {
        let (lifecycle, repo) = lifecycle();

        let err = lifecycle.create_site("   ", None).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(repo.site_count(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_ill_typed_config() {
        let (lifecycle, repo) = lifecycle();

        let err = lifecycle
            .create_site("acme.example", Some(json!({"theme": {"dark": "yes"}})))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(repo.site_count(), 0);
    }

    #[tokio::test]
    async fn test_create_duplicate_hostname_is_repository_error() {
        let (lifecycle, _repo) = lifecycle();
        lifecycle.create_site("acme.example", None).await.unwrap();

        let err = lifecycle.create_site("acme.example", None).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Repository(e) if e.is_already_exists()));
    }

    #[tokio::test]
    async fn test_update_and_delete_counts() {
        let (lifecycle, repo) = lifecycle();
        let site = lifecycle.create_site("acme.example", None).await.unwrap();

        let patch = SitePatch::new().with_enabled(false);
        assert_eq!(lifecycle.update_site(&site.id, patch).await.unwrap(), 1);
        assert_eq!(lifecycle.update_site(&site.id, SitePatch::new()).await.unwrap(), 0);

        assert_eq!(lifecycle.delete_site(&site.id).await.unwrap(), 1);
        assert_eq!(repo.site_count(), 0);
        assert_eq!(repo.profile_count(), 0);

        assert_eq!(lifecycle.delete_site(&site.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_writes_publish_changes() {
        let repo = Arc::new(InMemorySiteRepository::new());
        let notifier = Arc::new(SiteChangeNotifier::new(16));
        let mut receiver = notifier.subscribe();
        let lifecycle = SiteLifecycle::new(repo).with_notifier(notifier);

        let site = lifecycle.create_site("acme.example", None).await.unwrap();
        lifecycle
            .update_site(&site.id, SitePatch::new().with_enabled(false))
            .await
            .unwrap();
        lifecycle.delete_site(&site.id).await.unwrap();

        assert!(matches!(receiver.recv().await.unwrap(), SiteChange::Created { .. }));
        assert_eq!(
            receiver.recv().await.unwrap(),
            SiteChange::Updated {
                site_id: site.id.clone()
            }
        );
        assert_eq!(
            receiver.recv().await.unwrap(),
            SiteChange::Deleted { site_id: site.id }
        );
    }
}
