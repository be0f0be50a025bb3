//! Startup seeding of the default site.
//!
//! When `bootstrap.default_site` is configured, the site is created through
//! the lifecycle manager unless a site already holds its hostname. Running
//! the bootstrap repeatedly is safe.

use sitedir_core::Site;
use tracing::info;

use crate::config::BootstrapConfig;
use crate::lifecycle::{LifecycleError, SiteLifecycle};

/// Creates the configured default site if it is missing.
///
/// # Errors
///
/// Returns an error if the repository cannot be listed or the create fails.
pub async fn bootstrap_default_site(
    lifecycle: &SiteLifecycle,
    config: &BootstrapConfig,
) -> Result<BootstrapStats, LifecycleError> {
    let mut stats = BootstrapStats::default();

    let Some(default_site) = &config.default_site else {
        return Ok(stats);
    };

    let existing = lifecycle.repository().list_all_sites().await?;
    if let Some(site) = existing
        .iter()
        .find(|s| s.hostname.as_str() == default_site.hostname)
    {
        info!(
            hostname = %site.hostname,
            site_id = %site.id,
            "Default site already present, skipping"
        );
        stats.existing = Some(site.clone());
        return Ok(stats);
    }

    let site = lifecycle
        .create_site(&default_site.hostname, default_site.config.clone())
        .await?;
    info!(hostname = %site.hostname, site_id = %site.id, "Default site bootstrapped");
    stats.created = Some(site);

    Ok(stats)
}

/// Outcome of the bootstrap step.
#[derive(Debug, Default)]
pub struct BootstrapStats {
    /// Site created by this run
    pub created: Option<Site>,
    /// Site that already held the hostname
    pub existing: Option<Site>,
}

impl BootstrapStats {
    /// Returns the number of sites created.
    pub fn total(&self) -> usize {
        usize::from(self.created.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultSiteConfig;
    use serde_json::json;
    use sitedir_db_memory::InMemorySiteRepository;
    use std::sync::Arc;

    fn wildcard_config() -> BootstrapConfig {
        BootstrapConfig {
            default_site: Some(DefaultSiteConfig {
                hostname: "*".into(),
                config: Some(json!({"title": "Fallback"})),
            }),
        }
    }

    #[tokio::test]
    async fn test_nothing_configured() {
        let lifecycle = SiteLifecycle::new(Arc::new(InMemorySiteRepository::new()));
        let stats = bootstrap_default_site(&lifecycle, &BootstrapConfig::default())
            .await
            .unwrap();
        assert_eq!(stats.total(), 0);
        assert!(stats.existing.is_none());
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let repo = Arc::new(InMemorySiteRepository::new());
        let lifecycle = SiteLifecycle::new(repo.clone());

        let first = bootstrap_default_site(&lifecycle, &wildcard_config())
            .await
            .unwrap();
        assert_eq!(first.total(), 1);
        let created = first.created.unwrap();
        assert!(created.is_wildcard());
        assert_eq!(created.config.title, "Fallback");

        let second = bootstrap_default_site(&lifecycle, &wildcard_config())
            .await
            .unwrap();
        assert_eq!(second.total(), 0);
        assert_eq!(second.existing.unwrap().id, created.id);
        assert_eq!(repo.site_count(), 1);
    }
}
