//! Wiring: repository backend, directory, lifecycle and reload service.

use std::sync::Arc;

use sitedir_storage::{DynSiteRepository, StorageError};
use tokio::task::JoinHandle;

use crate::bootstrap::{BootstrapStats, bootstrap_default_site};
use crate::config::{AppConfig, StorageBackend};
use crate::directory::{DirectoryError, SiteDirectory};
use crate::lifecycle::{LifecycleError, SiteLifecycle};
use crate::reload::{ReloadConfig, SiteChangeNotifier, SiteReloadService};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("storage backend initialization failed: {0}")]
    Storage(#[from] StorageError),
    #[error("bootstrap failed: {0}")]
    Bootstrap(#[from] LifecycleError),
    #[error("initial directory load failed: {0}")]
    Directory(#[from] DirectoryError),
}

/// Creates the repository selected by `storage.backend`.
pub async fn create_repository(config: &AppConfig) -> Result<DynSiteRepository, StorageError> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory site repository; sites are lost on exit");
            Ok(sitedir_db_memory::create_repository())
        }
        StorageBackend::Postgres => {
            sitedir_db_postgres::create_repository(config.storage.postgres.to_backend_config())
                .await
        }
    }
}

#[derive(Default)]
pub struct AppBuilder {
    config: AppConfig,
    repository: Option<DynSiteRepository>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    /// Use this repository instead of the configured backend.
    pub fn with_repository(mut self, repository: DynSiteRepository) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Connects the repository, seeds the default site, performs the initial
    /// reload and starts the reload service when `directory.auto_reload`.
    pub async fn build(self) -> Result<SiteDirectoryApp, AppError> {
        let repository = match self.repository {
            Some(repository) => repository,
            None => create_repository(&self.config).await?,
        };

        let notifier = Arc::new(SiteChangeNotifier::default());
        let directory = Arc::new(SiteDirectory::new(repository.clone()));
        let lifecycle = SiteLifecycle::new(repository.clone()).with_notifier(notifier.clone());

        let bootstrap = bootstrap_default_site(&lifecycle, &self.config.bootstrap).await?;
        directory.reload().await?;

        let reload_service = if self.config.directory.auto_reload {
            let service = Arc::new(SiteReloadService::new(
                directory.clone(),
                notifier.clone(),
                ReloadConfig::from(&self.config.directory),
            ));
            let handle = service.clone().spawn();
            Some((service, handle))
        } else {
            None
        };

        tracing::info!(
            backend = repository.backend_name(),
            sites = directory.health().site_count,
            auto_reload = reload_service.is_some(),
            "Site directory ready"
        );

        Ok(SiteDirectoryApp {
            config: self.config,
            repository,
            directory,
            lifecycle,
            notifier,
            reload_service,
            bootstrap,
        })
    }
}

/// A running site directory with its collaborators.
pub struct SiteDirectoryApp {
    config: AppConfig,
    repository: DynSiteRepository,
    directory: Arc<SiteDirectory>,
    lifecycle: SiteLifecycle,
    notifier: Arc<SiteChangeNotifier>,
    reload_service: Option<(Arc<SiteReloadService>, JoinHandle<()>)>,
    bootstrap: BootstrapStats,
}

impl SiteDirectoryApp {
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn repository(&self) -> &DynSiteRepository {
        &self.repository
    }

    pub fn directory(&self) -> &Arc<SiteDirectory> {
        &self.directory
    }

    pub fn lifecycle(&self) -> &SiteLifecycle {
        &self.lifecycle
    }

    pub fn notifier(&self) -> &Arc<SiteChangeNotifier> {
        &self.notifier
    }

    pub fn reload_service(&self) -> Option<&Arc<SiteReloadService>> {
        self.reload_service.as_ref().map(|(service, _)| service)
    }

    pub fn bootstrap(&self) -> &BootstrapStats {
        &self.bootstrap
    }

    /// Stops the reload service, if running, and waits for it.
    pub async fn shutdown(self) {
        if let Some((service, handle)) = self.reload_service {
            service.shutdown();
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Reload service task ended abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultSiteConfig;

    #[tokio::test]
    async fn test_build_with_memory_backend() {
        let app = AppBuilder::new().build().await.unwrap();

        assert_eq!(app.repository().backend_name(), "in-memory-papaya");
        assert!(app.directory().is_loaded());
        assert!(app.reload_service().is_none());
        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_build_bootstraps_and_loads_default_site() {
        let mut cfg = AppConfig::default();
        cfg.bootstrap.default_site = Some(DefaultSiteConfig {
            hostname: "*".into(),
            config: None,
        });
        cfg.directory.auto_reload = true;

        let app = AppBuilder::new().with_config(cfg).build().await.unwrap();

        assert_eq!(app.bootstrap().total(), 1);
        let resolution = app.directory().lookup("anything.example").unwrap();
        assert!(resolution.is_wildcard());
        assert!(app.reload_service().is_some());
        app.shutdown().await;
    }
}
