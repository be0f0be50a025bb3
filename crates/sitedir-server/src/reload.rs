//! Site change notification and the opt-in directory reload service.
//!
//! The lifecycle manager never reloads the directory itself. It announces
//! each successful write on a [`SiteChangeNotifier`]; a [`SiteReloadService`],
//! when started, turns those announcements into debounced reloads.
//!
//! - [`SiteChange`] - Events representing site writes
//! - [`SiteChangeNotifier`] - Broadcast channel for change notifications
//! - [`SiteReloadService`] - Reloads with debouncing, periodic refresh and retry
//!
//! # Example
//!
//! ```ignore
//! let notifier = Arc::new(SiteChangeNotifier::new(64));
//! let service = Arc::new(SiteReloadService::new(
//!     directory.clone(),
//!     notifier.clone(),
//!     ReloadConfig::default(),
//! ));
//! let handle = service.clone().spawn();
//!
//! notifier.notify(SiteChange::Updated { site_id });
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use sitedir_core::{Hostname, SiteId};
use tokio::sync::{Notify, broadcast};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

use crate::config::DirectorySettings;
use crate::directory::{DirectoryError, SiteDirectory};

// =============================================================================
// Site Change Types
// =============================================================================

/// Site writes that make the directory stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteChange {
    Created { site_id: SiteId, hostname: Hostname },
    Updated { site_id: SiteId },
    Deleted { site_id: SiteId },
    /// Request to reload everything.
    BulkReload,
}

impl SiteChange {
    /// The site id if this is a single-site change.
    #[must_use]
    pub fn site_id(&self) -> Option<&SiteId> {
        match self {
            Self::Created { site_id, .. }
            | Self::Updated { site_id }
            | Self::Deleted { site_id } => Some(site_id),
            Self::BulkReload => None,
        }
    }

    #[must_use]
    pub fn is_bulk_reload(&self) -> bool {
        matches!(self, Self::BulkReload)
    }
}

// =============================================================================
// Site Change Notifier
// =============================================================================

/// Broadcast channel for site change notifications.
#[derive(Debug)]
pub struct SiteChangeNotifier {
    sender: broadcast::Sender<SiteChange>,
}

impl SiteChangeNotifier {
    /// Create a notifier buffering up to `capacity` pending changes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Notify all subscribers. Dropped silently if nobody listens.
    pub fn notify(&self, change: SiteChange) {
        let _ = self.sender.send(change);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SiteChange> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SiteChangeNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

// =============================================================================
// Reload Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct ReloadConfig {
    /// Bursts of changes within this window collapse into one reload.
    pub debounce_ms: u64,

    /// Periodic refresh interval in seconds. 0 disables it.
    pub periodic_refresh_secs: u64,

    /// Maximum number of attempts per reload.
    pub max_retry_attempts: usize,

    /// Initial retry backoff in milliseconds, doubled after each failure.
    pub retry_backoff_ms: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            periodic_refresh_secs: 300,
            max_retry_attempts: 3,
            retry_backoff_ms: 1000,
        }
    }
}

impl ReloadConfig {
    /// Fast timings for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            debounce_ms: 10,
            periodic_refresh_secs: 0,
            max_retry_attempts: 3,
            retry_backoff_ms: 10,
        }
    }
}

impl From<&DirectorySettings> for ReloadConfig {
    fn from(settings: &DirectorySettings) -> Self {
        Self {
            debounce_ms: settings.debounce_ms,
            periodic_refresh_secs: settings.periodic_refresh_secs,
            max_retry_attempts: settings.max_retry_attempts,
            retry_backoff_ms: settings.retry_backoff_ms,
        }
    }
}

// =============================================================================
// Reload Statistics
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadStats {
    pub reload_attempts: u64,
    pub successful_reloads: u64,
    pub failed_reloads: u64,
    pub notifications_received: u64,
    pub notifications_debounced: u64,
}

// =============================================================================
// Site Reload Service
// =============================================================================

/// Reloads the directory in response to site changes.
///
/// The service:
/// - Listens for site change notifications
/// - Debounces rapid changes into a single reload
/// - Periodically refreshes the directory (optional)
/// - Retries failed reloads with exponential backoff
pub struct SiteReloadService {
    directory: Arc<SiteDirectory>,
    notifier: Arc<SiteChangeNotifier>,
    config: ReloadConfig,

    shutdown: AtomicBool,
    shutdown_signal: Notify,

    reload_attempts: AtomicU64,
    successful_reloads: AtomicU64,
    failed_reloads: AtomicU64,
    notifications_received: AtomicU64,
    notifications_debounced: AtomicU64,
}

impl SiteReloadService {
    #[must_use]
    pub fn new(
        directory: Arc<SiteDirectory>,
        notifier: Arc<SiteChangeNotifier>,
        config: ReloadConfig,
    ) -> Self {
        Self {
            directory,
            notifier,
            config,
            shutdown: AtomicBool::new(false),
            shutdown_signal: Notify::new(),
            reload_attempts: AtomicU64::new(0),
            successful_reloads: AtomicU64::new(0),
            failed_reloads: AtomicU64::new(0),
            notifications_received: AtomicU64::new(0),
            notifications_debounced: AtomicU64::new(0),
        }
    }

    /// Run the service on a background task.
    ///
    /// The subscription is taken before the task is spawned, so changes
    /// published right after this returns are not missed.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        let receiver = self.notifier.subscribe();
        tokio::spawn(async move { self.listen(receiver).await })
    }

    /// Run until `shutdown()` is called or the notifier is dropped.
    pub async fn run(&self) {
        self.listen(self.notifier.subscribe()).await;
    }

    async fn listen(&self, mut receiver: broadcast::Receiver<SiteChange>) {
        let debounce_duration = Duration::from_millis(self.config.debounce_ms);
        let periodic_duration = (self.config.periodic_refresh_secs > 0)
            .then(|| Duration::from_secs(self.config.periodic_refresh_secs));

        let mut pending_reload = false;
        let mut last_notification = Instant::now();
        let mut last_periodic_refresh = Instant::now();

        tracing::info!(
            debounce_ms = self.config.debounce_ms,
            periodic_refresh_secs = self.config.periodic_refresh_secs,
            "Site reload service started"
        );

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                tracing::info!("Site reload service shutting down");
                break;
            }

            let periodic_remaining = periodic_duration
                .map(|d| d.saturating_sub(last_periodic_refresh.elapsed()))
                .unwrap_or(Duration::MAX);

            let timeout = if pending_reload {
                debounce_duration
                    .saturating_sub(last_notification.elapsed())
                    .min(periodic_remaining)
            } else {
                periodic_remaining
            };

            tokio::select! {
                result = receiver.recv() => {
                    match result {
                        Ok(change) => {
                            tracing::debug!(change = ?change, "Site change received");
                            self.notifications_received.fetch_add(1, Ordering::Relaxed);

                            if pending_reload {
                                self.notifications_debounced.fetch_add(1, Ordering::Relaxed);
                            }

                            pending_reload = true;
                            last_notification = Instant::now();
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(missed = n, "Missed site change notifications");
                            self.notifications_debounced.fetch_add(n, Ordering::Relaxed);
                            pending_reload = true;
                            last_notification = Instant::now();
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            tracing::info!("Site change channel closed");
                            break;
                        }
                    }
                }

                _ = self.shutdown_signal.notified() => {}

                _ = tokio::time::sleep(timeout) => {
                    if pending_reload && last_notification.elapsed() >= debounce_duration {
                        pending_reload = false;
                        self.perform_reload().await;
                        last_periodic_refresh = Instant::now();
                    } else if let Some(period) = periodic_duration
                        && last_periodic_refresh.elapsed() >= period
                    {
                        tracing::debug!("Periodic site directory refresh");
                        self.perform_reload().await;
                        last_periodic_refresh = Instant::now();
                    }
                }
            }
        }
    }

    async fn perform_reload(&self) {
        if let Err(e) = self.reload_with_retry().await {
            tracing::error!(error = %e, "Site directory reload failed after all retries");
        }
    }

    /// Reload the directory, retrying with exponential backoff.
    ///
    /// # Errors
    ///
    /// Returns the last reload error once `max_retry_attempts` is exhausted.
    pub async fn reload_with_retry(&self) -> Result<(), DirectoryError> {
        let max_attempts = self.config.max_retry_attempts.max(1);
        let mut attempts = 0;
        let mut backoff = self.config.retry_backoff_ms;

        loop {
            self.reload_attempts.fetch_add(1, Ordering::Relaxed);

            match self.directory.reload().await {
                Ok(snapshot) => {
                    self.successful_reloads.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(
                        version = snapshot.version(),
                        "Reload service refreshed site directory"
                    );
                    return Ok(());
                }
                Err(e) => {
                    attempts += 1;
                    if attempts >= max_attempts {
                        self.failed_reloads.fetch_add(1, Ordering::Relaxed);
                        return Err(e);
                    }

                    tracing::warn!(
                        attempt = attempts,
                        max_attempts,
                        error = %e,
                        backoff_ms = backoff,
                        "Site directory reload failed, retrying"
                    );

                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    backoff = backoff.saturating_mul(2);
                }
            }
        }
    }

    /// Queue an immediate reload through the notifier.
    pub fn trigger_reload(&self) {
        self.notifier.notify(SiteChange::BulkReload);
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.shutdown_signal.notify_one();
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn stats(&self) -> ReloadStats {
        ReloadStats {
            reload_attempts: self.reload_attempts.load(Ordering::Relaxed),
            successful_reloads: self.successful_reloads.load(Ordering::Relaxed),
            failed_reloads: self.failed_reloads.load(Ordering::Relaxed),
            notifications_received: self.notifications_received.load(Ordering::Relaxed),
            notifications_debounced: self.notifications_debounced.load(Ordering::Relaxed),
        }
    }

    #[must_use]
    pub fn directory(&self) -> &Arc<SiteDirectory> {
        &self.directory
    }

    #[must_use]
    pub fn notifier(&self) -> &Arc<SiteChangeNotifier> {
        &self.notifier
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sitedir_core::{Site, SiteConfig, SitePatch, StorageProfile};
    use sitedir_db_memory::InMemorySiteRepository;
    use sitedir_storage::{NewSite, SiteRepository, StorageError};
    use std::sync::atomic::AtomicUsize;

    // -------------------------------------------------------------------------
    // Flaky repository
    // -------------------------------------------------------------------------

    /// Fails the first `fail_count` listings, then delegates.
    struct FlakyRepository {
        inner: InMemorySiteRepository,
        list_calls: AtomicUsize,
        fail_count: AtomicUsize,
    }

    impl FlakyRepository {
        fn new(fail_count: usize) -> Self {
            Self {
                inner: InMemorySiteRepository::new(),
                list_calls: AtomicUsize::new(0),
                fail_count: AtomicUsize::new(fail_count),
            }
        }

        fn list_calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SiteRepository for FlakyRepository {
        async fn list_all_sites(&self) -> Result<Vec<Site>, StorageError> {
            let call = self.list_calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_count.load(Ordering::SeqCst) {
                return Err(StorageError::connection_error("simulated outage"));
            }
            self.inner.list_all_sites().await
        }

        async fn get_site(&self, id: &SiteId) -> Result<Option<Site>, StorageError> {
            self.inner.get_site(id).await
        }

        async fn insert_site(&self, site: NewSite) -> Result<Site, StorageError> {
            self.inner.insert_site(site).await
        }

        async fn patch_site(&self, id: &SiteId, patch: &SitePatch) -> Result<u64, StorageError> {
            self.inner.patch_site(id, patch).await
        }

        async fn delete_site(&self, id: &SiteId) -> Result<u64, StorageError> {
            self.inner.delete_site(id).await
        }

        async fn insert_storage_profile(
            &self,
            profile: StorageProfile,
        ) -> Result<StorageProfile, StorageError> {
            self.inner.insert_storage_profile(profile).await
        }

        async fn get_storage_profile(
            &self,
            site_id: &SiteId,
        ) -> Result<Option<StorageProfile>, StorageError> {
            self.inner.get_storage_profile(site_id).await
        }

        async fn delete_storage_profile_by_site_id(
            &self,
            site_id: &SiteId,
        ) -> Result<u64, StorageError> {
            self.inner.delete_storage_profile_by_site_id(site_id).await
        }

        fn backend_name(&self) -> &'static str {
            "flaky"
        }
    }

    fn service_over(
        repo: Arc<dyn SiteRepository>,
        config: ReloadConfig,
    ) -> (Arc<SiteReloadService>, Arc<SiteChangeNotifier>) {
        let directory = Arc::new(SiteDirectory::new(repo));
        let notifier = Arc::new(SiteChangeNotifier::new(16));
        let service = Arc::new(SiteReloadService::new(directory, notifier.clone(), config));
        (service, notifier)
    }

    async fn wait_for_version(directory: &SiteDirectory, version: u64) {
        for _ in 0..200 {
            if directory.version() >= version {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("directory never reached version {version}");
    }

    // -------------------------------------------------------------------------
    // SiteChange / notifier
    // -------------------------------------------------------------------------

    #[test]
    fn test_site_change_site_id() {
        let id = SiteId::parse("s1").unwrap();
        assert_eq!(
            SiteChange::Updated {
                site_id: id.clone()
            }
            .site_id(),
            Some(&id)
        );
        assert_eq!(SiteChange::BulkReload.site_id(), None);
        assert!(SiteChange::BulkReload.is_bulk_reload());
    }

    #[tokio::test]
    async fn test_notifier_multiple_subscribers() {
        let notifier = SiteChangeNotifier::new(16);
        let mut first = notifier.subscribe();
        let mut second = notifier.subscribe();
        assert_eq!(notifier.subscriber_count(), 2);

        notifier.notify(SiteChange::Deleted {
            site_id: SiteId::parse("s1").unwrap(),
        });

        assert_eq!(first.recv().await.unwrap(), second.recv().await.unwrap());
    }

    #[test]
    fn test_notifier_without_subscribers() {
        let notifier = SiteChangeNotifier::default();
        notifier.notify(SiteChange::BulkReload);
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn test_reload_config_from_settings() {
        let settings = DirectorySettings {
            auto_reload: true,
            debounce_ms: 5,
            periodic_refresh_secs: 0,
            max_retry_attempts: 7,
            retry_backoff_ms: 20,
        };
        let config = ReloadConfig::from(&settings);
        assert_eq!(config.debounce_ms, 5);
        assert_eq!(config.max_retry_attempts, 7);
        assert_eq!(config.retry_backoff_ms, 20);
    }

    // -------------------------------------------------------------------------
    // Reload service
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failure() {
        let repo = Arc::new(FlakyRepository::new(2));
        let (service, _notifier) = service_over(repo.clone(), ReloadConfig::for_testing());

        service.reload_with_retry().await.unwrap();

        assert_eq!(repo.list_calls(), 3);
        let stats = service.stats();
        assert_eq!(stats.reload_attempts, 3);
        assert_eq!(stats.successful_reloads, 1);
        assert_eq!(stats.failed_reloads, 0);
        assert!(service.directory().is_loaded());
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let repo = Arc::new(FlakyRepository::new(10));
        let (service, _notifier) = service_over(repo, ReloadConfig::for_testing());

        let err = service.reload_with_retry().await.unwrap_err();
        assert!(matches!(err, DirectoryError::Reload(_)));
        assert_eq!(service.stats().failed_reloads, 1);
        assert_eq!(service.stats().reload_attempts, 3);
    }

    #[tokio::test]
    async fn test_notifications_trigger_debounced_reload() {
        let repo = Arc::new(InMemorySiteRepository::new());
        repo.insert_site(NewSite::new(
            Hostname::new("acme.example").unwrap(),
            SiteConfig::default(),
        ))
        .await
        .unwrap();

        let (service, notifier) = service_over(repo, ReloadConfig::for_testing());
        let handle = service.clone().spawn();

        for _ in 0..3 {
            notifier.notify(SiteChange::BulkReload);
        }
        wait_for_version(service.directory(), 1).await;

        let resolution = service.directory().lookup("acme.example").unwrap();
        assert!(resolution.site().is_some());
        assert_eq!(service.stats().notifications_received, 3);

        service.shutdown();
        handle.await.unwrap();
        assert!(service.is_shutting_down());
    }

    #[tokio::test]
    async fn test_trigger_reload() {
        let repo = Arc::new(InMemorySiteRepository::new());
        let (service, notifier) = service_over(repo, ReloadConfig::for_testing());
        let handle = service.clone().spawn();
        assert_eq!(notifier.subscriber_count(), 1);

        service.trigger_reload();
        wait_for_version(service.directory(), 1).await;
        assert_eq!(service.stats().successful_reloads, 1);

        service.shutdown();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_spawn_subscribes_before_returning() {
        let repo = Arc::new(InMemorySiteRepository::new());
        let (service, notifier) = service_over(repo.clone(), ReloadConfig::for_testing());

        let handle = service.clone().spawn();
        assert_eq!(notifier.subscriber_count(), 1);

        // Published before the spawned task has been polled even once.
        repo.insert_site(NewSite::new(
            Hostname::new("early.example").unwrap(),
            SiteConfig::default(),
        ))
        .await
        .unwrap();
        notifier.notify(SiteChange::BulkReload);

        wait_for_version(service.directory(), 1).await;
        assert!(
            service
                .directory()
                .lookup("early.example")
                .unwrap()
                .site()
                .is_some()
        );
        assert_eq!(service.stats().notifications_received, 1);

        service.shutdown();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_before_run_returns_immediately() {
        let repo = Arc::new(InMemorySiteRepository::new());
        let (service, _notifier) = service_over(repo, ReloadConfig::for_testing());

        service.shutdown();
        service.run().await;
        assert_eq!(service.stats().reload_attempts, 0);
    }
}
