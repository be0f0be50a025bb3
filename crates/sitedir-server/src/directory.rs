//! Site directory: the in-memory hostname → site index.
//!
//! The directory serves lookups from an immutable [`DirectorySnapshot`]
//! published through an `ArcSwapOption`. A reload fetches every site from the
//! repository, builds a fresh snapshot off to the side and swaps it in as a
//! whole, so readers observe either the old pair of maps or the new pair and
//! never a mixture.
//!
//! # Example
//!
//! ```ignore
//! let directory = SiteDirectory::new(repository);
//! directory.reload().await?;
//!
//! match directory.resolve("acme.example", false).await? {
//!     Resolution::Exact(site) | Resolution::Wildcard(site) => serve(site),
//!     Resolution::NoTenant => not_found(),
//! }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwapOption;
use sitedir_core::{Hostname, Site, SiteId};
use sitedir_storage::{DynSiteRepository, StorageError};
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

/// Errors raised by the directory itself.
///
/// An unknown hostname is not an error; see [`Resolution::NoTenant`].
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// No reload has ever succeeded, so there is nothing to serve from.
    #[error("Site directory is unavailable: it has never been loaded")]
    Unavailable,

    /// The repository fetch failed. The previous snapshot stays active.
    #[error("Site directory reload failed: {0}")]
    Reload(#[from] StorageError),
}

impl DirectoryError {
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

/// Outcome of resolving a hostname.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A site is registered under exactly this hostname.
    Exact(Arc<Site>),
    /// No exact match; the `*` site caught the request.
    Wildcard(Arc<Site>),
    /// Neither an exact nor a wildcard site exists.
    NoTenant,
}

impl Resolution {
    #[must_use]
    pub fn site(&self) -> Option<&Arc<Site>> {
        match self {
            Self::Exact(site) | Self::Wildcard(site) => Some(site),
            Self::NoTenant => None,
        }
    }

    #[must_use]
    pub fn into_site(self) -> Option<Arc<Site>> {
        match self {
            Self::Exact(site) | Self::Wildcard(site) => Some(site),
            Self::NoTenant => None,
        }
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard(_))
    }

    #[must_use]
    pub fn is_no_tenant(&self) -> bool {
        matches!(self, Self::NoTenant)
    }
}

/// Immutable id → site map plus hostname → id index.
///
/// Every hostname key points at an id present in the site map.
#[derive(Debug)]
pub struct DirectorySnapshot {
    sites: HashMap<SiteId, Arc<Site>>,
    hostnames: HashMap<String, SiteId>,
    version: u64,
    loaded_at: OffsetDateTime,
}

impl DirectorySnapshot {
    /// Builds a snapshot from a repository listing.
    ///
    /// Sites are indexed in the order given. If two sites claim the same
    /// hostname, the later one owns the index entry; both stay in the id map.
    pub fn build(sites: Vec<Site>) -> Self {
        let mut by_id = HashMap::with_capacity(sites.len());
        let mut hostnames = HashMap::with_capacity(sites.len());

        for site in sites {
            let id = site.id.clone();
            if let Some(shadowed) = hostnames.insert(site.hostname.as_str().to_string(), id.clone())
            {
                warn!(
                    hostname = %site.hostname,
                    kept = %id,
                    shadowed = %shadowed,
                    "Duplicate hostname in site listing"
                );
            }
            by_id.insert(id, Arc::new(site));
        }

        Self {
            sites: by_id,
            hostnames,
            version: 0,
            loaded_at: OffsetDateTime::now_utc(),
        }
    }

    /// Exact hostname, then `*`, then nothing.
    #[must_use]
    pub fn lookup(&self, hostname: &str) -> Resolution {
        if let Some(site) = self.by_hostname(hostname) {
            return Resolution::Exact(site);
        }
        match self.by_hostname(Hostname::WILDCARD) {
            Some(site) => Resolution::Wildcard(site),
            None => Resolution::NoTenant,
        }
    }

    fn by_hostname(&self, hostname: &str) -> Option<Arc<Site>> {
        self.hostnames
            .get(hostname)
            .and_then(|id| self.sites.get(id))
            .cloned()
    }

    #[must_use]
    pub fn get(&self, id: &SiteId) -> Option<&Arc<Site>> {
        self.sites.get(id)
    }

    /// All cached sites ordered by id.
    #[must_use]
    pub fn sites(&self) -> Vec<Arc<Site>> {
        let mut sites: Vec<_> = self.sites.values().cloned().collect();
        sites.sort_by(|a, b| a.id.cmp(&b.id));
        sites
    }

    /// Hostname index entries ordered by hostname.
    #[must_use]
    pub fn hostnames(&self) -> Vec<(&str, &SiteId)> {
        let mut entries: Vec<_> = self
            .hostnames
            .iter()
            .map(|(host, id)| (host.as_str(), id))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.hostnames.contains_key(Hostname::WILDCARD)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Publish counter of the directory that produced this snapshot.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn loaded_at(&self) -> OffsetDateTime {
        self.loaded_at
    }

    /// Whether both maps hold the same entries, ignoring version and load time.
    #[must_use]
    pub fn same_entries(&self, other: &Self) -> bool {
        self.sites == other.sites && self.hostnames == other.hostnames
    }
}

/// Readiness of the directory for health probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Serving the result of the latest reload.
    Ready,
    /// Serving an older snapshot because the latest reload failed.
    Degraded,
    /// Never loaded.
    Unavailable,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryHealth {
    pub status: HealthStatus,
    pub version: u64,
    pub site_count: usize,
    pub loaded_at: Option<OffsetDateTime>,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct PublishState {
    /// Ticket of the reload whose snapshot is currently published.
    ticket: u64,
    version: u64,
}

/// Owned hostname → site directory over a [`SiteRepository`](sitedir_storage::SiteRepository).
///
/// Lookups never block: they load the current snapshot pointer and read from
/// it. Reloads may run concurrently; each takes a ticket when it starts and
/// publishes only if no reload that started later has already published.
pub struct SiteDirectory {
    repository: DynSiteRepository,
    current: ArcSwapOption<DirectorySnapshot>,
    next_ticket: AtomicU64,
    publish: Mutex<PublishState>,
    last_error: ArcSwapOption<String>,
}

impl SiteDirectory {
    /// Creates an empty, not yet loaded directory.
    pub fn new(repository: DynSiteRepository) -> Self {
        Self {
            repository,
            current: ArcSwapOption::empty(),
            next_ticket: AtomicU64::new(0),
            publish: Mutex::new(PublishState::default()),
            last_error: ArcSwapOption::empty(),
        }
    }

    /// Resolves `hostname` to a site, reloading first when `force_reload`.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Reload` if the forced reload fails, or
    /// `DirectoryError::Unavailable` if the directory was never loaded.
    pub async fn resolve(
        &self,
        hostname: &str,
        force_reload: bool,
    ) -> Result<Resolution, DirectoryError> {
        if force_reload {
            self.reload().await?;
        }
        self.lookup(hostname)
    }

    /// Resolves against the current snapshot without touching the repository.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Unavailable` if the directory was never loaded.
    pub fn lookup(&self, hostname: &str) -> Result<Resolution, DirectoryError> {
        let guard = self.current.load();
        match guard.as_ref() {
            Some(snapshot) => {
                let resolution = snapshot.lookup(hostname);
                debug!(
                    hostname,
                    wildcard = resolution.is_wildcard(),
                    found = !resolution.is_no_tenant(),
                    "Resolved hostname"
                );
                Ok(resolution)
            }
            None => Err(DirectoryError::Unavailable),
        }
    }

    /// Rebuilds the directory from the repository and publishes it.
    ///
    /// On failure nothing is published and the previous snapshot keeps
    /// serving. Returns the snapshot that is current once this call ends.
    #[instrument(skip(self), fields(backend = self.repository.backend_name()))]
    pub async fn reload(&self) -> Result<Arc<DirectorySnapshot>, DirectoryError> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(ticket, "Reloading site directory");

        let sites = match self.repository.list_all_sites().await {
            Ok(sites) => sites,
            Err(err) => {
                warn!(
                    ticket,
                    error = %err,
                    "Site directory reload failed, keeping previous snapshot"
                );
                let superseded = self.lock_publish().ticket > ticket;
                if !superseded {
                    self.last_error.store(Some(Arc::new(err.to_string())));
                }
                return Err(DirectoryError::Reload(err));
            }
        };

        let count = sites.len();
        let mut snapshot = DirectorySnapshot::build(sites);

        let published = {
            let mut state = self.lock_publish();
            if state.ticket > ticket {
                None
            } else {
                state.ticket = ticket;
                state.version += 1;
                snapshot.version = state.version;
                let snapshot = Arc::new(snapshot);
                self.current.store(Some(Arc::clone(&snapshot)));
                self.last_error.store(None);
                Some(snapshot)
            }
        };

        match published {
            Some(snapshot) => {
                info!(
                    count,
                    hostnames = snapshot.hostnames.len(),
                    wildcard = snapshot.has_wildcard(),
                    version = snapshot.version,
                    "Site directory reloaded"
                );
                Ok(snapshot)
            }
            None => {
                debug!(ticket, "Discarding reload superseded by a newer one");
                self.current.load_full().ok_or(DirectoryError::Unavailable)
            }
        }
    }

    fn lock_publish(&self) -> std::sync::MutexGuard<'_, PublishState> {
        self.publish.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The currently published snapshot, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<DirectorySnapshot>> {
        self.current.load_full()
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.current.load().is_some()
    }

    /// Version of the published snapshot, 0 before the first load.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.current.load().as_ref().map_or(0, |s| s.version)
    }

    #[must_use]
    pub fn health(&self) -> DirectoryHealth {
        let snapshot = self.current.load_full();
        let last_error = self.last_error.load_full().map(|e| e.as_ref().clone());

        let status = match (&snapshot, &last_error) {
            (None, _) => HealthStatus::Unavailable,
            (Some(_), Some(_)) => HealthStatus::Degraded,
            (Some(_), None) => HealthStatus::Ready,
        };

        DirectoryHealth {
            status,
            version: snapshot.as_ref().map_or(0, |s| s.version),
            site_count: snapshot.as_ref().map_or(0, |s| s.len()),
            loaded_at: snapshot.as_ref().map(|s| s.loaded_at),
            last_error,
        }
    }

    #[must_use]
    pub fn repository(&self) -> &DynSiteRepository {
        &self.repository
    }
}

impl std::fmt::Debug for SiteDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteDirectory")
            .field("backend", &self.repository.backend_name())
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}
