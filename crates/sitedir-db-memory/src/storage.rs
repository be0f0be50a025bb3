use papaya::HashMap as PapayaHashMap;
use sitedir_core::{Hostname, Site, SiteId, SitePatch, StorageProfile};
use sitedir_storage::{NewSite, StorageError};
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory site repository backend using papaya lock-free HashMaps.
///
/// Reads never block. Writes are serialized through `write_lock` so that the
/// hostname uniqueness check and the insert happen as one step; papaya alone
/// cannot guarantee that across two maps.
///
/// Referential rules mirror the PostgreSQL schema: a profile can only be
/// inserted for an existing site, and a site cannot be deleted while its
/// profile still exists.
#[derive(Debug)]
pub struct InMemorySiteRepository {
    /// Site records keyed by id
    pub(crate) sites: Arc<PapayaHashMap<SiteId, Site>>,
    /// Hostname -> owning site id
    pub(crate) hostnames: Arc<PapayaHashMap<Hostname, SiteId>>,
    /// One storage profile per site
    pub(crate) profiles: Arc<PapayaHashMap<SiteId, StorageProfile>>,
    /// Serializes all mutations
    pub(crate) write_lock: Mutex<()>,
}

impl InMemorySiteRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self {
            sites: Arc::new(PapayaHashMap::new()),
            hostnames: Arc::new(PapayaHashMap::new()),
            profiles: Arc::new(PapayaHashMap::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Number of stored sites.
    pub fn site_count(&self) -> usize {
        self.sites.pin().len()
    }

    /// Number of stored storage profiles.
    pub fn profile_count(&self) -> usize {
        self.profiles.pin().len()
    }

    pub(crate) fn list_sorted(&self) -> Vec<Site> {
        let guard = self.sites.pin();
        let mut sites: Vec<Site> = guard.iter().map(|(_, site)| site.clone()).collect();
        sites.sort_by(|a, b| a.id.cmp(&b.id));
        sites
    }

    pub(crate) fn read_site(&self, id: &SiteId) -> Option<Site> {
        self.sites.pin().get(id).cloned()
    }

    pub(crate) fn read_profile(&self, site_id: &SiteId) -> Option<StorageProfile> {
        self.profiles.pin().get(site_id).cloned()
    }

    /// Insert a site. Caller must hold `write_lock`.
    pub(crate) fn insert_locked(&self, new_site: NewSite) -> Result<Site, StorageError> {
        let sites = self.sites.pin();
        let hostnames = self.hostnames.pin();

        if sites.contains_key(&new_site.id) {
            return Err(StorageError::already_exists("site", new_site.id.as_str()));
        }
        if hostnames.contains_key(&new_site.hostname) {
            return Err(StorageError::already_exists(
                "site",
                new_site.hostname.as_str(),
            ));
        }

        let site = new_site.into_site();
        hostnames.insert(site.hostname.clone(), site.id.clone());
        sites.insert(site.id.clone(), site.clone());
        Ok(site)
    }

    /// Patch a site. Caller must hold `write_lock`.
    pub(crate) fn patch_locked(&self, id: &SiteId, patch: &SitePatch) -> Result<u64, StorageError> {
        let sites = self.sites.pin();
        let hostnames = self.hostnames.pin();

        let Some(current) = sites.get(id) else {
            return Ok(0);
        };

        if let Some(new_host) = &patch.hostname
            && let Some(owner) = hostnames.get(new_host)
            && owner != id
        {
            return Err(StorageError::already_exists("site", new_host.as_str()));
        }

        let mut updated = current.clone();
        patch.apply_to(&mut updated);

        if updated.hostname != current.hostname {
            hostnames.remove(&current.hostname);
            hostnames.insert(updated.hostname.clone(), id.clone());
        }
        sites.insert(id.clone(), updated);
        Ok(1)
    }

    /// Delete a site. Caller must hold `write_lock`.
    pub(crate) fn delete_locked(&self, id: &SiteId) -> Result<u64, StorageError> {
        if self.profiles.pin().contains_key(id) {
            return Err(StorageError::invalid_record(format!(
                "site {id} still has a storage profile"
            )));
        }

        let sites = self.sites.pin();
        match sites.remove(id) {
            Some(removed) => {
                self.hostnames.pin().remove(&removed.hostname);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    /// Insert a storage profile. Caller must hold `write_lock`.
    pub(crate) fn insert_profile_locked(
        &self,
        profile: StorageProfile,
    ) -> Result<StorageProfile, StorageError> {
        if !self.sites.pin().contains_key(&profile.site_id) {
            return Err(StorageError::not_found("site", profile.site_id.as_str()));
        }

        let profiles = self.profiles.pin();
        if profiles.contains_key(&profile.site_id) {
            return Err(StorageError::already_exists(
                "storage",
                profile.site_id.as_str(),
            ));
        }
        profiles.insert(profile.site_id.clone(), profile.clone());
        Ok(profile)
    }

    /// Delete the profile of a site. Caller must hold `write_lock`.
    pub(crate) fn delete_profile_locked(&self, site_id: &SiteId) -> u64 {
        match self.profiles.pin().remove(site_id) {
            Some(_) => 1,
            None => 0,
        }
    }
}

impl Default for InMemorySiteRepository {
    fn default() -> Self {
        Self::new()
    }
}
