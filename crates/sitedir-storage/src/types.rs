//! Record types passed across the repository boundary.

use serde::{Deserialize, Serialize};
use sitedir_core::{Hostname, Site, SiteConfig, SiteId};

/// Fields for a site that has not been persisted yet.
///
/// The identifier is chosen by the caller so it can be referenced by the
/// storage profile written right after the site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSite {
    pub id: SiteId,
    pub hostname: Hostname,
    pub is_enabled: bool,
    pub config: SiteConfig,
}

impl NewSite {
    /// A new, enabled site with a freshly generated id.
    pub fn new(hostname: Hostname, config: SiteConfig) -> Self {
        Self {
            id: SiteId::generate(),
            hostname,
            is_enabled: true,
            config,
        }
    }

    /// Convert into the stored representation.
    pub fn into_site(self) -> Site {
        Site {
            id: self.id,
            hostname: self.hostname,
            is_enabled: self.is_enabled,
            config: self.config,
        }
    }
}
