//! Site records and the hostnames that route to them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::SiteConfig;
use crate::error::{CoreError, Result};
use crate::id::SiteId;

/// Hostname a request is routed by.
///
/// Matching is exact and case-sensitive. The reserved value `*` marks the
/// fallback tenant used when no exact hostname matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hostname(String);

impl Hostname {
    /// The reserved wildcard hostname.
    pub const WILDCARD: &'static str = "*";

    /// Validate and wrap a hostname.
    ///
    /// Empty or blank values are rejected as missing; values containing
    /// whitespace are rejected as invalid. No case folding is applied.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(CoreError::MissingHostname);
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(CoreError::invalid_hostname(raw));
        }
        Ok(Self(raw))
    }

    /// The wildcard hostname `*`.
    pub fn wildcard() -> Self {
        Self(Self::WILDCARD.to_string())
    }

    pub fn is_wildcard(&self) -> bool {
        self.0 == Self::WILDCARD
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Hostname {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Hostname> for String {
    fn from(value: Hostname) -> Self {
        value.0
    }
}

impl fmt::Display for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Hostname {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One tenant: identity, enablement flag and configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: SiteId,
    pub hostname: Hostname,
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(default)]
    pub config: SiteConfig,
}

impl Site {
    pub fn is_wildcard(&self) -> bool {
        self.hostname.is_wildcard()
    }
}

/// Partial update applied to a stored site.
///
/// Fields left as `None` are untouched. `config` replaces the stored
/// document as a whole; it is never merged key by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<Hostname>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<SiteConfig>,
}

impl SitePatch {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_hostname(mut self, hostname: Hostname) -> Self {
        self.hostname = Some(hostname);
        self
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.is_enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: SiteConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Returns `true` when the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        self.hostname.is_none() && self.is_enabled.is_none() && self.config.is_none()
    }

    /// Apply the patch to a site in place.
    pub fn apply_to(&self, site: &mut Site) {
        if let Some(hostname) = &self.hostname {
            site.hostname = hostname.clone();
        }
        if let Some(enabled) = self.is_enabled {
            site.is_enabled = enabled;
        }
        if let Some(config) = &self.config {
            site.config = config.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname_validation() {
        assert!(matches!(Hostname::new(""), Err(CoreError::MissingHostname)));
        assert!(matches!(Hostname::new("  "), Err(CoreError::MissingHostname)));
        assert!(matches!(
            Hostname::new("acme .example"),
            Err(CoreError::InvalidHostname(_))
        ));
        assert_eq!(Hostname::new("acme.example").unwrap().as_str(), "acme.example");
    }

    #[test]
    fn test_hostname_is_case_sensitive() {
        let lower = Hostname::new("acme.example").unwrap();
        let upper = Hostname::new("ACME.example").unwrap();
        assert_ne!(lower, upper);
    }

    #[test]
    fn test_wildcard() {
        assert!(Hostname::wildcard().is_wildcard());
        assert!(Hostname::new("*").unwrap().is_wildcard());
        assert!(!Hostname::new("*.acme.example").unwrap().is_wildcard());
    }

    #[test]
    fn test_hostname_deserialize_rejects_blank() {
        assert!(serde_json::from_str::<Hostname>("\"\"").is_err());
        let host: Hostname = serde_json::from_str("\"docs.acme.example\"").unwrap();
        assert_eq!(host.as_str(), "docs.acme.example");
    }

    #[test]
    fn test_site_serializes_camel_case() {
        let site = Site {
            id: SiteId::parse("s1").unwrap(),
            hostname: Hostname::wildcard(),
            is_enabled: true,
            config: SiteConfig::default(),
        };
        let value = serde_json::to_value(&site).unwrap();
        assert_eq!(value["isEnabled"], true);
        assert_eq!(value["hostname"], "*");
        assert_eq!(value["config"]["theme"]["colorPrimary"], "#1976d2");
    }

    #[test]
    fn test_patch_apply() {
        let mut site = Site {
            id: SiteId::parse("s1").unwrap(),
            hostname: Hostname::new("old.example").unwrap(),
            is_enabled: true,
            config: SiteConfig::default(),
        };
        let mut config = SiteConfig::default();
        config.title = "Renamed".into();

        let patch = SitePatch::new()
            .with_hostname(Hostname::new("new.example").unwrap())
            .with_enabled(false)
            .with_config(config);
        assert!(!patch.is_empty());
        patch.apply_to(&mut site);

        assert_eq!(site.hostname.as_str(), "new.example");
        assert!(!site.is_enabled);
        assert_eq!(site.config.title, "Renamed");
        assert_eq!(site.id.as_str(), "s1");
    }

    #[test]
    fn test_empty_patch() {
        assert!(SitePatch::new().is_empty());
    }
}
