use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Opaque unique identifier of a site.
///
/// Generated as a UUIDv4 string at creation time, but any non-empty string
/// read back from storage is accepted. Ordering is plain string ordering,
/// which is what directory reloads iterate by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(String);

impl SiteId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wrap an existing identifier, rejecting empty or blank values.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(CoreError::invalid_id(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SiteId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_uuid() {
        let id = SiteId::generate();
        assert!(uuid::Uuid::parse_str(id.as_str()).is_ok());
        assert_ne!(id, SiteId::generate());
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert!(SiteId::parse("").is_err());
        assert!(SiteId::parse("   ").is_err());
        assert_eq!(SiteId::parse("site-1").unwrap().as_str(), "site-1");
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let mut ids = vec![
            SiteId::parse("b").unwrap(),
            SiteId::parse("a").unwrap(),
            SiteId::parse("c").unwrap(),
        ];
        ids.sort();
        let ordered: Vec<&str> = ids.iter().map(SiteId::as_str).collect();
        assert_eq!(ordered, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_serde_transparent() {
        let id = SiteId::parse("abc").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
