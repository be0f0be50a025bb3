//! Storage profile: the per-site companion record describing how content is
//! stored and delivered.

use serde::{Deserialize, Serialize};

use crate::id::SiteId;

/// Name of the storage module every new site starts with.
pub const DEFAULT_STORAGE_MODULE: &str = "db";

/// Size threshold above which an asset is classed as `large`.
pub const DEFAULT_LARGE_THRESHOLD: &str = "5MB";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageProfile {
    pub site_id: SiteId,
    pub module: String,
    pub is_enabled: bool,
    pub content_types: ContentTypes,
    pub asset_delivery: AssetDelivery,
    pub state: ProfileState,
}

impl StorageProfile {
    /// The profile created alongside every new site.
    pub fn default_for(site_id: SiteId) -> Self {
        Self {
            site_id,
            module: DEFAULT_STORAGE_MODULE.to_string(),
            is_enabled: true,
            content_types: ContentTypes::default(),
            asset_delivery: AssetDelivery::default(),
            state: ProfileState::default(),
        }
    }
}

/// Classes of content a storage module accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentClass {
    Pages,
    Images,
    Documents,
    Others,
    Large,
}

impl ContentClass {
    pub const ALL: [ContentClass; 5] = [
        ContentClass::Pages,
        ContentClass::Images,
        ContentClass::Documents,
        ContentClass::Others,
        ContentClass::Large,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTypes {
    pub active_types: Vec<ContentClass>,
    pub large_threshold: String,
}

impl Default for ContentTypes {
    fn default() -> Self {
        Self {
            active_types: ContentClass::ALL.to_vec(),
            large_threshold: DEFAULT_LARGE_THRESHOLD.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDelivery {
    pub streaming: bool,
    pub direct_access: bool,
}

impl Default for AssetDelivery {
    fn default() -> Self {
        Self {
            streaming: true,
            direct_access: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    #[default]
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProfileState {
    pub current: ProfileStatus,
}
