pub mod config;
pub mod error;
pub mod id;
pub mod merge;
pub mod profile;
pub mod site;

pub use config::{DisplayDefaults, FeatureToggles, RobotsPolicy, SiteConfig, Theme};
pub use error::{CoreError, Result};
pub use id::SiteId;
pub use merge::merge_over_defaults;
pub use profile::{
    AssetDelivery, ContentClass, ContentTypes, ProfileState, ProfileStatus, StorageProfile,
};
pub use site::{Hostname, Site, SitePatch};
