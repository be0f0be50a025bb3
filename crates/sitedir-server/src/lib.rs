//! Hostname → tenant site directory.
//!
//! - [`directory`]: the in-memory index and its atomic reload
//! - [`lifecycle`]: create/update/delete of sites and storage profiles
//! - [`reload`]: change notifications and the opt-in reload service
//! - [`app`]: wiring of backend, directory and services from [`config`]

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod directory;
pub mod lifecycle;
pub mod observability;
pub mod reload;

pub use app::{AppBuilder, AppError, SiteDirectoryApp, create_repository};
pub use config::{AppConfig, DirectorySettings, PostgresStorageConfig, StorageBackend};
pub use directory::{
    DirectoryError, DirectoryHealth, DirectorySnapshot, HealthStatus, Resolution, SiteDirectory,
};
pub use lifecycle::{LifecycleError, SiteLifecycle};
pub use observability::init_tracing;
pub use reload::{ReloadConfig, ReloadStats, SiteChange, SiteChangeNotifier, SiteReloadService};
