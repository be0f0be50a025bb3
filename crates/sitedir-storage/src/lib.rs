//! # sitedir-storage
//!
//! Storage abstraction layer for sitedir.
//!
//! This crate defines the repository contract that every backend implements.
//! It does not contain any implementations - those are provided by separate
//! crates (`sitedir-db-memory`, `sitedir-db-postgres`).
//!
//! ## Overview
//!
//! The main trait is [`SiteRepository`], which covers:
//! - listing all sites in id order (the input of a directory reload)
//! - inserting, patching and deleting site records
//! - inserting, reading and deleting the per-site storage profile
//!
//! ## Storage Backends
//!
//! ```ignore
//! use async_trait::async_trait;
//! use sitedir_storage::{SiteRepository, StorageError};
//!
//! struct MyRepository {
//!     // ...
//! }
//!
//! #[async_trait]
//! impl SiteRepository for MyRepository {
//!     async fn list_all_sites(&self) -> Result<Vec<Site>, StorageError> {
//!         // Implementation
//!     }
//!     // ... other methods
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::SiteRepository;
pub use types::NewSite;

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared repository trait object.
pub type DynSiteRepository = std::sync::Arc<dyn SiteRepository>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use sitedir_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::traits::SiteRepository;
    pub use crate::types::NewSite;
    pub use crate::{DynSiteRepository, StorageResult};
}
