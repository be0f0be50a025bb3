//! In-memory site repository backend for sitedir.
//!
//! This crate provides an in-memory implementation of the `SiteRepository`
//! trait from `sitedir-storage`, using papaya lock-free HashMaps for
//! concurrent access. It backs tests and local development.
//!
//! # Example
//!
//! ```ignore
//! use sitedir_db_memory::InMemorySiteRepository;
//! use sitedir_storage::{NewSite, SiteRepository};
//!
//! let repo = InMemorySiteRepository::new();
//! let site = repo.insert_site(NewSite::new(hostname, config)).await?;
//! ```

mod site_impl;
pub mod storage;

// Re-export the repository trait for convenience
pub use sitedir_storage::{SiteRepository, StorageError};

pub use storage::InMemorySiteRepository;

/// Creates a new shareable in-memory repository.
pub fn create_repository() -> sitedir_storage::DynSiteRepository {
    std::sync::Arc::new(InMemorySiteRepository::new())
}
