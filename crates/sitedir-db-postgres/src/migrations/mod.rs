//! Database migration management for the PostgreSQL backend.
//!
//! Migrations are embedded in the binary so the server needs no filesystem
//! access at startup.

use sqlx_core::migrate::{Migration, MigrationType, Migrator};
use sqlx_postgres::PgPool;
use std::borrow::Cow;
use tracing::{info, instrument};

use crate::error::{PostgresError, Result};

/// Embedded migrations as (version, description, sql), oldest first.
///
/// To add a migration, create the SQL file under `migrations/` and append an
/// entry here.
macro_rules! embedded_migrations {
    () => {
        &[(
            20260301000001i64,
            "sites",
            include_str!("../../migrations/20260301000001_sites.sql"),
        )]
    };
}

fn build_migrations() -> Vec<Migration> {
    embedded_migrations!()
        .iter()
        .map(|(version, description, sql)| Migration {
            version: *version,
            description: Cow::Borrowed(description),
            migration_type: MigrationType::Simple,
            sql: Cow::Borrowed(sql),
            checksum: Cow::Borrowed(&[]),
            no_tx: false,
        })
        .collect()
}

/// Number of migrations compiled into this build.
pub fn embedded_count() -> usize {
    build_migrations().len()
}

/// Runs all pending migrations.
///
/// Applied versions are tracked in the `_sqlx_migrations` table, so running
/// this twice is a no-op.
///
/// # Errors
///
/// Returns `PostgresError::Migration` if any migration fails.
#[instrument(skip(pool))]
pub async fn run(pool: &PgPool) -> Result<()> {
    let migrations = build_migrations();
    info!(count = migrations.len(), "Running database migrations");

    let migrator = Migrator {
        migrations: Cow::Owned(migrations),
        ignore_missing: false,
        locking: true,
        no_tx: false,
    };

    migrator
        .run(pool)
        .await
        .map_err(|e| PostgresError::Migration(format!("Migration failed: {e}")))?;

    info!("Database migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ordered() {
        let migrations = build_migrations();
        assert_eq!(migrations.len(), embedded_count());
        assert!(
            migrations
                .windows(2)
                .all(|pair| pair[0].version < pair[1].version)
        );
    }

    #[test]
    fn test_schema_declares_hostname_uniqueness() {
        let sql = &build_migrations()[0].sql;
        assert!(sql.contains("sites_hostname_key UNIQUE (hostname)"));
        assert!(sql.contains("REFERENCES sites (id)"));
    }
}
