//! Queries against the `sites` table.

use serde_json::Value;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;

use sitedir_core::{Hostname, Site, SiteConfig, SiteId, SitePatch};
use sitedir_storage::{NewSite, StorageError};

use tracing::warn;

use crate::error::{is_foreign_key_violation, is_unique_violation, to_storage_error};

/// Raw row shape: (id, hostname, is_enabled, config).
type SiteRow = (String, String, bool, Value);

fn row_to_site(row: SiteRow) -> Result<Site, StorageError> {
    let (id, hostname, is_enabled, config) = row;
    let (config, replaced) = SiteConfig::from_stored(config);
    if !replaced.is_empty() {
        warn!(
            site_id = %id,
            fields = ?replaced,
            "Stored site config has ill-typed values, using defaults for them"
        );
    }

    Ok(Site {
        id: SiteId::parse(id)?,
        hostname: Hostname::new(hostname)?,
        is_enabled,
        config,
    })
}

fn config_json(config: &SiteConfig) -> Result<Value, StorageError> {
    serde_json::to_value(config)
        .map_err(|e| StorageError::invalid_record(format!("Failed to encode site config: {e}")))
}

/// Lists every site ordered by id.
pub async fn list_all(pool: &PgPool) -> Result<Vec<Site>, StorageError> {
    let rows: Vec<SiteRow> =
        query_as("SELECT id, hostname, is_enabled, config FROM sites ORDER BY id")
            .fetch_all(pool)
            .await
            .map_err(|e| to_storage_error(e, "Failed to list sites"))?;

    rows.into_iter().map(row_to_site).collect()
}

/// Reads one site by id.
pub async fn get(pool: &PgPool, id: &SiteId) -> Result<Option<Site>, StorageError> {
    let row: Option<SiteRow> =
        query_as("SELECT id, hostname, is_enabled, config FROM sites WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(pool)
            .await
            .map_err(|e| to_storage_error(e, "Failed to read site"))?;

    row.map(row_to_site).transpose()
}

/// Inserts a new site and returns the stored row.
pub async fn insert(pool: &PgPool, site: NewSite) -> Result<Site, StorageError> {
    let config = config_json(&site.config)?;

    let row: SiteRow = query_as(
        r#"INSERT INTO sites (id, hostname, is_enabled, config)
           VALUES ($1, $2, $3, $4)
           RETURNING id, hostname, is_enabled, config"#,
    )
    .bind(site.id.as_str())
    .bind(site.hostname.as_str())
    .bind(site.is_enabled)
    .bind(&config)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            StorageError::already_exists("site", site.hostname.as_str())
        } else {
            to_storage_error(e, "Failed to create site")
        }
    })?;

    row_to_site(row)
}

/// Applies a patch. Absent fields keep their stored value.
pub async fn patch(pool: &PgPool, id: &SiteId, patch: &SitePatch) -> Result<u64, StorageError> {
    let config = patch.config.as_ref().map(config_json).transpose()?;
    let hostname = patch.hostname.as_ref().map(Hostname::as_str);

    let result = query(
        r#"UPDATE sites
           SET hostname = COALESCE($2, hostname),
               is_enabled = COALESCE($3, is_enabled),
               config = COALESCE($4, config),
               updated_at = now()
           WHERE id = $1"#,
    )
    .bind(id.as_str())
    .bind(hostname)
    .bind(patch.is_enabled)
    .bind(config)
    .execute(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            StorageError::already_exists("site", hostname.unwrap_or_default())
        } else {
            to_storage_error(e, "Failed to update site")
        }
    })?;

    Ok(result.rows_affected())
}

/// Deletes a site row. Fails while a storage profile still references it.
pub async fn delete(pool: &PgPool, id: &SiteId) -> Result<u64, StorageError> {
    let result = query("DELETE FROM sites WHERE id = $1")
        .bind(id.as_str())
        .execute(pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StorageError::invalid_record(format!("site {id} still has a storage profile"))
            } else {
                to_storage_error(e, "Failed to delete site")
            }
        })?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_to_site() {
        let site = row_to_site((
            "s1".into(),
            "acme.example".into(),
            false,
            json!({"title": "Acme"}),
        ))
        .unwrap();

        assert_eq!(site.id.as_str(), "s1");
        assert_eq!(site.hostname.as_str(), "acme.example");
        assert!(!site.is_enabled);
        assert_eq!(site.config.title, "Acme");
    }

    #[test]
    fn test_row_with_blank_hostname_is_invalid() {
        let err = row_to_site(("s1".into(), "  ".into(), true, json!({}))).unwrap_err();
        assert!(matches!(err, StorageError::InvalidRecord { .. }));
    }

    #[test]
    fn test_row_with_non_object_config_loads_defaults() {
        let site = row_to_site((
            "s1".into(),
            "a.example".into(),
            true,
            json!("not an object"),
        ))
        .unwrap();
        assert_eq!(site.config, SiteConfig::default());
    }

    #[test]
    fn test_null_leaf_does_not_fail_the_listing() {
        let rows = vec![
            ("a".to_string(), "a.example".to_string(), true, json!({"title": "A"})),
            ("b".to_string(), "b.example".to_string(), true, json!({"locale": null})),
        ];

        let sites = rows
            .into_iter()
            .map(row_to_site)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].config.title, "A");
        assert_eq!(sites[1].config.locale, "en");
    }
}
