//! Queries against the `storage` table.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;

use sitedir_core::{SiteId, StorageProfile};
use sitedir_storage::StorageError;

use crate::error::{is_foreign_key_violation, is_unique_violation, to_storage_error};

/// Raw row shape: (site_id, module, is_enabled, content_types, asset_delivery, state).
type ProfileRow = (String, String, bool, Value, Value, Value);

fn encode<T: Serialize>(field: &str, value: &T) -> Result<Value, StorageError> {
    serde_json::to_value(value)
        .map_err(|e| StorageError::invalid_record(format!("Failed to encode {field}: {e}")))
}

fn decode<T: DeserializeOwned>(field: &str, value: Value) -> Result<T, StorageError> {
    serde_json::from_value(value)
        .map_err(|e| StorageError::invalid_record(format!("Malformed storage {field}: {e}")))
}

fn row_to_profile(row: ProfileRow) -> Result<StorageProfile, StorageError> {
    let (site_id, module, is_enabled, content_types, asset_delivery, state) = row;
    Ok(StorageProfile {
        site_id: SiteId::parse(site_id)?,
        module,
        is_enabled,
        content_types: decode("contentTypes", content_types)?,
        asset_delivery: decode("assetDelivery", asset_delivery)?,
        state: decode("state", state)?,
    })
}

/// Inserts the storage profile of an existing site.
pub async fn insert(
    pool: &PgPool,
    profile: StorageProfile,
) -> Result<StorageProfile, StorageError> {
    let content_types = encode("contentTypes", &profile.content_types)?;
    let asset_delivery = encode("assetDelivery", &profile.asset_delivery)?;
    let state = encode("state", &profile.state)?;

    let row: ProfileRow = query_as(
        r#"INSERT INTO storage (module, site_id, is_enabled, content_types, asset_delivery, state)
           VALUES ($1, $2, $3, $4, $5, $6)
           RETURNING site_id, module, is_enabled, content_types, asset_delivery, state"#,
    )
    .bind(&profile.module)
    .bind(profile.site_id.as_str())
    .bind(profile.is_enabled)
    .bind(&content_types)
    .bind(&asset_delivery)
    .bind(&state)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            StorageError::not_found("site", profile.site_id.as_str())
        } else if is_unique_violation(&e) {
            StorageError::already_exists("storage", profile.site_id.as_str())
        } else {
            to_storage_error(e, "Failed to create storage profile")
        }
    })?;

    row_to_profile(row)
}

/// Reads the storage profile of a site.
pub async fn get_by_site_id(
    pool: &PgPool,
    site_id: &SiteId,
) -> Result<Option<StorageProfile>, StorageError> {
    let row: Option<ProfileRow> = query_as(
        r#"SELECT site_id, module, is_enabled, content_types, asset_delivery, state
           FROM storage
           WHERE site_id = $1"#,
    )
    .bind(site_id.as_str())
    .fetch_optional(pool)
    .await
    .map_err(|e| to_storage_error(e, "Failed to read storage profile"))?;

    row.map(row_to_profile).transpose()
}

/// Deletes every profile row of a site.
pub async fn delete_by_site_id(pool: &PgPool, site_id: &SiteId) -> Result<u64, StorageError> {
    let result = query("DELETE FROM storage WHERE site_id = $1")
        .bind(site_id.as_str())
        .execute(pool)
        .await
        .map_err(|e| to_storage_error(e, "Failed to delete storage profile"))?;

    Ok(result.rows_affected())
}
