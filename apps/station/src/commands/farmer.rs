//! # Farmer Commands
//!
//! Registry CRUD for the station.
//!
//! ## Registration Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  station register F001 "Jane Doe" --crop Maize,Rice                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  FarmerRecord::new ── trims, validates, stamps last_updated = now       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  FarmerRepository::create ── UNIQUE(id) ──► Conflict on duplicate       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  FarmerDto (camelCase JSON, or one table row)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use agri_core::{FarmerPatch, FarmerRecord, CROP_OPTIONS};

use crate::error::{ApiError, ApiResult};
use crate::state::DbState;

const UPDATE_NOTHING: &str = "Nothing to update: give --name, --crop or --last-updated";

/// Farmer as printed by the station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmerDto {
    pub id: String,
    pub name: String,
    pub assigned_crops: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

impl From<FarmerRecord> for FarmerDto {
    fn from(f: FarmerRecord) -> Self {
        FarmerDto {
            id: f.id,
            name: f.name,
            assigned_crops: f.assigned_crops,
            last_updated: f.last_updated,
        }
    }
}

impl fmt::Display for FarmerDto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<10} {:<24} {:<32} {}",
            self.id,
            self.name,
            self.assigned_crops.join(", "),
            self.last_updated.format("%Y-%m-%d %H:%M")
        )
    }
}

/// Registers a new farmer.
///
/// ## Errors
/// - `VALIDATION_ERROR` for empty fields or reserved characters
/// - `CONFLICT` when the identifier is taken
pub async fn register_farmer(
    db: &DbState,
    id: &str,
    name: &str,
    crops: Vec<String>,
) -> ApiResult<FarmerDto> {
    debug!(id = %id, "register_farmer command");

    let record = FarmerRecord::new(id, name, crops)?;
    let created = db.inner().farmers().create(&record).await?;

    info!(id = %created.id, crops = created.assigned_crops.len(), "Farmer registered");
    Ok(FarmerDto::from(created))
}

/// Lists every farmer in registration order.
pub async fn list_farmers(db: &DbState) -> ApiResult<Vec<FarmerDto>> {
    let farmers = db.inner().farmers().list().await?;
    debug!(count = farmers.len(), "list_farmers command");
    Ok(farmers.into_iter().map(FarmerDto::from).collect())
}

/// Gets one farmer.
pub async fn get_farmer(db: &DbState, id: &str) -> ApiResult<FarmerDto> {
    debug!(id = %id, "get_farmer command");
    db.inner()
        .farmers()
        .get_by_id(id)
        .await?
        .map(FarmerDto::from)
        .ok_or_else(|| ApiError::not_found("Farmer", id))
}

/// Changes the provided fields of a farmer. The identifier is immutable.
///
/// ## Errors
/// - `VALIDATION_ERROR` when the patch names no field
/// - `NOT_FOUND` for an unknown identifier
pub async fn update_farmer(db: &DbState, id: &str, patch: FarmerPatch) -> ApiResult<FarmerDto> {
    debug!(id = %id, ?patch, "update_farmer command");

    if patch.is_empty() {
        return Err(ApiError::validation(UPDATE_NOTHING));
    }

    let updated = db.inner().farmers().update(id, &patch).await?;
    info!(id = %updated.id, "Farmer updated");
    Ok(FarmerDto::from(updated))
}

/// Deletes a farmer and returns the removed record.
pub async fn delete_farmer(db: &DbState, id: &str) -> ApiResult<FarmerDto> {
    debug!(id = %id, "delete_farmer command");
    let deleted = db.inner().farmers().delete(id).await?;
    info!(id = %deleted.id, "Farmer deleted");
    Ok(FarmerDto::from(deleted))
}

/// Crops offered at registration.
pub fn crop_options() -> Vec<&'static str> {
    CROP_OPTIONS.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use chrono::TimeZone;

    fn crops(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_register_and_list() {
        let db = DbState::in_memory().await;

        let jane = register_farmer(&db, " F001 ", "Jane Doe", crops(&["Maize", "Rice"]))
            .await
            .unwrap();
        register_farmer(&db, "F002", "Amina", crops(&["Cassava"]))
            .await
            .unwrap();

        assert_eq!(jane.id, "F001");
        let listed = list_farmers(&db).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["F001", "F002"]);
        assert_eq!(listed[0].assigned_crops, ["Maize", "Rice"]);
    }

    #[tokio::test]
    async fn test_register_duplicate_is_conflict() {
        let db = DbState::in_memory().await;
        register_farmer(&db, "F001", "Jane", crops(&["Maize"]))
            .await
            .unwrap();

        let err = register_farmer(&db, "F001", "Other", crops(&["Rice"]))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn test_register_validation_messages() {
        let db = DbState::in_memory().await;

        let err = register_farmer(&db, "", "Jane", crops(&["Maize"]))
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::validation("ID is required"));

        let err = register_farmer(&db, "F1", "Jane", vec![]).await.unwrap_err();
        assert_eq!(err, ApiError::validation("At least one crop is required"));

        let err = register_farmer(&db, "F1", "Jane|Doe", crops(&["Maize"]))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_update_changes_only_given_fields() {
        let db = DbState::in_memory().await;
        register_farmer(&db, "F001", "Jane", crops(&["Maize"]))
            .await
            .unwrap();
        let stamp = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

        let updated = update_farmer(
            &db,
            "F001",
            FarmerPatch {
                assigned_crops: Some(crops(&["Wheat", "Wheat"])),
                last_updated: Some(stamp),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.name, "Jane");
        assert_eq!(updated.assigned_crops, ["Wheat", "Wheat"]);
        assert_eq!(updated.last_updated, stamp);
        assert_eq!(get_farmer(&db, "F001").await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_missing_farmer_is_not_found() {
        let db = DbState::in_memory().await;

        let patch = FarmerPatch {
            name: Some("Ghost".into()),
            ..Default::default()
        };
        let err = update_farmer(&db, "F404", patch).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        assert_eq!(
            delete_farmer(&db, "F404").await.unwrap_err().code,
            ErrorCode::NotFound
        );
        assert_eq!(
            get_farmer(&db, "F404").await.unwrap_err(),
            ApiError::not_found("Farmer", "F404")
        );
    }

    #[tokio::test]
    async fn test_update_without_fields_is_rejected() {
        let db = DbState::in_memory().await;
        let jane = register_farmer(&db, "F001", "Jane", crops(&["Maize"]))
            .await
            .unwrap();

        let err = update_farmer(&db, "F001", FarmerPatch::default())
            .await
            .unwrap_err();

        assert_eq!(err, ApiError::validation(UPDATE_NOTHING));
        assert_eq!(get_farmer(&db, "F001").await.unwrap(), jane);
    }

    #[tokio::test]
    async fn test_delete_returns_record() {
        let db = DbState::in_memory().await;
        let jane = register_farmer(&db, "F001", "Jane", crops(&["Maize"]))
            .await
            .unwrap();

        assert_eq!(delete_farmer(&db, "F001").await.unwrap(), jane);
        assert!(list_farmers(&db).await.unwrap().is_empty());
    }

    #[test]
    fn test_crop_options() {
        let options = crop_options();
        assert_eq!(options.len(), 8);
        assert_eq!(options[0], "Maize");
    }
}
