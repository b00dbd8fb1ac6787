//! # Farmer Repository
//!
//! Database operations for registered farmers.
//!
//! ## Storage Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  FarmerRecord                         farmers (SQLite)                  │
//! │  ────────────                         ────────────────                  │
//! │  id             ───────────────────►  id             TEXT PK           │
//! │  name           ───────────────────►  name           TEXT              │
//! │  assigned_crops ── serde_json ─────►  assigned_crops TEXT '["Maize"]'  │
//! │  last_updated   ── RFC 3339 ───────►  last_updated   TEXT              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Listing order is registration order (rowid).

use agri_core::validation::validate_farmer;
use agri_core::{FarmerPatch, FarmerRecord};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

const ENTITY: &str = "Farmer";

/// Row shape of the `farmers` table.
#[derive(Debug, sqlx::FromRow)]
struct FarmerRow {
    id: String,
    name: String,
    assigned_crops: String,
    last_updated: DateTime<Utc>,
}

impl TryFrom<FarmerRow> for FarmerRecord {
    type Error = DbError;

    fn try_from(row: FarmerRow) -> DbResult<Self> {
        let assigned_crops: Vec<String> = serde_json::from_str(&row.assigned_crops)
            .map_err(|e| DbError::corrupt(ENTITY, &row.id, e))?;

        Ok(FarmerRecord {
            id: row.id,
            name: row.name,
            assigned_crops,
            last_updated: row.last_updated,
        })
    }
}

fn encode_crops(record: &FarmerRecord) -> DbResult<String> {
    serde_json::to_string(&record.assigned_crops).map_err(|e| DbError::Internal(e.to_string()))
}

/// Repository for farmer database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = FarmerRepository::new(pool);
///
/// let farmer = FarmerRecord::new("F001", "Jane Doe", vec!["Maize".into()])?;
/// repo.create(&farmer).await?;
///
/// let all = repo.list().await?;
/// ```
#[derive(Debug, Clone)]
pub struct FarmerRepository {
    pool: SqlitePool,
}

impl FarmerRepository {
    /// Creates a new FarmerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        FarmerRepository { pool }
    }

    /// Lists every registered farmer in registration order.
    pub async fn list(&self) -> DbResult<Vec<FarmerRecord>> {
        let rows = sqlx::query_as::<_, FarmerRow>(
            r#"
            SELECT id, name, assigned_crops, last_updated
            FROM farmers
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Listed farmers");
        rows.into_iter().map(FarmerRecord::try_from).collect()
    }

    /// Gets a farmer by identifier.
    ///
    /// ## Returns
    /// * `Ok(Some(FarmerRecord))` - Farmer found
    /// * `Ok(None)` - No farmer under this identifier
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<FarmerRecord>> {
        let row = sqlx::query_as::<_, FarmerRow>(
            r#"
            SELECT id, name, assigned_crops, last_updated
            FROM farmers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FarmerRecord::try_from).transpose()
    }

    /// Registers a new farmer.
    ///
    /// ## Returns
    /// * `Ok(FarmerRecord)` - The stored record
    /// * `Err(DbError::UniqueViolation)` - Identifier already registered
    /// * `Err(DbError::Invalid)` - Record fails registration rules
    pub async fn create(&self, record: &FarmerRecord) -> DbResult<FarmerRecord> {
        validate_farmer(record)?;
        debug!(id = %record.id, "Registering farmer");

        let crops = encode_crops(record)?;

        sqlx::query(
            r#"
            INSERT INTO farmers (id, name, assigned_crops, last_updated)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&crops)
        .bind(record.last_updated)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &record.id),
            other => other,
        })?;

        info!(id = %record.id, crops = record.assigned_crops.len(), "Farmer registered");
        Ok(record.clone())
    }

    /// Applies a partial update to an existing farmer.
    ///
    /// Read, patch and write happen in one transaction. `last_updated` is
    /// refreshed to now unless the patch carries a timestamp.
    ///
    /// ## Returns
    /// * `Ok(FarmerRecord)` - The record as stored after the update
    /// * `Err(DbError::NotFound)` - No farmer under this identifier
    pub async fn update(&self, id: &str, patch: &FarmerPatch) -> DbResult<FarmerRecord> {
        debug!(id = %id, "Updating farmer");

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, FarmerRow>(
            r#"
            SELECT id, name, assigned_crops, last_updated
            FROM farmers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        let mut record = FarmerRecord::try_from(row)?;
        record.apply(patch, Utc::now())?;
        let crops = encode_crops(&record)?;

        sqlx::query(
            r#"
            UPDATE farmers SET
                name = ?2,
                assigned_crops = ?3,
                last_updated = ?4
            WHERE id = ?1
            "#,
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&crops)
        .bind(record.last_updated)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %record.id, "Farmer updated");
        Ok(record)
    }

    /// Deletes a farmer.
    ///
    /// ## Returns
    /// * `Ok(FarmerRecord)` - The record that was removed
    /// * `Err(DbError::NotFound)` - No farmer under this identifier
    pub async fn delete(&self, id: &str) -> DbResult<FarmerRecord> {
        debug!(id = %id, "Deleting farmer");

        let row = sqlx::query_as::<_, FarmerRow>(
            r#"
            DELETE FROM farmers
            WHERE id = ?1
            RETURNING id, name, assigned_crops, last_updated
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        info!(id = %id, "Farmer deleted");
        FarmerRecord::try_from(row)
    }

    /// Counts registered farmers (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM farmers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::TimeZone;

    async fn repo() -> FarmerRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().farmers()
    }

    fn farmer(id: &str, name: &str, crops: &[&str]) -> FarmerRecord {
        FarmerRecord::new(id, name, crops.iter().map(|c| c.to_string()).collect()).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = repo().await;
        let jane = farmer("F001", "Jane Doe", &["Maize", "Rice"]);

        repo.create(&jane).await.unwrap();

        let stored = repo.get_by_id("F001").await.unwrap().unwrap();
        assert_eq!(stored.name, "Jane Doe");
        assert_eq!(stored.assigned_crops, vec!["Maize", "Rice"]);
        assert_eq!(stored.last_updated, jane.last_updated);

        assert!(repo.get_by_id("F404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_in_registration_order() {
        let repo = repo().await;
        for (id, name) in [("F003", "Chidi"), ("F001", "Amina"), ("F002", "Baraka")] {
            repo.create(&farmer(id, name, &["Wheat"])).await.unwrap();
        }

        let ids: Vec<String> = repo.list().await.unwrap().into_iter().map(|f| f.id).collect();
        assert_eq!(ids, vec!["F003", "F001", "F002"]);
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_create_duplicate_id_conflicts() {
        let repo = repo().await;
        repo.create(&farmer("F001", "Jane", &["Maize"])).await.unwrap();

        let err = repo
            .create(&farmer("F001", "Someone Else", &["Rice"]))
            .await
            .unwrap_err();

        match err {
            DbError::UniqueViolation { value, .. } => assert_eq!(value, "F001"),
            other => panic!("expected UniqueViolation, got {other:?}"),
        }
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_record() {
        let repo = repo().await;
        let mut bad = farmer("F001", "Jane", &["Maize"]);
        bad.assigned_crops.clear();

        assert!(matches!(repo.create(&bad).await, Err(DbError::Invalid(_))));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_partial() {
        let repo = repo().await;
        repo.create(&farmer("F001", "Jane Doe", &["Maize", "Rice"]))
            .await
            .unwrap();

        let patch = FarmerPatch {
            name: Some("Jane Smith".into()),
            ..Default::default()
        };
        let updated = repo.update("F001", &patch).await.unwrap();

        assert_eq!(updated.name, "Jane Smith");
        assert_eq!(updated.assigned_crops, vec!["Maize", "Rice"]);
        assert_eq!(repo.get_by_id("F001").await.unwrap().unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_with_explicit_timestamp() {
        let repo = repo().await;
        repo.create(&farmer("F001", "Jane", &["Maize"])).await.unwrap();

        let stamp = Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap();
        let patch = FarmerPatch {
            assigned_crops: Some(vec!["Cotton".into()]),
            last_updated: Some(stamp),
            ..Default::default()
        };
        repo.update("F001", &patch).await.unwrap();

        let stored = repo.get_by_id("F001").await.unwrap().unwrap();
        assert_eq!(stored.assigned_crops, vec!["Cotton"]);
        assert_eq!(stored.last_updated, stamp);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let repo = repo().await;

        let err = repo
            .update("F404", &FarmerPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { id, .. } if id == "F404"));
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_patch() {
        let repo = repo().await;
        repo.create(&farmer("F001", "Jane", &["Maize"])).await.unwrap();

        let patch = FarmerPatch {
            name: Some("Jane|Doe".into()),
            ..Default::default()
        };
        assert!(matches!(
            repo.update("F001", &patch).await,
            Err(DbError::Invalid(_))
        ));
        assert_eq!(repo.get_by_id("F001").await.unwrap().unwrap().name, "Jane");
    }

    #[tokio::test]
    async fn test_delete_returns_record() {
        let repo = repo().await;
        let jane = farmer("F001", "Jane", &["Maize"]);
        repo.create(&jane).await.unwrap();

        let deleted = repo.delete("F001").await.unwrap();
        assert_eq!(deleted, jane);
        assert!(repo.get_by_id("F001").await.unwrap().is_none());

        assert!(matches!(
            repo.delete("F001").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_corrupt_crops_column() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query(
            "INSERT INTO farmers (id, name, assigned_crops, last_updated) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind("F009")
        .bind("Broken")
        .bind("Maize,Rice")
        .bind(Utc::now())
        .execute(db.pool())
        .await
        .unwrap();

        let err = db.farmers().get_by_id("F009").await.unwrap_err();
        assert!(matches!(err, DbError::CorruptRow { id, .. } if id == "F009"));
    }
}
