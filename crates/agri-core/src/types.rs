//! # Domain Types
//!
//! Core domain types used throughout Agri Station.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────────┐        ┌─────────────────────┐                │
//! │  │    FarmerRecord     │        │    FarmerPatch      │                │
//! │  │  ─────────────────  │        │  ─────────────────  │                │
//! │  │  id (business key)  │ apply  │  name?              │                │
//! │  │  name               │ ◄───── │  assigned_crops?    │                │
//! │  │  assigned_crops     │        │  last_updated?      │                │
//! │  │  last_updated       │        └─────────────────────┘                │
//! │  └──────────┬──────────┘                                                │
//! │             │ label::encode                                             │
//! │             ▼                                                           │
//! │  "AGRI-v1|F001|Jane Doe|Maize,Rice"                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Farmers are keyed by the operator-assigned identifier printed on the
//! label (e.g. `F001`). There is no separate surrogate key: the label must
//! be resolvable against the registry with nothing but what it carries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::{validate_farmer, ValidationResult};

// =============================================================================
// Farmer Record
// =============================================================================

/// A registered farmer.
///
/// ## Invariants
/// - `id` and `name` are non-empty
/// - `assigned_crops` has at least one entry, kept in the order entered,
///   duplicates preserved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmerRecord {
    /// Identifier printed on the label.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Crops assigned to this farmer.
    pub assigned_crops: Vec<String>,

    /// When the record was last written. Serialised as RFC 3339 / ISO-8601.
    pub last_updated: DateTime<Utc>,
}

impl FarmerRecord {
    /// Builds a validated record stamped with the current time.
    ///
    /// ## Example
    /// ```rust
    /// use agri_core::FarmerRecord;
    ///
    /// let farmer = FarmerRecord::new("F001", "Jane Doe", vec!["Maize".into()]).unwrap();
    /// assert_eq!(farmer.id, "F001");
    ///
    /// assert!(FarmerRecord::new("F002", "John", vec![]).is_err());
    /// ```
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        assigned_crops: Vec<String>,
    ) -> ValidationResult<Self> {
        let record = FarmerRecord {
            id: id.into().trim().to_string(),
            name: name.into().trim().to_string(),
            assigned_crops: assigned_crops
                .into_iter()
                .map(|crop| crop.trim().to_string())
                .collect(),
            last_updated: Utc::now(),
        };
        validate_farmer(&record)?;
        Ok(record)
    }

    /// Applies a partial update and re-validates the result.
    ///
    /// When the patch carries no timestamp, `last_updated` is set to `now`.
    /// On validation failure the record is left unchanged.
    pub fn apply(&mut self, patch: &FarmerPatch, now: DateTime<Utc>) -> ValidationResult<()> {
        let mut next = self.clone();

        if let Some(name) = &patch.name {
            next.name = name.trim().to_string();
        }
        if let Some(crops) = &patch.assigned_crops {
            next.assigned_crops = crops.iter().map(|c| c.trim().to_string()).collect();
        }
        next.last_updated = patch.last_updated.unwrap_or(now);

        validate_farmer(&next)?;
        *self = next;
        Ok(())
    }
}

// =============================================================================
// Farmer Patch
// =============================================================================

/// Fields to change on an existing farmer. `None` leaves a field untouched;
/// the identifier itself is immutable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmerPatch {
    pub name: Option<String>,
    pub assigned_crops: Option<Vec<String>>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl FarmerPatch {
    /// True when the patch would change nothing but the timestamp.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.assigned_crops.is_none() && self.last_updated.is_none()
    }
}
