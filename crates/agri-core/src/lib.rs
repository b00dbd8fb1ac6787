//! # agri-core: Pure Domain Logic for Agri Station
//!
//! Farmer records, their validation rules, and the QR label codec. Everything
//! here is a pure function over plain data; persistence lives in `agri-db`
//! and the camera lifecycle in `agri-scan`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Agri Station Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    station (CLI shell)                          │   │
//! │  │   register ─► list ─► label/print ─► scan ─► verify             │   │
//! │  └──────────────┬──────────────────────────────┬───────────────────┘   │
//! │                 │                              │                        │
//! │  ┌──────────────▼──────────────┐  ┌────────────▼──────────────────┐    │
//! │  │  agri-db (FarmerRepository) │  │  agri-scan (ScanSession)      │    │
//! │  └──────────────┬──────────────┘  └────────────┬──────────────────┘    │
//! │                 │                              │                        │
//! │  ┌──────────────▼──────────────────────────────▼──────────────────┐    │
//! │  │               ★ agri-core (THIS CRATE) ★                       │    │
//! │  │   ┌───────────┐   ┌───────────┐   ┌────────────┐               │    │
//! │  │   │   types   │   │   label   │   │ validation │               │    │
//! │  │   │  Farmer   │   │  encode   │   │   rules    │               │    │
//! │  │   │  Patch    │   │  decode   │   │            │               │    │
//! │  │   └───────────┘   └───────────┘   └────────────┘               │    │
//! │  │   NO I/O • NO DATABASE • NO DEVICES • PURE FUNCTIONS           │    │
//! │  └────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (FarmerRecord, FarmerPatch)
//! - [`label`] - `AGRI-v1` label payload encode/decode
//! - [`validation`] - Registration field rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use agri_core::label;
//!
//! let parsed = label::decode("AGRI-v1|F001|Jane Doe|Maize,Rice").unwrap();
//! assert_eq!(parsed.id, "F001");
//! assert_eq!(parsed.crops, vec!["Maize", "Rice"]);
//! ```

pub mod error;
pub mod label;
pub mod types;
pub mod validation;

pub use error::{CoreError, LabelError, ValidationError};
pub use label::ParsedRecord;
pub use types::*;

/// Crops offered by the registration form.
///
/// Suggestions only: neither registration nor label decoding rejects a crop
/// outside this list.
pub const CROP_OPTIONS: [&str; 8] = [
    "Maize", "Rice", "Wheat", "Soybeans", "Cotton", "Potatoes", "Tomatoes", "Onions",
];

/// Maximum length of a farmer identifier.
pub const MAX_ID_LEN: usize = 50;

/// Maximum length of a farmer display name.
pub const MAX_NAME_LEN: usize = 200;
