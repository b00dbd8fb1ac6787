//! # Label Codec
//!
//! Text payload packed into a farmer's QR label, and its parser.
//!
//! ## Wire Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  AGRI-v1 | F001 | Jane Doe | Maize,Rice                                │
//! │  ───┬───   ──┬─   ────┬───   ─────┬────                                │
//! │     │        │        │           └── crops, comma-joined              │
//! │     │        │        └── display name                                 │
//! │     │        └── identifier                                            │
//! │     └── version tag (literal)                                          │
//! │                                                                         │
//! │  Delimiter: '|'   No escaping, no checksum.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The format is flat so an operator can read raw QR content while debugging.
//! It is not forward-compatible beyond the literal tag check: any payload
//! that starts with `AGRI-v1` is parsed as a v1 label.

use serde::{Deserialize, Serialize};

use crate::error::{LabelError, LabelResult};
use crate::types::FarmerRecord;

/// Version tag every label starts with.
pub const LABEL_VERSION: &str = "AGRI-v1";

/// Separator between label fields.
pub const FIELD_DELIMITER: char = '|';

/// Separator between crops in the last field.
pub const CROP_SEPARATOR: char = ',';

/// A label decoded from scanned text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedRecord {
    /// First segment as scanned (starts with [`LABEL_VERSION`]).
    pub version: String,
    pub id: String,
    pub name: String,
    pub crops: Vec<String>,
}

impl ParsedRecord {
    /// True when the label carries exactly what the registry holds for this
    /// farmer (id, name and crop list in order).
    pub fn matches(&self, record: &FarmerRecord) -> bool {
        self.id == record.id && self.name == record.name && self.crops == record.assigned_crops
    }
}

/// Encodes a farmer into its label payload.
///
/// ## Example
/// ```rust
/// use agri_core::{label, FarmerRecord};
///
/// let farmer = FarmerRecord::new("F001", "Jane Doe", vec!["Maize".into(), "Rice".into()]).unwrap();
/// assert_eq!(label::encode(&farmer), "AGRI-v1|F001|Jane Doe|Maize,Rice");
/// ```
pub fn encode(record: &FarmerRecord) -> String {
    let crops = record.assigned_crops.join(&CROP_SEPARATOR.to_string());
    format!(
        "{LABEL_VERSION}{d}{}{d}{}{d}{crops}",
        record.id,
        record.name,
        d = FIELD_DELIMITER
    )
}

/// Parses scanned text into a [`ParsedRecord`].
///
/// ## Rules
/// 1. Must start with `AGRI-v1`, else [`LabelError::InvalidFormat`]
/// 2. Must split into at least 4 fields on `|`, else
///    [`LabelError::IncompleteData`]. Fields past the fourth are ignored.
/// 3. The fourth field is split on `,`; an empty fourth field yields a
///    single empty crop.
///
/// No check is made against the crop vocabulary.
pub fn decode(raw: &str) -> LabelResult<ParsedRecord> {
    if !raw.starts_with(LABEL_VERSION) {
        return Err(LabelError::InvalidFormat);
    }

    let fields: Vec<&str> = raw.split(FIELD_DELIMITER).collect();
    let [version, id, name, crops, ..] = fields.as_slice() else {
        return Err(LabelError::IncompleteData {
            segments: fields.len(),
        });
    };

    Ok(ParsedRecord {
        version: (*version).to_string(),
        id: (*id).to_string(),
        name: (*name).to_string(),
        crops: crops.split(CROP_SEPARATOR).map(str::to_string).collect(),
    })
}

/// Parses a raw QR byte payload.
///
/// Symbols carry bytes; a payload that is not UTF-8 fails with
/// [`LabelError::ParseFailure`] instead of being lossily converted.
pub fn decode_bytes(raw: &[u8]) -> LabelResult<ParsedRecord> {
    let text = std::str::from_utf8(raw).map_err(|e| LabelError::ParseFailure(e.to_string()))?;
    decode(text)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn farmer(id: &str, name: &str, crops: &[&str]) -> FarmerRecord {
        FarmerRecord::new(id, name, crops.iter().map(|c| c.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_encode_format() {
        let f = farmer("F001", "Jane Doe", &["Maize", "Rice"]);
        assert_eq!(encode(&f), "AGRI-v1|F001|Jane Doe|Maize,Rice");

        let single = farmer("F002", "John", &["Wheat"]);
        assert_eq!(encode(&single), "AGRI-v1|F002|John|Wheat");
    }

    #[test]
    fn test_decode_valid_label() {
        let parsed = decode("AGRI-v1|F1|Jane|Maize,Rice").unwrap();
        assert_eq!(parsed.version, "AGRI-v1");
        assert_eq!(parsed.id, "F1");
        assert_eq!(parsed.name, "Jane");
        assert_eq!(parsed.crops, vec!["Maize", "Rice"]);
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let records = [
            farmer("F001", "Jane Doe", &["Maize", "Rice"]),
            farmer("KE-0042", "Wanjiru, Mary", &["Tomatoes", "Tomatoes", "Onions"]),
            farmer("Ω7", "Zoë Ångström", &["Cassava"]),
        ];

        for record in &records {
            let parsed = decode(&encode(record)).unwrap();
            assert!(parsed.matches(record), "round trip failed for {}", record.id);
        }
    }

    #[test]
    fn test_decode_rejects_missing_version_tag() {
        for raw in ["", "F1|Jane|Maize", "agri-v1|F1|Jane|Maize", " AGRI-v1|F1|Jane|Maize", "https://example.com"] {
            assert_eq!(decode(raw), Err(LabelError::InvalidFormat), "input: {raw:?}");
        }
    }

    #[test]
    fn test_decode_rejects_incomplete_data() {
        assert_eq!(
            decode("AGRI-v1|F1|Jane"),
            Err(LabelError::IncompleteData { segments: 3 })
        );
        assert_eq!(
            decode("AGRI-v1"),
            Err(LabelError::IncompleteData { segments: 1 })
        );
    }

    #[test]
    fn test_decode_drops_extra_segments() {
        let parsed = decode("AGRI-v1|F1|Jane|Maize|unexpected|more").unwrap();
        assert_eq!(parsed.crops, vec!["Maize"]);
    }

    #[test]
    fn test_decode_empty_crop_segment_yields_one_empty_crop() {
        let parsed = decode("AGRI-v1|F1|Jane|").unwrap();
        assert_eq!(parsed.crops, vec![""]);
    }

    #[test]
    fn test_decode_keeps_tag_suffix_as_version() {
        // Only the prefix is checked
        let parsed = decode("AGRI-v10|F1|Jane|Maize").unwrap();
        assert_eq!(parsed.version, "AGRI-v10");
    }

    #[test]
    fn test_decode_bytes() {
        assert!(decode_bytes(b"AGRI-v1|F1|Jane|Maize").is_ok());
        assert!(matches!(
            decode_bytes(&[0x41, 0x47, 0xff, 0xfe]),
            Err(LabelError::ParseFailure(_))
        ));
    }

    #[test]
    fn test_matches_detects_changed_fields() {
        let record = farmer("F1", "Jane", &["Maize", "Rice"]);
        let reordered = decode("AGRI-v1|F1|Jane|Rice,Maize").unwrap();
        assert!(!reordered.matches(&record));
    }
}
