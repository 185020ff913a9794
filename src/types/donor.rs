//! Donor record types for the donor import engine
//!
//! This module defines the persisted shape of a registered donor, the
//! per-locus HLA typing payload, and the searchable snapshot published to
//! downstream consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Internal donor identifier
///
/// Minted exactly once, at first creation of a donor record. Monotonically
/// increasing and never reused, even when a donor is deleted and later
/// recreated.
pub type InternalDonorId = u64;

/// HLA loci carried in the searchable typing payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Locus {
    A,
    B,
    C,
    Dpb1,
    Dqb1,
    Drb1,
}

impl fmt::Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Locus::A => "A",
            Locus::B => "B",
            Locus::C => "C",
            Locus::Dpb1 => "DPB1",
            Locus::Dqb1 => "DQB1",
            Locus::Drb1 => "DRB1",
        };
        f.write_str(name)
    }
}

/// Typing strings for the two positions of one locus
///
/// The strings are opaque to this engine; structural interpretation belongs
/// to the external typing validator and the matching engine downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocusTyping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_one: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_two: Option<String>,
}

/// Per-locus HLA typing payload
///
/// Equality is exact string equality per locus and position, which is what
/// makes the content-no-op rule a byte-for-byte comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HlaPayload(BTreeMap<Locus, LocusTyping>);

impl HlaPayload {
    /// Create an empty payload (the wire default for deletes)
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper used to assemble payloads in code
    pub fn with_typing(mut self, locus: Locus, position_one: &str, position_two: &str) -> Self {
        self.0.insert(
            locus,
            LocusTyping {
                position_one: Some(position_one.to_string()),
                position_two: Some(position_two.to_string()),
            },
        );
        self
    }

    /// Typing for one locus, if present
    pub fn typing(&self, locus: Locus) -> Option<&LocusTyping> {
        self.0.get(&locus)
    }

    /// Whether both positions of the locus carry a non-empty typing string
    pub fn has_complete_typing(&self, locus: Locus) -> bool {
        self.0.get(&locus).is_some_and(|typing| {
            let filled = |position: &Option<String>| {
                position.as_deref().is_some_and(|value| !value.trim().is_empty())
            };
            filled(&typing.position_one) && filled(&typing.position_two)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Current persisted state of one registered donor
///
/// Existence is represented by presence in the donor store; there is no
/// retained history beyond this struct and its last-applied timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorRecord {
    /// Identifier assigned by this system at first creation; immutable
    pub internal_id: InternalDonorId,

    /// Donor identifier assigned by the originating registry
    pub external_code: String,

    /// Current searchable typing payload
    pub hla: HlaPayload,

    /// Upload timestamp of the batch that last mutated this record
    ///
    /// The sole version token: it only moves forward, and no command from a
    /// batch declaring an older timestamp may mutate the record.
    pub last_applied_timestamp: DateTime<Utc>,

    /// Location of the file that last mutated this record (diagnostic)
    pub source_file_location: String,
}

/// Searchable snapshot published to the downstream search-index consumer
///
/// A `None` payload marks a deletion tombstone.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorSearchUpdate {
    pub internal_id: InternalDonorId,
    pub external_code: String,
    pub hla: Option<HlaPayload>,
}

impl DonorSearchUpdate {
    /// Snapshot of a live record
    pub fn snapshot(record: &DonorRecord) -> Self {
        DonorSearchUpdate {
            internal_id: record.internal_id,
            external_code: record.external_code.clone(),
            hla: Some(record.hla.clone()),
        }
    }

    /// Tombstone for a removed record
    pub fn tombstone(internal_id: InternalDonorId, external_code: String) -> Self {
        DonorSearchUpdate {
            internal_id,
            external_code,
            hla: None,
        }
    }

    /// Whether this update marks a deletion
    pub fn is_tombstone(&self) -> bool {
        self.hla.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_equality_is_exact() {
        let left = HlaPayload::new().with_typing(Locus::A, "*01:01", "*02:01");
        let right = HlaPayload::new().with_typing(Locus::A, "*01:01", "*02:01");
        assert_eq!(left, right);

        let different = HlaPayload::new().with_typing(Locus::A, "*01:01", "*02:01N");
        assert_ne!(left, different);
    }

    #[test]
    fn test_payload_equality_is_locus_sensitive() {
        let a = HlaPayload::new().with_typing(Locus::A, "*01:01", "*02:01");
        let b = HlaPayload::new().with_typing(Locus::B, "*01:01", "*02:01");
        assert_ne!(a, b);
    }

    #[test]
    fn test_has_complete_typing_requires_both_positions() {
        let payload = HlaPayload::new().with_typing(Locus::A, "*01:01", "*02:01");
        assert!(payload.has_complete_typing(Locus::A));
        assert!(!payload.has_complete_typing(Locus::B));

        let partial = HlaPayload(
            [(
                Locus::A,
                LocusTyping {
                    position_one: Some("*01:01".to_string()),
                    position_two: None,
                },
            )]
            .into_iter()
            .collect(),
        );
        assert!(!partial.has_complete_typing(Locus::A));
    }

    #[test]
    fn test_has_complete_typing_rejects_blank_strings() {
        let blank = HlaPayload(
            [(
                Locus::Drb1,
                LocusTyping {
                    position_one: Some("  ".to_string()),
                    position_two: Some("*15:01".to_string()),
                },
            )]
            .into_iter()
            .collect(),
        );
        assert!(!blank.has_complete_typing(Locus::Drb1));
    }

    #[test]
    fn test_locus_serializes_to_uppercase_names() {
        assert_eq!(serde_json::to_string(&Locus::Dpb1).unwrap(), r#""DPB1""#);
        assert_eq!(serde_json::to_string(&Locus::A).unwrap(), r#""A""#);
    }

    #[test]
    fn test_search_update_snapshot_and_tombstone() {
        let record = DonorRecord {
            internal_id: 7,
            external_code: "D0007".to_string(),
            hla: HlaPayload::new().with_typing(Locus::A, "*01:01", "*02:01"),
            last_applied_timestamp: chrono::Utc::now(),
            source_file_location: "registry/file.json".to_string(),
        };

        let snapshot = DonorSearchUpdate::snapshot(&record);
        assert_eq!(snapshot.internal_id, 7);
        assert!(!snapshot.is_tombstone());
        assert_eq!(snapshot.hla.as_ref(), Some(&record.hla));

        let tombstone = DonorSearchUpdate::tombstone(7, "D0007".to_string());
        assert!(tombstone.is_tombstone());
    }
}
