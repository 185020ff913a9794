//! Import batch types for the donor import engine
//!
//! This module defines the wire shape of one delivered unit of donor change
//! data: the batch envelope with its declared upload timestamp and delivery
//! identity, and the per-donor update commands it carries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::donor::HlaPayload;

/// Kinds of change a registry can request for a single donor
///
/// Each variant is gated differently by the ordering engine: creates are
/// rejected against existing records, edits are rejected against missing
/// ones, deletes of missing records are silent no-ops, and upserts take
/// whichever path matches the record's current existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    /// Register a donor that must not already exist
    Create,

    /// Mutate a donor that must already exist
    Edit,

    /// Remove a donor; removing an absent donor is not an error
    Delete,

    /// Create-or-edit depending on whether the donor currently exists
    Upsert,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeType::Create => "Create",
            ChangeType::Edit => "Edit",
            ChangeType::Delete => "Delete",
            ChangeType::Upsert => "Upsert",
        };
        f.write_str(name)
    }
}

/// Declared scope of an import file
///
/// Only differential files flow through this engine; a full-registry refresh
/// is a separate pipeline and is refused as a whole-batch conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateMode {
    Differential,
    Full,
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpdateMode::Differential => "Differential",
            UpdateMode::Full => "Full",
        };
        f.write_str(name)
    }
}

/// One donor's requested change within a batch
///
/// The HLA payload is treated as opaque by the ordering engine beyond the
/// valid/invalid classification from the typing validator and byte-for-byte
/// equality against the stored payload. Delete commands carry no payload on
/// the wire, so `hla` defaults to empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorUpdateCommand {
    /// External donor code assigned by the originating registry
    pub record_id: String,

    /// The kind of change requested for this donor
    pub change_type: ChangeType,

    /// Per-locus typing payload; empty for deletes
    #[serde(default)]
    pub hla: HlaPayload,
}

/// One delivered unit of donor change data
///
/// The upload timestamp is the logical ordering key declared by the registry,
/// not the receipt time; the message id is the delivery identity used to tell
/// a safe redelivery apart from an accidental resubmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch {
    /// Storage location of the source file; the batch's business identity
    pub file_location: String,

    /// Logical ordering key declared by the uploading registry
    pub upload_timestamp: DateTime<Utc>,

    /// Queue delivery identity, stable across redeliveries of one attempt
    pub message_id: String,

    /// Declared scope of the file (differential or full refresh)
    pub update_mode: UpdateMode,

    /// Per-donor update commands, in file order
    pub commands: Vec<DonorUpdateCommand>,
}
