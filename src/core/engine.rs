//! Ordering decision engine
//!
//! This module provides the per-record apply/reject state machine at the
//! heart of the importer. Given the persisted state of one donor and one
//! incoming command, [`decide`] determines whether the command may be
//! applied, and with what downstream effect.
//!
//! The decision is a pure function of `(persisted state, command, T)`, where
//! `T` is the batch's declared upload timestamp and `L` is the record's
//! last-applied timestamp. Physical arrival order plays no part, so repeated
//! or reordered delivery converges to the same terminal state: a per-donor
//! last-writer-wins register gated by change-type-specific existence rules.
//!
//! # State machine
//!
//! | Current state | Command            | Outcome                                  |
//! |---------------|--------------------|------------------------------------------|
//! | NotExists     | Create / Upsert    | apply as create, ts = T                  |
//! | NotExists     | Edit               | reject `EditOfMissingDonor`              |
//! | NotExists     | Delete             | silent no-op                             |
//! | Exists(L)     | Create             | reject `CreateOfExisting` (any T)        |
//! | Exists(L)     | Edit/Upsert, T ≥ L | apply, ts = T                            |
//! | Exists(L)     | Delete, T ≥ L      | apply removal                            |
//! | Exists(L)     | any of ↑, T < L    | reject `StaleUpdate`                     |
//!
//! An applied edit whose payload equals the stored payload byte-for-byte is
//! flagged as a content no-op: the timestamp still advances, but the
//! downstream publish is suppressed.

use chrono::{DateTime, Utc};

use crate::types::{ChangeType, DonorRecord, DonorUpdateCommand, RejectionReason};

/// Outcome of evaluating one command against one donor's persisted state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Register a new donor record with the batch's timestamp
    Create,

    /// Replace the payload of the existing record and advance its timestamp
    ///
    /// `content_changed` is false when the incoming payload is byte-for-byte
    /// identical to the stored one; the write still happens (the timestamp
    /// advances) but no downstream publish is produced.
    Update { content_changed: bool },

    /// Remove the existing record
    Remove,

    /// Delete of a missing donor: no mutation, no alert, no publish
    Skip,

    /// The command may not be applied; the record is left untouched
    Reject(RejectionReason),
}

impl Decision {
    /// Whether this decision mutates the store
    pub fn is_apply(&self) -> bool {
        matches!(
            self,
            Decision::Create | Decision::Update { .. } | Decision::Remove
        )
    }
}

/// Decide whether `command` may be applied to `existing` state
///
/// `uploaded_at` is the declared upload timestamp of the batch carrying the
/// command. Equal timestamps apply: an equal-timestamp redelivery converges
/// through the content-no-op rule instead of raising a stale alert.
pub fn decide(
    existing: Option<&DonorRecord>,
    command: &DonorUpdateCommand,
    uploaded_at: DateTime<Utc>,
) -> Decision {
    match (existing, command.change_type) {
        (None, ChangeType::Create | ChangeType::Upsert) => Decision::Create,
        (None, ChangeType::Edit) => Decision::Reject(RejectionReason::EditOfMissingDonor),
        (None, ChangeType::Delete) => Decision::Skip,
        (Some(_), ChangeType::Create) => Decision::Reject(RejectionReason::CreateOfExisting),
        (Some(record), ChangeType::Edit | ChangeType::Upsert | ChangeType::Delete) => {
            if uploaded_at < record.last_applied_timestamp {
                return Decision::Reject(RejectionReason::StaleUpdate {
                    incoming: uploaded_at,
                    applied: record.last_applied_timestamp,
                });
            }
            if command.change_type == ChangeType::Delete {
                Decision::Remove
            } else {
                Decision::Update {
                    content_changed: command.hla != record.hla,
                }
            }
        }
    }
}
