//! Collaborator traits for validation, alerting, and downstream publishing
//!
//! This module defines the seams to the external systems the importer
//! consumes: the structural typing validator, the operational alert channel,
//! and the messaging client that feeds the downstream search index.
//! Production wiring plugs in real transports; tests plug in recorders.

use crate::types::{
    ChangeType, DonorSearchUpdate, DonorUpdateCommand, ImportError, PublishError, RejectionReason,
};

/// Structural classification of one command's typing payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypingOutcome {
    /// The payload is structurally acceptable for ordering
    Valid,

    /// The payload is structurally defective
    ///
    /// Invalid commands are written to the failure log and excluded from
    /// ordering; they are never alerted and never abort the batch.
    Invalid { reason: String },
}

/// Classifies each raw update as structurally valid or invalid before it
/// reaches the ordering engine
pub trait TypingValidator {
    fn validate(&self, command: &DonorUpdateCommand) -> TypingOutcome;
}

/// Operational alert for one rejected command
///
/// Alerts are observability, not correctness: they surface expected races
/// (stale replays, duplicate creates) to operators without failing the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportAlert {
    /// External donor code of the rejected command
    pub record_id: String,

    /// File whose batch carried the rejected command
    pub file_location: String,

    /// The kind of change that was rejected
    pub change_type: ChangeType,

    /// Why the ordering engine refused the command
    pub reason: RejectionReason,
}

/// Best-effort operational alert channel
///
/// Fire-and-forget: implementations swallow their own delivery failures.
pub trait NotificationSender {
    fn send_alert(&self, alert: &ImportAlert);
}

/// Destination for structurally invalid commands
///
/// Keyed by `(fileLocation, recordId, reason)`. Failures recorded here are
/// excluded from ordering and never alerted; a sink write error is an
/// infrastructure failure and aborts the batch before any mutation.
pub trait ValidationFailureSink {
    fn record(
        &self,
        file_location: &str,
        record_id: &str,
        reason: &str,
    ) -> Result<(), ImportError>;
}

/// At-least-once publisher feeding the downstream search-index consumer
///
/// Invoked strictly after the store transaction commits; a returned error is
/// logged by the caller and never rolls back the commit (the transport's own
/// retry policy owns redelivery).
pub trait MessagingClient {
    /// Publish one discrete creation notification
    fn publish_donor_update(&self, update: &DonorSearchUpdate) -> Result<(), PublishError>;

    /// Publish one batched notification covering edits and deletions
    fn publish_donor_updates(&self, updates: &[DonorSearchUpdate]) -> Result<(), PublishError>;
}
