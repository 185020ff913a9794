//! Donor import orchestration
//!
//! This module provides the `DonorImportService`, which carries one batch
//! through the whole pipeline: attempt registration against the file
//! history, structural validation, the ordering decision per command inside
//! a single store transaction, and, strictly after commit, downstream
//! publishing and per-rejection alerting.
//!
//! All per-batch state lives in an explicit [`BatchContext`] threaded
//! through the run; there is no ambient "current file" anywhere.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::donor_store::DonorStore;
use crate::core::engine::{decide, Decision};
use crate::core::file_history::{AttemptRegistration, FileHistoryTracker};
use crate::core::publisher::publish_batch_outcomes;
use crate::core::traits::{
    ImportAlert, MessagingClient, NotificationSender, TypingOutcome, TypingValidator,
    ValidationFailureSink,
};
use crate::types::{
    ChangeType, DonorRecord, ImportBatch, ImportError, InternalDonorId, RejectionReason,
    UpdateMode,
};

/// One command the ordering engine refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedUpdate {
    pub record_id: String,
    pub change_type: ChangeType,
    pub reason: RejectionReason,
}

/// Per-batch state accumulated while a batch runs
///
/// Batch metadata plus the outcome of every command: what was created,
/// updated, removed, rejected, or dropped as a no-op. The publisher and the
/// alerting pass both read from this after the transaction commits.
#[derive(Debug, Clone)]
pub struct BatchContext {
    /// Business identity of the batch's source file
    pub file_location: String,

    /// Delivery identity of this attempt
    pub message_id: String,

    /// Declared upload timestamp driving every ordering decision
    pub uploaded_at: DateTime<Utc>,

    /// Records created by this batch, publish individually
    pub created: Vec<DonorRecord>,

    /// Content-changing updates, publish batched
    pub updated: Vec<DonorRecord>,

    /// Removed records as `(internal id, external code)` tombstones
    pub removed: Vec<(InternalDonorId, String)>,

    /// Commands the ordering engine refused; one alert each
    pub rejected: Vec<RejectedUpdate>,

    /// Applied edits whose payload matched the stored one byte-for-byte
    pub unchanged: usize,

    /// Deletes of missing donors (silent no-ops)
    pub skipped_deletes: usize,

    /// Commands the typing validator refused
    pub invalid: usize,
}

impl BatchContext {
    pub fn new(file_location: &str, message_id: &str, uploaded_at: DateTime<Utc>) -> Self {
        BatchContext {
            file_location: file_location.to_string(),
            message_id: message_id.to_string(),
            uploaded_at,
            created: Vec::new(),
            updated: Vec::new(),
            removed: Vec::new(),
            rejected: Vec::new(),
            unchanged: 0,
            skipped_deletes: 0,
            invalid: 0,
        }
    }

    fn summary(&self, redelivered: bool) -> ImportSummary {
        ImportSummary {
            created: self.created.len(),
            updated: self.updated.len(),
            removed: self.removed.len(),
            unchanged: self.unchanged,
            skipped_deletes: self.skipped_deletes,
            rejected: self.rejected.len(),
            invalid: self.invalid,
            redelivered,
        }
    }
}

/// Counts reported back to the caller for one processed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub skipped_deletes: usize,
    pub rejected: usize,
    pub invalid: usize,

    /// True when the batch was a recognized redelivery of a completed
    /// attempt and was skipped without touching the store
    pub redelivered: bool,
}

/// Carries one import batch through validation, ordering, commit, publish,
/// and alerting
///
/// One batch per call; calls for different files may run concurrently. The
/// service is `Send + Sync` whenever its collaborators are.
pub struct DonorImportService<V, N, M, F> {
    store: Arc<DonorStore>,
    history: Arc<FileHistoryTracker>,
    validator: V,
    notifications: N,
    messaging: M,
    failure_sink: F,
}

impl<V, N, M, F> DonorImportService<V, N, M, F>
where
    V: TypingValidator,
    N: NotificationSender,
    M: MessagingClient,
    F: ValidationFailureSink,
{
    pub fn new(
        store: Arc<DonorStore>,
        history: Arc<FileHistoryTracker>,
        validator: V,
        notifications: N,
        messaging: M,
        failure_sink: F,
    ) -> Self {
        DonorImportService {
            store,
            history,
            validator,
            notifications,
            messaging,
            failure_sink,
        }
    }

    /// The donor registry this service imports into
    pub fn store(&self) -> Arc<DonorStore> {
        Arc::clone(&self.store)
    }

    /// The attempt history this service records into
    pub fn history(&self) -> Arc<FileHistoryTracker> {
        Arc::clone(&self.history)
    }

    /// Mark an import attempt as in flight before processing starts
    ///
    /// The outer messaging layer calls this when a delivery is picked up, so
    /// stalled attempts are distinguishable from files never seen.
    pub fn register_start_of_import(
        &self,
        batch: &ImportBatch,
        started_at: DateTime<Utc>,
    ) -> Result<AttemptRegistration, ImportError> {
        self.history
            .register_attempt(&batch.file_location, &batch.message_id, started_at)
    }

    /// Record an unexpected mid-import failure
    ///
    /// The `(fileLocation, messageId)` pair stays retryable; the next
    /// delivery of the identical pair resumes as a safe retry.
    pub fn register_unexpected_error(&self, batch: &ImportBatch, failed_at: DateTime<Utc>) {
        warn!(
            file = %batch.file_location,
            message_id = %batch.message_id,
            "unexpected donor import failure registered"
        );
        self.history
            .mark_failed(&batch.file_location, &batch.message_id, failed_at);
    }

    /// Import one donor batch
    ///
    /// Returns an error only for file-identity conflicts, whole-batch
    /// conflicts, and infrastructure failures; per-record rejections are
    /// alerted while the acceptable subset commits. Safe to re-invoke with
    /// the identical `(fileLocation, messageId)` pair: a completed attempt
    /// is skipped without producing a second set of publishes.
    pub fn import_donor_file(
        &self,
        batch: &ImportBatch,
        received_at: DateTime<Utc>,
    ) -> Result<ImportSummary, ImportError> {
        if batch.update_mode != UpdateMode::Differential {
            return Err(ImportError::unsupported_update_mode(
                &batch.file_location,
                batch.update_mode,
            ));
        }

        let registration = self.history.register_attempt(
            &batch.file_location,
            &batch.message_id,
            received_at,
        )?;
        if registration == AttemptRegistration::AlreadyCompleted {
            info!(
                file = %batch.file_location,
                message_id = %batch.message_id,
                "skipping redelivery of completed import"
            );
            return Ok(ImportSummary {
                redelivered: true,
                ..ImportSummary::default()
            });
        }

        let mut context = BatchContext::new(
            &batch.file_location,
            &batch.message_id,
            batch.upload_timestamp,
        );

        // Structural validation first: invalid commands go to the failure
        // log and never reach the ordering engine.
        let mut accepted = Vec::with_capacity(batch.commands.len());
        for command in &batch.commands {
            match self.validator.validate(command) {
                TypingOutcome::Valid => accepted.push(command),
                TypingOutcome::Invalid { reason } => {
                    context.invalid += 1;
                    self.failure_sink
                        .record(&batch.file_location, &command.record_id, &reason)?;
                }
            }
        }

        // All accepted commands apply inside one transaction. Commands later
        // in the batch read through the staged overlay, so an in-batch
        // create-then-edit behaves as expected.
        let mut transaction = self.store.begin();
        for command in accepted {
            let existing = transaction.get(&command.record_id);
            match decide(existing.as_ref(), command, batch.upload_timestamp) {
                Decision::Create => {
                    let record = DonorRecord {
                        internal_id: transaction.mint_internal_id(),
                        external_code: command.record_id.clone(),
                        hla: command.hla.clone(),
                        last_applied_timestamp: batch.upload_timestamp,
                        source_file_location: batch.file_location.clone(),
                    };
                    transaction.put(record.clone());
                    context.created.push(record);
                }
                Decision::Update { content_changed } => {
                    let Some(previous) = existing else { continue };
                    let record = DonorRecord {
                        internal_id: previous.internal_id,
                        external_code: previous.external_code,
                        hla: command.hla.clone(),
                        last_applied_timestamp: batch.upload_timestamp,
                        source_file_location: batch.file_location.clone(),
                    };
                    transaction.put(record.clone());
                    if content_changed {
                        context.updated.push(record);
                    } else {
                        context.unchanged += 1;
                    }
                }
                Decision::Remove => {
                    let Some(previous) = existing else { continue };
                    transaction.remove(&previous.external_code);
                    context
                        .removed
                        .push((previous.internal_id, previous.external_code));
                }
                Decision::Skip => context.skipped_deletes += 1,
                Decision::Reject(reason) => context.rejected.push(RejectedUpdate {
                    record_id: command.record_id.clone(),
                    change_type: command.change_type,
                    reason,
                }),
            }
        }
        transaction.commit();

        // The transaction is fully committed; publishing runs detached from
        // it and its failures never roll anything back.
        publish_batch_outcomes(&self.messaging, &context);

        for rejection in &context.rejected {
            self.notifications.send_alert(&ImportAlert {
                record_id: rejection.record_id.clone(),
                file_location: context.file_location.clone(),
                change_type: rejection.change_type,
                reason: rejection.reason.clone(),
            });
        }

        self.history
            .mark_completed(&batch.file_location, &batch.message_id, Utc::now());

        let summary = context.summary(false);
        info!(
            file = %batch.file_location,
            created = summary.created,
            updated = summary.updated,
            removed = summary.removed,
            unchanged = summary.unchanged,
            rejected = summary.rejected,
            invalid = summary.invalid,
            "donor import completed"
        );
        Ok(summary)
    }
}
