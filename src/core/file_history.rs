//! Import attempt history keyed by file identity
//!
//! This module provides the `FileHistoryTracker`, which turns the queue's
//! at-least-once delivery into two cleanly separated cases:
//!
//! - redelivery of the identical `(fileLocation, messageId)` pair is a safe,
//!   idempotent retry (the attempt stalled, failed transiently, or the
//!   completion acknowledgement was lost);
//! - arrival of a known file location under a *different* message id is a
//!   genuine resubmission mistake and is refused before any processing.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::types::ImportError;

/// Recorded lifecycle of one import attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFileHistoryEntry {
    /// Business identity of the imported file
    pub file_location: String,

    /// Delivery identity of the attempt that owns this file
    pub message_id: String,

    /// Start of the most recent attempt
    pub started_at: DateTime<Utc>,

    /// Set once the import transaction and publishes finished
    pub completed_at: Option<DateTime<Utc>>,

    /// Set when the caller reported an unexpected mid-import failure
    pub failed_at: Option<DateTime<Utc>>,
}

/// How a registration attempt relates to recorded history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptRegistration {
    /// First sighting of this file location
    Fresh,

    /// Same `(fileLocation, messageId)` pair seen before but never completed;
    /// the caller may safely re-run the import
    RetriedAttempt,

    /// Same pair already ran to completion; the caller must skip processing
    /// so redelivery produces no second set of publishes
    AlreadyCompleted,
}

/// Detects duplicate or stalled redelivery of import batches
#[derive(Debug, Default)]
pub struct FileHistoryTracker {
    /// One entry per file location; the message id recorded first owns it
    entries: DashMap<String, ImportFileHistoryEntry>,
}

impl FileHistoryTracker {
    pub fn new() -> Self {
        FileHistoryTracker {
            entries: DashMap::new(),
        }
    }

    /// Record the start of an import attempt
    ///
    /// Fails with [`ImportError::DuplicateFile`] when the location is already
    /// owned by a different message id, whether that attempt is in flight or
    /// completed. Retrying the same pair is idempotent: the entry's
    /// `started_at` moves to the new attempt and any failure mark is cleared.
    pub fn register_attempt(
        &self,
        file_location: &str,
        message_id: &str,
        started_at: DateTime<Utc>,
    ) -> Result<AttemptRegistration, ImportError> {
        match self.entries.entry(file_location.to_string()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.message_id != message_id {
                    return Err(ImportError::duplicate_file(
                        file_location,
                        &entry.message_id,
                        message_id,
                    ));
                }
                if entry.completed_at.is_some() {
                    return Ok(AttemptRegistration::AlreadyCompleted);
                }
                entry.started_at = started_at;
                entry.failed_at = None;
                Ok(AttemptRegistration::RetriedAttempt)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(ImportFileHistoryEntry {
                    file_location: file_location.to_string(),
                    message_id: message_id.to_string(),
                    started_at,
                    completed_at: None,
                    failed_at: None,
                });
                Ok(AttemptRegistration::Fresh)
            }
        }
    }

    /// Mark an attempt as completed; idempotent
    ///
    /// A completion for an unknown pair is ignored (the entry may have been
    /// recorded by a different process instance).
    pub fn mark_completed(
        &self,
        file_location: &str,
        message_id: &str,
        completed_at: DateTime<Utc>,
    ) {
        if let Some(mut entry) = self.entries.get_mut(file_location) {
            if entry.message_id == message_id && entry.completed_at.is_none() {
                entry.completed_at = Some(completed_at);
            }
        }
    }

    /// Record an unexpected mid-import failure; the pair stays retryable
    pub fn mark_failed(&self, file_location: &str, message_id: &str, failed_at: DateTime<Utc>) {
        if let Some(mut entry) = self.entries.get_mut(file_location) {
            if entry.message_id == message_id && entry.completed_at.is_none() {
                entry.failed_at = Some(failed_at);
            }
        }
    }

    /// History entry for a file location, if any
    pub fn get(&self, file_location: &str) -> Option<ImportFileHistoryEntry> {
        self.entries
            .get(file_location)
            .map(|entry| entry.value().clone())
    }
}
