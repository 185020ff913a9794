//! Error types for the donor import engine
//!
//! This module defines the errors that can surface from batch import
//! processing, plus the per-record rejection reasons that are alerted but
//! never thrown.
//!
//! # Error Categories
//!
//! - **File I/O Errors**: batch file not found, unreadable, failure log
//!   unwritable
//! - **Parse Errors**: malformed batch JSON
//! - **File-identity conflicts**: the same file location resubmitted under a
//!   new message id
//! - **Whole-batch conflicts**: a batch-level precondition failure, nothing
//!   committed
//!
//! Per-record ordering conflicts are deliberately NOT errors: they are
//! [`RejectionReason`] values carried in alerts while the batch continues.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::batch::UpdateMode;

/// Main error type for the donor import engine
///
/// Only file-identity conflicts, whole-batch conflicts, and infrastructure
/// failures propagate as errors; the outer messaging layer retries or
/// dead-letters on these. Everything per-record is handled internally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImportError {
    /// Batch file not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading batch files or writing the failure log
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
    },

    /// Batch JSON could not be parsed
    #[error("Malformed batch file{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Parse {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// The same file location was resubmitted under a different message id
    ///
    /// Redelivery of the identical `(fileLocation, messageId)` pair is a safe
    /// retry; a new message id for a known location signals a genuine
    /// resubmission mistake and the batch is not processed.
    #[error("File '{file_location}' was already imported under message '{existing_message_id}'; resubmission under message '{incoming_message_id}' is not allowed")]
    DuplicateFile {
        /// Business identity of the conflicting file
        file_location: String,
        /// Message id recorded by the earlier attempt
        existing_message_id: String,
        /// Message id of the rejected resubmission
        incoming_message_id: String,
    },

    /// A batch-level precondition failed; nothing was committed
    ///
    /// Concretely: a full-refresh file submitted to the differential import
    /// pipeline. Full refreshes are a separate ingestion path.
    #[error("File '{file_location}' declares {mode} update mode; the differential import pipeline only accepts Differential files")]
    UnsupportedUpdateMode {
        /// Business identity of the offending file
        file_location: String,
        /// The declared update mode
        mode: UpdateMode,
    },
}

// Conversion from io::Error to ImportError
impl From<std::io::Error> for ImportError {
    fn from(error: std::io::Error) -> Self {
        ImportError::Io {
            message: error.to_string(),
        }
    }
}

// Conversion from serde_json::Error to ImportError
impl From<serde_json::Error> for ImportError {
    fn from(error: serde_json::Error) -> Self {
        ImportError::Parse {
            line: Some(error.line() as u64).filter(|line| *line > 0),
            message: error.to_string(),
        }
    }
}

// Conversion from csv::Error (failure log writes) to ImportError
impl From<csv::Error> for ImportError {
    fn from(error: csv::Error) -> Self {
        ImportError::Io {
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl ImportError {
    /// Create a FileNotFound error
    pub fn file_not_found(path: &str) -> Self {
        ImportError::FileNotFound {
            path: path.to_string(),
        }
    }

    /// Create a DuplicateFile error
    pub fn duplicate_file(
        file_location: &str,
        existing_message_id: &str,
        incoming_message_id: &str,
    ) -> Self {
        ImportError::DuplicateFile {
            file_location: file_location.to_string(),
            existing_message_id: existing_message_id.to_string(),
            incoming_message_id: incoming_message_id.to_string(),
        }
    }

    /// Create an UnsupportedUpdateMode error
    pub fn unsupported_update_mode(file_location: &str, mode: UpdateMode) -> Self {
        ImportError::UnsupportedUpdateMode {
            file_location: file_location.to_string(),
            mode,
        }
    }
}

/// Why the ordering engine refused a single command
///
/// Carried in alerts; the batch keeps processing. These are expected races
/// under at-least-once, unordered delivery, not failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionReason {
    /// Create targeting a donor code that already has a record
    #[error("a donor with this code already exists")]
    CreateOfExisting,

    /// Edit targeting a donor code with no record
    #[error("no donor with this code exists to edit")]
    EditOfMissingDonor,

    /// The batch's declared timestamp predates the record's applied state
    #[error("update timestamped {incoming} is older than the applied state from {applied}")]
    StaleUpdate {
        /// Upload timestamp declared by the rejected batch
        incoming: DateTime<Utc>,
        /// Timestamp already applied to the record
        applied: DateTime<Utc>,
    },
}

/// Failure reported by the downstream messaging client
///
/// Publishes are fire-and-forget relative to the store transaction: this
/// error is logged, never propagated, and never rolls back a commit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("downstream publish failed: {message}")]
pub struct PublishError {
    pub message: String,
}

impl PublishError {
    pub fn new(message: impl Into<String>) -> Self {
        PublishError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    #[case::file_not_found(
        ImportError::FileNotFound { path: "batch.json".to_string() },
        "File not found: batch.json"
    )]
    #[case::io(
        ImportError::Io { message: "Permission denied".to_string() },
        "I/O error: Permission denied"
    )]
    #[case::parse_with_line(
        ImportError::Parse { line: Some(3), message: "expected value".to_string() },
        "Malformed batch file at line 3: expected value"
    )]
    #[case::parse_without_line(
        ImportError::Parse { line: None, message: "unexpected EOF".to_string() },
        "Malformed batch file: unexpected EOF"
    )]
    #[case::duplicate_file(
        ImportError::duplicate_file("registry/a.json", "msg-1", "msg-2"),
        "File 'registry/a.json' was already imported under message 'msg-1'; resubmission under message 'msg-2' is not allowed"
    )]
    #[case::unsupported_mode(
        ImportError::unsupported_update_mode("registry/a.json", UpdateMode::Full),
        "File 'registry/a.json' declares Full update mode; the differential import pipeline only accepts Differential files"
    )]
    fn test_error_display(#[case] error: ImportError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::create_of_existing(
        RejectionReason::CreateOfExisting,
        "a donor with this code already exists"
    )]
    #[case::edit_of_missing(
        RejectionReason::EditOfMissingDonor,
        "no donor with this code exists to edit"
    )]
    fn test_rejection_reason_display(#[case] reason: RejectionReason, #[case] expected: &str) {
        assert_eq!(reason.to_string(), expected);
    }

    #[test]
    fn test_stale_update_display_carries_both_timestamps() {
        let reason = RejectionReason::StaleUpdate {
            incoming: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            applied: Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap(),
        };
        let rendered = reason.to_string();
        assert!(rendered.contains("2024-03-01"));
        assert!(rendered.contains("2024-03-02"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: ImportError = io_error.into();
        assert!(matches!(error, ImportError::Io { .. }));
        assert_eq!(error.to_string(), "I/O error: Permission denied");
    }

    #[test]
    fn test_json_error_conversion_captures_message() {
        let json_error =
            serde_json::from_str::<serde_json::Value>("{\n  broken").expect_err("parse must fail");
        let error: ImportError = json_error.into();
        assert!(matches!(error, ImportError::Parse { .. }));
    }
}
