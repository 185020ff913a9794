//! Donor Import Engine Library
//! # Overview
//!
//! This library ingests donor-registry change files for a transplant-matching
//! platform, deciding per donor record whether each incoming change may be
//! applied and guaranteeing convergence despite out-of-order and duplicate
//! delivery.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (ImportBatch, DonorRecord, errors)
//! - [`cli`] - CLI argument parsing
//! - [`core`] - Business logic components:
//!   - [`core::engine`] - Per-record ordering decisions
//!   - [`core::donor_store`] - Donor registry with the batch transaction boundary
//!   - [`core::file_history`] - Duplicate/stalled redelivery detection
//!   - [`core::importer`] - Batch orchestration
//!   - [`core::publisher`] - Post-commit downstream notifications
//! - [`io`] - Batch file reading, the failure log, and log-backed sinks
//! - [`strategy`] - Sequential and concurrent drains over batch files
//!
//! # Ordering model
//!
//! Each donor record is a last-writer-wins register versioned solely by the
//! upload timestamp its registry declared:
//!
//! - **Create**: registers a donor; rejected if the code already exists
//! - **Edit**: mutates a donor; rejected if missing or stale
//! - **Delete**: removes a donor; silently skipped if missing
//! - **Upsert**: create-or-edit depending on current existence
//!
//! A command whose batch timestamp predates the record's applied state is
//! rejected as stale, so any delivery order converges to the same terminal
//! state. Accepted changes publish downstream exactly once per
//! content-changing mutation.

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{
    decide, Decision, DonorImportService, DonorStore, FileHistoryTracker, ImportSummary,
    RequiredTypingValidator,
};
pub use types::{
    ChangeType, DonorRecord, DonorUpdateCommand, HlaPayload, ImportBatch, ImportError,
    InternalDonorId, RejectionReason, UpdateMode,
};
