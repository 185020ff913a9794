//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `batch`: Import batch envelope and per-donor update commands
//! - `donor`: Donor records, HLA payloads, and downstream snapshots
//! - `error`: Error taxonomy for the import engine

pub mod batch;
pub mod donor;
pub mod error;

pub use batch::{ChangeType, DonorUpdateCommand, ImportBatch, UpdateMode};
pub use donor::{DonorRecord, DonorSearchUpdate, HlaPayload, InternalDonorId, Locus, LocusTyping};
pub use error::{ImportError, PublishError, RejectionReason};
