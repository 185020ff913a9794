//! I/O module
//!
//! Handles batch file parsing and operator-facing outputs.
//!
//! # Components
//!
//! - `batch_reader` - JSON batch file readers (sync and async)
//! - `failure_log` - CSV validation failure log
//! - `log_sinks` - Log-backed default alert/messaging sinks

pub mod batch_reader;
pub mod failure_log;
pub mod log_sinks;

pub use batch_reader::{read_batch, read_batch_async};
pub use failure_log::FailureLog;
pub use log_sinks::{LogMessagingClient, LogNotificationSender};
