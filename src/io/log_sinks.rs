//! Log-backed collaborator sinks
//!
//! Default implementations of the alerting and messaging seams that write
//! structured log events instead of talking to real transports. The CLI runs
//! with these; production deployments substitute queue-backed clients behind
//! the same traits.

use tracing::{info, warn};

use crate::core::traits::{ImportAlert, MessagingClient, NotificationSender};
use crate::types::{DonorSearchUpdate, PublishError};

/// Alert channel that emits one warning event per rejected command
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotificationSender;

impl NotificationSender for LogNotificationSender {
    fn send_alert(&self, alert: &ImportAlert) {
        warn!(
            donor = %alert.record_id,
            file = %alert.file_location,
            change = %alert.change_type,
            reason = %alert.reason,
            "donor update rejected"
        );
    }
}

/// Messaging client that logs what would be published downstream
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMessagingClient;

impl MessagingClient for LogMessagingClient {
    fn publish_donor_update(&self, update: &DonorSearchUpdate) -> Result<(), PublishError> {
        info!(
            donor = %update.external_code,
            internal_id = update.internal_id,
            "donor creation update"
        );
        Ok(())
    }

    fn publish_donor_updates(&self, updates: &[DonorSearchUpdate]) -> Result<(), PublishError> {
        let tombstones = updates.iter().filter(|update| update.is_tombstone()).count();
        info!(
            updates = updates.len() - tombstones,
            tombstones, "batched donor updates"
        );
        Ok(())
    }
}
