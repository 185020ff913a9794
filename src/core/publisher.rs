//! Outcome publisher
//!
//! Turns the committed changes of one batch into downstream notifications:
//! one discrete notification per created donor (its internal id does not
//! exist before the commit, so creations cannot be pre-batched), and a
//! single batched notification covering every content-changing edit and
//! every deletion.
//!
//! The publisher must only ever be handed a context whose transaction has
//! already committed. Publish failures are logged and swallowed: the commit
//! stands, and redelivery is the transport's responsibility.

use tracing::{debug, error};

use crate::core::importer::BatchContext;
use crate::core::traits::MessagingClient;
use crate::types::DonorSearchUpdate;

/// Publish the committed outcomes of one batch
///
/// Content no-ops, skipped deletes, and rejected commands produce nothing
/// here; exactly the content-changing mutations reach the wire.
pub fn publish_batch_outcomes<M: MessagingClient>(messaging: &M, context: &BatchContext) {
    for record in &context.created {
        let update = DonorSearchUpdate::snapshot(record);
        match messaging.publish_donor_update(&update) {
            Ok(()) => debug!(
                file = %context.file_location,
                donor = %update.external_code,
                internal_id = update.internal_id,
                "published donor creation"
            ),
            Err(publish_error) => error!(
                file = %context.file_location,
                donor = %update.external_code,
                %publish_error,
                "donor creation publish failed after commit; leaving redelivery to the transport"
            ),
        }
    }

    let mut batched: Vec<DonorSearchUpdate> = context
        .updated
        .iter()
        .map(DonorSearchUpdate::snapshot)
        .collect();
    batched.extend(
        context
            .removed
            .iter()
            .map(|(internal_id, external_code)| {
                DonorSearchUpdate::tombstone(*internal_id, external_code.clone())
            }),
    );

    if batched.is_empty() {
        return;
    }
    match messaging.publish_donor_updates(&batched) {
        Ok(()) => debug!(
            file = %context.file_location,
            updates = batched.len(),
            "published batched donor updates"
        ),
        Err(publish_error) => error!(
            file = %context.file_location,
            updates = batched.len(),
            %publish_error,
            "batched donor update publish failed after commit; leaving redelivery to the transport"
        ),
    }
}
