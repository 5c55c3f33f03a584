//! Batch composition from the work queue.
//!
//! Drains object-created notifications until a completion threshold fires.
//! Each accepted document is copied to the backup bucket and removed from
//! the unprocessed bucket before its message is acknowledged, so at any
//! crash point the document survives in exactly one of the four stores.
//!
//! Message acknowledgement rules:
//!   - unparseable or non-actionable notification: leave it; the visibility
//!     timeout redelivers it and a dead-letter policy disposes of it;
//!   - object already gone from the unprocessed bucket: acknowledge, this
//!     is a redelivery of already-classified work;
//!   - document classified (valid or invalid): acknowledge.

use futures::FutureExt;
use serde_json::Value;
use sigil_core::{retry_fixed, Operation};
use sigil_store::{Notification, QueueMessage};
use sigil_verifier::{Verdict, REASON_NOT_JSON};
use tracing::{debug, info, warn};

use crate::batch::{Batch, BatchEntry, BatchLimits};
use crate::invalid::record_invalid;
use crate::operation::WorkerContext;
use crate::WorkerError;

struct ComposeState<'a> {
    batch: &'a mut Batch,
    limits: BatchLimits,
}

/// Fill `batch` from the queue until it is composed.
pub async fn compose_batch(ctx: &WorkerContext, batch: &mut Batch) -> Result<(), WorkerError> {
    let mut state = ComposeState {
        batch,
        limits: ctx.limits(),
    };

    retry_fixed(
        ctx.config.compose_policy(),
        "compose",
        &mut state,
        |state| compose_pass(ctx, state).boxed(),
    )
    .await?;

    let batch = state.batch;
    info!(
        documents = batch.candidate_count(),
        total_size = batch.total_size(),
        "batch composed"
    );
    Ok(())
}

async fn compose_pass(ctx: &WorkerContext, state: &mut ComposeState<'_>) -> Result<(), WorkerError> {
    let opts = ctx.config.receive_options();
    let limits = state.limits;
    while !state.batch.update_composed(&limits) {
        let Some(message) = ctx.queue.receive(&opts).await? else {
            continue;
        };
        handle_message(ctx, state.batch, message).await?;
    }
    Ok(())
}

async fn handle_message(
    ctx: &WorkerContext,
    batch: &mut Batch,
    message: QueueMessage,
) -> Result<(), WorkerError> {
    let Ok(notification) = serde_json::from_str::<Notification>(&message.body) else {
        warn!("unparseable notification, leaving on queue");
        return Ok(());
    };
    let Some(object) = notification.created_object() else {
        debug!("non-actionable notification, leaving on queue");
        return Ok(());
    };
    let key = object.key.clone();

    // The object may be gone: a redelivered message for a document this
    // worker already classified, or a delete raced the download.
    let Some(object) = ctx.unprocessed.get(&key).await? else {
        debug!(key, "notified object missing, acknowledging");
        ctx.queue.delete(&message.receipt_handle).await?;
        return Ok(());
    };

    let raw = object.body;
    let size = object.size;
    let doc: Option<Value> = serde_json::from_slice(&raw).ok();

    match doc {
        None => {
            record_invalid(ctx.invalid.as_ref(), &key, raw, REASON_NOT_JSON, None).await?;
            ctx.unprocessed.delete(&key).await?;
        }
        Some(doc) => match ctx.verifier.verify(&doc, ctx.ledger.as_ref()).await? {
            Verdict::Valid => {
                debug!(key, size, "document accepted");
                // Backup before touching the source: the document must
                // exist somewhere durable at every instant.
                ctx.backup.put(&key, raw).await?;
                ctx.unprocessed.delete(&key).await?;
                let entry = BatchEntry { body: doc, size };
                match ctx.verifier.operation() {
                    Operation::Issue => batch.insert_unwrapped(key, entry),
                    Operation::Revoke => batch.insert_wrapped(key, entry),
                }
            }
            Verdict::Invalid { reason, detail } => {
                record_invalid(ctx.invalid.as_ref(), &key, raw, &reason, detail).await?;
                ctx.unprocessed.delete(&key).await?;
            }
        },
    }

    ctx.queue.delete(&message.receipt_handle).await?;
    Ok(())
}
