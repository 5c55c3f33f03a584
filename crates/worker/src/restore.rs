//! Crash recovery from the backup bucket.
//!
//! Every document accepted into a batch is copied to the backup bucket
//! before its queue message is acknowledged, so a crash between acceptance
//! and final save loses nothing. On startup (and at the top of every
//! cycle) the backup bucket is replayed: surviving objects are re-verified
//! and re-inserted into the fresh batch.

use futures::FutureExt;
use serde_json::Value;
use sigil_core::{retry_fixed, Operation};
use sigil_verifier::{Verdict, REASON_NOT_JSON};
use tracing::{debug, info};

use crate::batch::{Batch, BatchEntry, BatchLimits};
use crate::invalid::record_invalid;
use crate::operation::WorkerContext;
use crate::WorkerError;

struct RestoreState<'a> {
    batch: &'a mut Batch,
    recovered: usize,
}

/// Replay the backup bucket into `batch`.
///
/// Progress survives retries: objects already inserted are skipped on the
/// next attempt, so a transient listing failure halfway through never
/// re-downloads the recovered half.
pub async fn restore_batch(ctx: &WorkerContext, batch: &mut Batch) -> Result<(), WorkerError> {
    let limits = ctx.limits();
    let mut state = RestoreState {
        batch,
        recovered: 0,
    };

    retry_fixed(
        ctx.config.restore_policy(),
        "restore",
        &mut state,
        |state| restore_pass(ctx, &limits, state).boxed(),
    )
    .await?;

    let batch = state.batch;
    batch.restored = state.recovered > 0;
    batch.update_composed(&limits);
    if batch.restored {
        info!(
            documents = state.recovered,
            total_size = batch.total_size(),
            "batch restored from backup"
        );
    }
    Ok(())
}

async fn restore_pass(
    ctx: &WorkerContext,
    limits: &BatchLimits,
    state: &mut RestoreState<'_>,
) -> Result<(), WorkerError> {
    let mut token: Option<String> = None;
    loop {
        let page = ctx.backup.list_page(None, token.as_deref()).await?;
        for summary in &page.objects {
            if state.batch.contains(&summary.key) {
                continue;
            }
            // Listed but deleted since: nothing to recover.
            let Some(object) = ctx.backup.get(&summary.key).await? else {
                continue;
            };
            restore_object(ctx, state, &summary.key, object.body, object.size).await?;
            if state.batch.update_composed(limits) {
                return Ok(());
            }
        }
        match page.next_token {
            Some(t) => token = Some(t),
            None => return Ok(()),
        }
    }
}

async fn restore_object(
    ctx: &WorkerContext,
    state: &mut RestoreState<'_>,
    key: &str,
    raw: Vec<u8>,
    size: u64,
) -> Result<(), WorkerError> {
    let doc: Value = match serde_json::from_slice(&raw) {
        Ok(doc) => doc,
        Err(_) => {
            record_invalid(ctx.invalid.as_ref(), key, raw, REASON_NOT_JSON, None).await?;
            ctx.backup.delete(key).await?;
            return Ok(());
        }
    };

    match ctx.verifier.verify(&doc, ctx.ledger.as_ref()).await? {
        Verdict::Valid => {
            debug!(key, "document recovered from backup");
            let entry = BatchEntry { body: doc, size };
            match ctx.verifier.operation() {
                Operation::Issue => state.batch.insert_unwrapped(key.to_string(), entry),
                Operation::Revoke => state.batch.insert_wrapped(key.to_string(), entry),
            }
            state.recovered += 1;
        }
        Verdict::Invalid { reason, detail } => {
            record_invalid(ctx.invalid.as_ref(), key, raw, &reason, detail).await?;
            ctx.backup.delete(key).await?;
        }
    }
    Ok(())
}
