//! The save stage: persist anchored documents and clear the backup.
//!
//! Runs only after ledger confirmation. Each document is written to the
//! processed bucket first and removed from the backup second, so a crash
//! mid-save leaves every unsaved document in the backup for the next
//! restore. Re-saving an already-saved key is a harmless overwrite.

use std::collections::HashSet;

use futures::FutureExt;
use sigil_core::retry_fixed;
use tracing::info;

use crate::batch::Batch;
use crate::operation::WorkerContext;
use crate::WorkerError;

struct SaveState<'a> {
    batch: &'a Batch,
    saved: HashSet<String>,
}

/// Write every batched document to the processed bucket and delete its
/// backup copy.
pub async fn save_batch(ctx: &WorkerContext, batch: &Batch) -> Result<(), WorkerError> {
    let mut state = SaveState {
        batch,
        saved: HashSet::new(),
    };

    retry_fixed(
        ctx.config.save_policy(),
        "save",
        &mut state,
        |state| save_pass(ctx, state).boxed(),
    )
    .await?;

    info!(documents = state.saved.len(), "batch saved");
    Ok(())
}

async fn save_pass(ctx: &WorkerContext, state: &mut SaveState<'_>) -> Result<(), WorkerError> {
    let batch = state.batch;
    for (key, entry) in batch.wrapped() {
        if state.saved.contains(key) {
            continue;
        }
        let body = serde_json::to_vec(&entry.body)
            .map_err(|e| WorkerError::Serialization(e.to_string()))?;
        ctx.processed.put(key, body).await?;
        // Ok(false) means the backup copy was already cleaned up.
        ctx.backup.delete(key).await?;
        state.saved.insert(key.clone());
    }
    Ok(())
}
