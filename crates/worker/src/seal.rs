//! The sealing stage: one shared merkle root over the composed batch.
//!
//! Issue workers only. Revoke candidates arrive already sealed; their
//! roots were fixed when they were issued.

use sigil_sealer as sealer;
use tracing::info;

use crate::batch::{Batch, BatchEntry};
use crate::operation::WorkerContext;
use crate::WorkerError;

/// Seal every unwrapped document in `batch` under one root.
pub fn seal_batch(ctx: &WorkerContext, batch: &mut Batch) -> Result<(), WorkerError> {
    let entries: Vec<(String, serde_json::Value)> = batch
        .take_unwrapped()
        .into_iter()
        .map(|(key, entry)| (key, entry.body))
        .collect();

    let sealed = sealer::seal(entries, &ctx.issuer_key)?;

    let wrapped = sealed
        .documents
        .into_iter()
        .map(|(key, body)| {
            let size = serde_json::to_vec(&body)
                .map(|b| b.len() as u64)
                .unwrap_or(0);
            (key, BatchEntry { body, size })
        })
        .collect();

    batch.set_sealed(wrapped, sealed.merkle_root);
    info!(
        merkle_root = batch.merkle_root.as_deref().unwrap_or("-"),
        documents = batch.candidate_count(),
        "batch sealed"
    );
    Ok(())
}
