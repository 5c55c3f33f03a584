//! The submission stage: anchor the batch on the ledger.
//!
//! Issue workers publish the batch's shared merkle root; revoke workers
//! publish every target hash in one bulk call. Gas escalation and retry
//! live in [`TransactionSubmitter`]; this stage only shapes the call.

use sigil_core::Operation;
use sigil_ledger::{LedgerCall, TransactionSubmitter, TxReceipt};
use sigil_sealer as sealer;

use crate::batch::Batch;
use crate::operation::WorkerContext;
use crate::WorkerError;

/// Submit the sealed batch and wait for confirmation.
pub async fn submit_batch(ctx: &WorkerContext, batch: &Batch) -> Result<TxReceipt, WorkerError> {
    let call = match ctx.verifier.operation() {
        Operation::Issue => {
            let root = batch
                .merkle_root
                .clone()
                .ok_or_else(|| WorkerError::State("submitting an unsealed batch".to_string()))?;
            LedgerCall::Issue { root }
        }
        Operation::Revoke => {
            let mut hashes = Vec::with_capacity(batch.wrapped().len());
            for (key, entry) in batch.wrapped() {
                let hash = sealer::sealed_target_hash(&entry.body).ok_or_else(|| {
                    WorkerError::State(format!("batched document has no target hash: {key}"))
                })?;
                hashes.push(hash);
            }
            LedgerCall::BulkRevoke { hashes }
        }
    };

    let submitter = TransactionSubmitter::new(ctx.ledger.clone(), ctx.config.submitter_config());
    let receipt = submitter.submit(&call).await?;
    Ok(receipt)
}
