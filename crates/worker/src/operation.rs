//! The batched operation: one worker's supervision loop over the pipeline.

use std::sync::Arc;
use std::time::Duration;

use sigil_core::Operation;
use sigil_crypto::SigningKeypair;
use sigil_ledger::LedgerClient;
use sigil_store::{Bucket, Queue};
use sigil_verifier::DocumentVerifier;
use tracing::{error, info};

use crate::batch::{Batch, BatchLimits};
use crate::compose::compose_batch;
use crate::config::WorkerConfig;
use crate::restore::restore_batch;
use crate::save::save_batch;
use crate::seal::seal_batch;
use crate::submit::submit_batch;
use crate::WorkerError;

/// Everything one worker instance needs: its configuration, its verifier,
/// the issuer keypair, and handles to the queue, the four stores, and the
/// ledger.
pub struct WorkerContext {
    pub config: WorkerConfig,
    pub verifier: DocumentVerifier,
    pub issuer_key: SigningKeypair,
    pub queue: Arc<dyn Queue>,
    pub unprocessed: Arc<dyn Bucket>,
    pub backup: Arc<dyn Bucket>,
    pub invalid: Arc<dyn Bucket>,
    pub processed: Arc<dyn Bucket>,
    pub ledger: Arc<dyn LedgerClient>,
}

impl WorkerContext {
    pub fn limits(&self) -> BatchLimits {
        BatchLimits {
            max_size_bytes: self.config.batch_size_bytes,
            max_time: Duration::from_secs(self.config.batch_time_seconds),
        }
    }
}

/// Result of one pipeline cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The completion window elapsed with no accepted documents.
    Empty,
    /// A batch was anchored and saved.
    Anchored {
        documents: usize,
        tx_hash: String,
        /// Shared root for issue batches; `None` on the revoke path.
        merkle_root: Option<String>,
    },
}

/// One worker's pipeline, run cycle after cycle.
pub struct BatchedOperation {
    ctx: WorkerContext,
}

impl BatchedOperation {
    pub fn new(ctx: WorkerContext) -> Self {
        Self { ctx }
    }

    /// Run cycles forever, logging and pausing on failure. A failed cycle
    /// loses no documents: everything accepted so far sits in the backup
    /// bucket and is restored at the top of the next cycle.
    pub async fn run(&self) {
        info!(
            operation = self.ctx.verifier.operation().name(),
            "worker started"
        );
        loop {
            match self.run_cycle().await {
                Ok(CycleOutcome::Empty) => {}
                Ok(CycleOutcome::Anchored {
                    documents,
                    tx_hash,
                    ..
                }) => {
                    info!(documents, tx = %tx_hash, "cycle complete");
                }
                Err(e) => {
                    error!(error = %e, "cycle failed");
                    tokio::time::sleep(Duration::from_secs(self.ctx.config.cycle_pause_seconds))
                        .await;
                }
            }
        }
    }

    /// One full pass: restore, compose, seal, submit, save.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, WorkerError> {
        let mut batch = Batch::new();

        restore_batch(&self.ctx, &mut batch).await?;
        compose_batch(&self.ctx, &mut batch).await?;

        if batch.is_empty() {
            return Ok(CycleOutcome::Empty);
        }

        if self.ctx.verifier.operation() == Operation::Issue {
            seal_batch(&self.ctx, &mut batch)?;
        }

        let receipt = submit_batch(&self.ctx, &batch).await?;
        save_batch(&self.ctx, &batch).await?;

        Ok(CycleOutcome::Anchored {
            documents: batch.candidate_count(),
            tx_hash: receipt.tx_hash,
            merkle_root: batch.merkle_root.clone(),
        })
    }
}
