//! Sigil Worker
//!
//! The batch-processing pipeline. Each cycle of a [`BatchedOperation`]
//! threads one mutable [`Batch`] through five stages:
//!
//! 1. [`restore_batch`] — replay the backup bucket after a crash;
//! 2. [`compose_batch`] — drain the work queue until the batch is full;
//! 3. [`seal_batch`] — one shared merkle root over the batch (issue only);
//! 4. [`submit_batch`] — anchor on the ledger with gas escalation;
//! 5. [`save_batch`] — persist to the final store, clear the backup.
//!
//! Stages are idempotent per document key, so a crash anywhere resumes
//! cleanly from the backup bucket on the next start.

pub mod batch;
pub mod compose;
pub mod config;
pub mod invalid;
pub mod operation;
pub mod restore;
pub mod save;
pub mod seal;
pub mod submit;


use sigil_core::Transient;
use sigil_ledger::LedgerError;
use sigil_sealer::SealError;
use sigil_store::StoreError;
use sigil_verifier::VerifierError;
use thiserror::Error;

pub use batch::{Batch, BatchEntry, BatchLimits};
pub use compose::compose_batch;
pub use config::WorkerConfig;
pub use operation::{BatchedOperation, CycleOutcome, WorkerContext};
pub use restore::restore_batch;
pub use save::save_batch;
pub use seal::seal_batch;
pub use submit::submit_batch;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Verifier(#[from] VerifierError),
    #[error(transparent)]
    Seal(#[from] SealError),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid batch state: {0}")]
    State(String),
}

impl Transient for WorkerError {
    fn is_transient(&self) -> bool {
        match self {
            WorkerError::Store(e) => e.is_transient(),
            WorkerError::Ledger(e) => e.is_transient(),
            WorkerError::Verifier(e) => e.is_transient(),
            WorkerError::Seal(_) | WorkerError::Serialization(_) | WorkerError::State(_) => false,
        }
    }
}
