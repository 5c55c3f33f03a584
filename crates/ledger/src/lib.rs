//! Sigil Ledger
//!
//! The append-only ledger boundary: a [`LedgerClient`] trait covering the
//! RPC surface the workers need (price, nonce, estimate, send, wait,
//! revocation lookup), error classification driving the gas-escalation
//! state machine, the [`TransactionSubmitter`] itself, and an in-memory
//! ledger for tests.

pub mod client;
pub mod memory;
pub mod submit;

use sigil_core::Transient;
use thiserror::Error;

pub use client::{LedgerCall, LedgerClient, TxHash, TxReceipt, GWEI};
pub use memory::{MemoryLedger, SendOutcome, WaitOutcome};
pub use submit::{EscalationState, SubmitterConfig, TransactionSubmitter};

#[derive(Error, Debug)]
pub enum LedgerError {
    /// The transaction was broadcast but not confirmed within the wait
    /// window. Retriable with price escalation.
    #[error("Confirmation timed out for transaction {0}")]
    ConfirmationTimeout(TxHash),
    /// The node rejected the price as too low. Retriable with escalation.
    #[error("Transaction underpriced")]
    Underpriced,
    /// The node already knows this exact transaction. The previously
    /// broadcast handle is authoritative; do not resend.
    #[error("Transaction already known to the ledger")]
    KnownTransaction,
    /// Transient RPC failure (connection, rate limit, node hiccup).
    #[error("Ledger RPC error: {0}")]
    Rpc(String),
    /// Permanent rejection (revert, bad payload). Not retriable.
    #[error("Transaction rejected: {0}")]
    Rejected(String),
}

impl Transient for LedgerError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            LedgerError::Rpc(_) | LedgerError::ConfirmationTimeout(_) | LedgerError::Underpriced
        )
    }
}

impl LedgerError {
    /// Whether this failure should escalate the gas price before the next
    /// send attempt.
    pub fn escalates(&self) -> bool {
        matches!(
            self,
            LedgerError::ConfirmationTimeout(_) | LedgerError::Underpriced
        )
    }
}
