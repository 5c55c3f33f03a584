//! The ledger RPC surface the workers depend on.

use std::time::Duration;

use async_trait::async_trait;

use crate::LedgerError;

/// Transaction hash, `0x`-prefixed hex.
pub type TxHash = String;

/// Wei per gwei.
pub const GWEI: u128 = 1_000_000_000;

/// The two contract calls a worker makes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    /// Anchor a batch's shared merkle root as a new valid commitment.
    Issue { root: String },
    /// Mark previously issued documents invalid by their target hashes.
    BulkRevoke { hashes: Vec<String> },
}

impl LedgerCall {
    pub fn describe(&self) -> String {
        match self {
            LedgerCall::Issue { root } => format!("issue(root={root})"),
            LedgerCall::BulkRevoke { hashes } => format!("bulkRevoke({} hashes)", hashes.len()),
        }
    }
}

/// Confirmation receipt for a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
}

/// Append-only ledger client.
///
/// Implementations sign with the worker's ledger key. One worker holds one
/// account, so `transaction_count` is the worker's own next nonce.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current network gas price in wei.
    async fn gas_price(&self) -> Result<u128, LedgerError>;

    /// Next nonce for the worker's account.
    async fn transaction_count(&self) -> Result<u64, LedgerError>;

    /// Estimated gas for the call.
    async fn estimate_gas(&self, call: &LedgerCall) -> Result<u64, LedgerError>;

    /// Sign and broadcast. Returns the transaction hash on acceptance.
    async fn send(
        &self,
        call: &LedgerCall,
        gas_price: u128,
        nonce: u64,
    ) -> Result<TxHash, LedgerError>;

    /// Wait until the transaction has at least `confirmations`
    /// confirmations, or fail with [`LedgerError::ConfirmationTimeout`].
    async fn wait_for_transaction(
        &self,
        hash: &str,
        confirmations: u64,
        timeout: Duration,
    ) -> Result<TxReceipt, LedgerError>;

    /// Whether the document's target hash is marked revoked.
    async fn is_revoked(&self, target_hash: &str) -> Result<bool, LedgerError>;
}
