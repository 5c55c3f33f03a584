//! In-memory ledger for tests. Records all submitted transactions and
//! supports scripting send/wait outcomes to drive the escalation paths.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::client::{LedgerCall, LedgerClient, TxHash, TxReceipt, GWEI};
use crate::LedgerError;

/// Scripted outcome for one `send` call.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    Accept,
    Underpriced,
    Known,
    Rpc(String),
}

/// Scripted outcome for one `wait_for_transaction` call.
#[derive(Debug, Clone)]
pub enum WaitOutcome {
    Confirm,
    Timeout,
    Rpc(String),
}

/// One broadcast transaction, as recorded by the ledger.
#[derive(Debug, Clone)]
pub struct SentTx {
    pub hash: TxHash,
    pub call: LedgerCall,
    pub gas_price: u128,
    pub nonce: u64,
}

struct Inner {
    gas_price: u128,
    nonce: u64,
    block: u64,
    revoked: HashSet<String>,
    issued_roots: Vec<String>,
    sent: Vec<SentTx>,
    wait_calls: Vec<TxHash>,
    send_script: VecDeque<SendOutcome>,
    wait_script: VecDeque<WaitOutcome>,
    rpc_failures: u32,
}

/// Scriptable in-memory ledger. Unscripted sends are accepted and
/// unscripted waits confirm immediately, applying the call's effects
/// (issued root recorded, revoked hashes marked).
pub struct MemoryLedger {
    inner: Mutex<Inner>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                gas_price: 20 * GWEI,
                nonce: 0,
                block: 1,
                revoked: HashSet::new(),
                issued_roots: Vec::new(),
                sent: Vec::new(),
                wait_calls: Vec::new(),
                send_script: VecDeque::new(),
                wait_script: VecDeque::new(),
                rpc_failures: 0,
            }),
        }
    }

    pub fn set_gas_price(&self, wei: u128) {
        self.inner.lock().unwrap().gas_price = wei;
    }

    /// Queue outcomes for upcoming `send` calls.
    pub fn script_send(&self, outcomes: impl IntoIterator<Item = SendOutcome>) {
        self.inner.lock().unwrap().send_script.extend(outcomes);
    }

    /// Queue outcomes for upcoming `wait_for_transaction` calls.
    pub fn script_wait(&self, outcomes: impl IntoIterator<Item = WaitOutcome>) {
        self.inner.lock().unwrap().wait_script.extend(outcomes);
    }

    /// Make the next `n` RPC reads (gas price, nonce, estimate,
    /// `is_revoked`) fail as transient.
    pub fn fail_next_rpc(&self, n: u32) {
        self.inner.lock().unwrap().rpc_failures = n;
    }

    /// Mark a target hash revoked out of band.
    pub fn mark_revoked(&self, target_hash: &str) {
        self.inner
            .lock()
            .unwrap()
            .revoked
            .insert(target_hash.to_string());
    }

    pub fn issued_roots(&self) -> Vec<String> {
        self.inner.lock().unwrap().issued_roots.clone()
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.inner.lock().unwrap().sent.clone()
    }

    pub fn wait_calls(&self) -> Vec<TxHash> {
        self.inner.lock().unwrap().wait_calls.clone()
    }

    fn check_rpc_failure(inner: &mut Inner) -> Result<(), LedgerError> {
        if inner.rpc_failures > 0 {
            inner.rpc_failures -= 1;
            return Err(LedgerError::Rpc("injected failure".into()));
        }
        Ok(())
    }

    fn apply_effects(inner: &mut Inner, hash: &str) {
        let Some(tx) = inner.sent.iter().find(|t| t.hash == hash).cloned() else {
            return;
        };
        match tx.call {
            LedgerCall::Issue { root } => inner.issued_roots.push(root),
            LedgerCall::BulkRevoke { hashes } => inner.revoked.extend(hashes),
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn gas_price(&self) -> Result<u128, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_rpc_failure(&mut inner)?;
        Ok(inner.gas_price)
    }

    async fn transaction_count(&self) -> Result<u64, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_rpc_failure(&mut inner)?;
        Ok(inner.nonce)
    }

    async fn estimate_gas(&self, _call: &LedgerCall) -> Result<u64, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_rpc_failure(&mut inner)?;
        Ok(60_000)
    }

    async fn send(
        &self,
        call: &LedgerCall,
        gas_price: u128,
        nonce: u64,
    ) -> Result<TxHash, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.send_script.pop_front() {
            Some(SendOutcome::Underpriced) => return Err(LedgerError::Underpriced),
            Some(SendOutcome::Known) => return Err(LedgerError::KnownTransaction),
            Some(SendOutcome::Rpc(msg)) => return Err(LedgerError::Rpc(msg)),
            Some(SendOutcome::Accept) | None => {}
        }
        let hash = format!("0x{:064x}", inner.sent.len() + 1);
        inner.sent.push(SentTx {
            hash: hash.clone(),
            call: call.clone(),
            gas_price,
            nonce,
        });
        inner.nonce = nonce + 1;
        Ok(hash)
    }

    async fn wait_for_transaction(
        &self,
        hash: &str,
        _confirmations: u64,
        _timeout: Duration,
    ) -> Result<TxReceipt, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        inner.wait_calls.push(hash.to_string());
        match inner.wait_script.pop_front() {
            Some(WaitOutcome::Timeout) => {
                return Err(LedgerError::ConfirmationTimeout(hash.to_string()))
            }
            Some(WaitOutcome::Rpc(msg)) => return Err(LedgerError::Rpc(msg)),
            Some(WaitOutcome::Confirm) | None => {}
        }
        Self::apply_effects(&mut inner, hash);
        inner.block += 1;
        Ok(TxReceipt {
            tx_hash: hash.to_string(),
            block_number: inner.block,
        })
    }

    async fn is_revoked(&self, target_hash: &str) -> Result<bool, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_rpc_failure(&mut inner)?;
        Ok(inner.revoked.contains(target_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_confirmed_issue_records_root() {
        let ledger = MemoryLedger::new();
        let call = LedgerCall::Issue {
            root: "abc".to_string(),
        };
        let hash = ledger.send(&call, GWEI, 0).await.unwrap();
        ledger
            .wait_for_transaction(&hash, 1, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(ledger.issued_roots(), vec!["abc".to_string()]);
    }

    #[tokio::test]
    async fn test_confirmed_revoke_marks_hashes() {
        let ledger = MemoryLedger::new();
        assert!(!ledger.is_revoked("h1").await.unwrap());
        let call = LedgerCall::BulkRevoke {
            hashes: vec!["h1".to_string(), "h2".to_string()],
        };
        let hash = ledger.send(&call, GWEI, 0).await.unwrap();
        ledger
            .wait_for_transaction(&hash, 1, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(ledger.is_revoked("h1").await.unwrap());
        assert!(ledger.is_revoked("h2").await.unwrap());
    }

    #[tokio::test]
    async fn test_scripted_outcomes() {
        let ledger = MemoryLedger::new();
        ledger.script_send([SendOutcome::Underpriced]);
        let call = LedgerCall::Issue {
            root: "r".to_string(),
        };
        assert!(matches!(
            ledger.send(&call, GWEI, 0).await,
            Err(LedgerError::Underpriced)
        ));
        // Script consumed; next send is accepted.
        assert!(ledger.send(&call, GWEI, 0).await.is_ok());
    }
}
