//! Gas-price-escalating transaction submission.
//!
//! One submission walks `IDLE → SENDING → WAITING` until the transaction
//! confirms. A confirmation timeout or an underpriced rejection escalates
//! the gas price multiplicatively and re-enters `SENDING`; every other
//! failure retries the send-and-wait sequence without escalating. The
//! escalation state lives in an explicit struct that survives the outer
//! retry loop, so a retry never resets the price or forgets an
//! already-broadcast transaction.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::client::{LedgerCall, LedgerClient, TxHash, TxReceipt, GWEI};
use crate::LedgerError;

/// Submission tuning. All values come from worker configuration.
#[derive(Debug, Clone)]
pub struct SubmitterConfig {
    /// Factor applied to the multiplier on each escalation.
    pub gas_price_multiplier: f64,
    /// Hard ceiling on the gas price, in gwei.
    pub gas_price_limit_gwei: u64,
    /// How long one `WAITING` phase lasts.
    pub transaction_timeout: Duration,
    /// Required confirmation depth.
    pub confirmations: u64,
    /// Outer attempts over the whole send-and-wait sequence.
    pub attempts: u32,
    /// Fixed sleep between outer attempts.
    pub retry_interval: Duration,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            gas_price_multiplier: 1.2,
            gas_price_limit_gwei: 200,
            transaction_timeout: Duration::from_secs(180),
            confirmations: 1,
            attempts: 10,
            retry_interval: Duration::from_secs(10),
        }
    }
}

/// Escalation state for one submission. Survives outer retries.
#[derive(Debug, Clone, Default)]
pub struct EscalationState {
    pub attempt: u32,
    pub multiplier: f64,
    pub gas_price: u128,
    /// Price of the last transaction actually broadcast.
    pub last_gas_price: Option<u128>,
    /// Hash of the broadcast-but-unconfirmed transaction, if any.
    pub pending: Option<TxHash>,
}

impl EscalationState {
    pub fn new() -> Self {
        Self {
            attempt: 0,
            multiplier: 1.0,
            gas_price: 0,
            last_gas_price: None,
            pending: None,
        }
    }
}

/// Submits one ledger call, escalating the gas price until confirmation,
/// the price cap, or attempt exhaustion.
pub struct TransactionSubmitter {
    ledger: Arc<dyn LedgerClient>,
    config: SubmitterConfig,
}

impl TransactionSubmitter {
    pub fn new(ledger: Arc<dyn LedgerClient>, config: SubmitterConfig) -> Self {
        Self { ledger, config }
    }

    fn limit_wei(&self) -> u128 {
        u128::from(self.config.gas_price_limit_gwei) * GWEI
    }

    /// Submit the call and wait for confirmation.
    pub async fn submit(&self, call: &LedgerCall) -> Result<TxReceipt, LedgerError> {
        let mut state = EscalationState::new();
        loop {
            state.attempt += 1;
            match self.send_and_wait(call, &mut state).await {
                Ok(receipt) => {
                    self.on_complete(call, &receipt, &state);
                    return Ok(receipt);
                }
                Err(e) => {
                    if state.attempt >= self.config.attempts {
                        self.on_failure(call, &e, &state);
                        return Err(e);
                    }
                    if e.escalates() {
                        self.escalate(&mut state);
                        warn!(
                            call = %call.describe(),
                            attempt = state.attempt,
                            multiplier = state.multiplier,
                            error = %e,
                            "submission not confirmed, escalating gas price"
                        );
                    } else {
                        warn!(
                            call = %call.describe(),
                            attempt = state.attempt,
                            error = %e,
                            "submission attempt failed"
                        );
                    }
                    tokio::time::sleep(self.config.retry_interval).await;
                }
            }
        }
    }

    /// One `SENDING` + `WAITING` pass.
    async fn send_and_wait(
        &self,
        call: &LedgerCall,
        state: &mut EscalationState,
    ) -> Result<TxReceipt, LedgerError> {
        let limit = self.limit_wei();

        // Recompute the price from the live network price, never letting it
        // move backwards and never past the cap.
        let network = self.ledger.gas_price().await?;
        let proposed = (network as f64 * state.multiplier) as u128;
        state.gas_price = state.gas_price.max(proposed).min(limit);

        // Broadcast only if the price moved since the last broadcast. Once a
        // transaction at the cap is outstanding there is nothing left to
        // escalate; keep waiting on it.
        let should_send = match state.last_gas_price {
            None => true,
            Some(last) => state.gas_price > last,
        };

        if should_send {
            self.ledger.estimate_gas(call).await?;
            let nonce = self.ledger.transaction_count().await?;
            match self.ledger.send(call, state.gas_price, nonce).await {
                Ok(hash) => {
                    info!(
                        call = %call.describe(),
                        tx = %hash,
                        gas_price_gwei = (state.gas_price / GWEI) as u64,
                        nonce,
                        "transaction broadcast"
                    );
                    state.pending = Some(hash);
                    state.last_gas_price = Some(state.gas_price);
                }
                // A prior broadcast made it to the node despite a
                // client-side error; the pending handle stays authoritative.
                Err(LedgerError::KnownTransaction) if state.pending.is_some() => {
                    info!(call = %call.describe(), "transaction already known, keeping pending handle");
                }
                Err(e) => return Err(e),
            }
        }

        let pending = state
            .pending
            .clone()
            .ok_or_else(|| LedgerError::Rpc("no pending transaction to wait on".to_string()))?;

        self.ledger
            .wait_for_transaction(
                &pending,
                self.config.confirmations,
                self.config.transaction_timeout,
            )
            .await
    }

    /// Raise the multiplier while the price is still below the cap. The
    /// price itself is recomputed on the next `SENDING` entry.
    fn escalate(&self, state: &mut EscalationState) {
        if state.gas_price < self.limit_wei() {
            state.multiplier *= self.config.gas_price_multiplier;
        }
    }

    fn on_complete(&self, call: &LedgerCall, receipt: &TxReceipt, state: &EscalationState) {
        info!(
            call = %call.describe(),
            tx = %receipt.tx_hash,
            block = receipt.block_number,
            attempts = state.attempt,
            "transaction confirmed"
        );
    }

    fn on_failure(&self, call: &LedgerCall, error: &LedgerError, state: &EscalationState) {
        error!(
            call = %call.describe(),
            attempts = state.attempt,
            pending = state.pending.as_deref().unwrap_or("-"),
            error = %error,
            "submission attempts exhausted"
        );
    }
}
