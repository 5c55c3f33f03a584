//! Worker configuration, persisted through `sigil_settings::Settings`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sigil_core::{Address, Operation, RetryPolicy, SchemaVersion};
use sigil_ledger::SubmitterConfig;
use sigil_store::ReceiveOptions;

/// All tunables for one worker instance. One instance runs exactly one
/// operation against one document store address; issue and revoke workers
/// are separate processes with disjoint buckets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub operation: Operation,
    pub schema_version: SchemaVersion,
    pub document_store_address: Address,
    pub ledger_rpc_url: String,

    // Storage and queue identifiers.
    pub queue_url: String,
    pub unprocessed_bucket: String,
    pub backup_bucket: String,
    pub invalid_bucket: String,
    pub processed_bucket: String,

    // Batch completion thresholds.
    pub batch_size_bytes: u64,
    pub batch_time_seconds: u64,

    // Queue polling.
    pub queue_wait_time_seconds: u64,
    pub queue_visibility_timeout_seconds: u64,

    // Per-stage retry budgets.
    pub restore_attempts: u32,
    pub restore_interval_seconds: u64,
    pub compose_attempts: u32,
    pub compose_interval_seconds: u64,
    pub save_attempts: u32,
    pub save_interval_seconds: u64,

    // Ledger submission.
    pub gas_price_multiplier: f64,
    pub gas_price_limit_gwei: u64,
    pub transaction_timeout_seconds: u64,
    pub transaction_confirmation_threshold: u64,
    pub transaction_attempts: u32,
    pub transaction_interval_seconds: u64,

    // Supervision loop.
    pub cycle_pause_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            operation: Operation::Issue,
            schema_version: SchemaVersion::V2,
            document_store_address: String::new(),
            ledger_rpc_url: "http://localhost:8545".to_string(),
            queue_url: String::new(),
            unprocessed_bucket: "unprocessed".to_string(),
            backup_bucket: "backup".to_string(),
            invalid_bucket: "invalid".to_string(),
            processed_bucket: "processed".to_string(),
            batch_size_bytes: 10 * 1024 * 1024,
            batch_time_seconds: 600,
            queue_wait_time_seconds: 10,
            queue_visibility_timeout_seconds: 60,
            restore_attempts: 3,
            restore_interval_seconds: 5,
            compose_attempts: 3,
            compose_interval_seconds: 5,
            save_attempts: 3,
            save_interval_seconds: 5,
            gas_price_multiplier: 1.2,
            gas_price_limit_gwei: 200,
            transaction_timeout_seconds: 180,
            transaction_confirmation_threshold: 1,
            transaction_attempts: 10,
            transaction_interval_seconds: 10,
            cycle_pause_seconds: 5,
        }
    }
}

impl WorkerConfig {
    /// Queue receive parameters, with the wait time clamped into the
    /// queue's allowed long-poll range.
    pub fn receive_options(&self) -> ReceiveOptions {
        ReceiveOptions {
            wait_time_secs: self.queue_wait_time_seconds.clamp(1, 20),
            visibility_timeout_secs: self.queue_visibility_timeout_seconds,
        }
    }

    pub fn restore_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.restore_attempts,
            Duration::from_secs(self.restore_interval_seconds),
        )
    }

    pub fn compose_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.compose_attempts,
            Duration::from_secs(self.compose_interval_seconds),
        )
    }

    pub fn save_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.save_attempts,
            Duration::from_secs(self.save_interval_seconds),
        )
    }

    pub fn submitter_config(&self) -> SubmitterConfig {
        SubmitterConfig {
            gas_price_multiplier: self.gas_price_multiplier,
            gas_price_limit_gwei: self.gas_price_limit_gwei,
            transaction_timeout: Duration::from_secs(self.transaction_timeout_seconds),
            confirmations: self.transaction_confirmation_threshold,
            attempts: self.transaction_attempts,
            retry_interval: Duration::from_secs(self.transaction_interval_seconds),
        }
    }
}
