//! Invalid-document bookkeeping.
//!
//! A rejected document leaves two objects in the invalid store: its raw
//! body, byte for byte, at the original key, and a `{reason}` sidecar at
//! `<key-without-extension>.reason.json` so operators can audit rejections
//! without reading logs.

use serde_json::{json, Value};
use sigil_store::Bucket;
use tracing::info;

use crate::WorkerError;

/// Sidecar key for a rejected document.
pub fn reason_key(key: &str) -> String {
    let base = match key.rsplit_once('.') {
        Some((base, _ext)) => base,
        None => key,
    };
    format!("{base}.reason.json")
}

/// Record a rejected document and its reason.
pub async fn record_invalid(
    invalid: &dyn Bucket,
    key: &str,
    raw_body: Vec<u8>,
    reason: &str,
    detail: Option<Value>,
) -> Result<(), WorkerError> {
    info!(key, reason, "document rejected");

    let mut record = json!({ "reason": reason });
    if let Some(detail) = detail {
        record["detail"] = detail;
    }
    let sidecar =
        serde_json::to_vec(&record).map_err(|e| WorkerError::Serialization(e.to_string()))?;

    invalid.put(key, raw_body).await?;
    invalid.put(&reason_key(key), sidecar).await?;
    Ok(())
}
