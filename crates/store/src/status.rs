//! Read-through document status lookup.
//!
//! A pure read over the same buckets the workers write; the thin lookup
//! API serves this verbatim.

use serde::Serialize;

use crate::{Bucket, StoreError};

/// Where a document currently lives in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Still in the unprocessed bucket, awaiting pickup.
    Pending,
    /// In the backup bucket: pulled off the queue, not yet anchored.
    Processing,
    /// In the final bucket: anchored and saved.
    Processed,
    /// Rejected; a `.reason.json` sidecar explains why.
    Invalid,
    /// Present nowhere.
    NotFound,
}

/// The four buckets a worker writes, by role.
pub struct StatusStores<'a> {
    pub unprocessed: &'a dyn Bucket,
    pub backup: &'a dyn Bucket,
    pub processed: &'a dyn Bucket,
    pub invalid: &'a dyn Bucket,
}

/// Look up which bucket holds `key`.
pub async fn lookup_status(
    stores: &StatusStores<'_>,
    key: &str,
) -> Result<DocumentStatus, StoreError> {
    if stores.unprocessed.get(key).await?.is_some() {
        return Ok(DocumentStatus::Pending);
    }
    if stores.backup.get(key).await?.is_some() {
        return Ok(DocumentStatus::Processing);
    }
    if stores.processed.get(key).await?.is_some() {
        return Ok(DocumentStatus::Processed);
    }
    if stores.invalid.get(key).await?.is_some() {
        return Ok(DocumentStatus::Invalid);
    }
    Ok(DocumentStatus::NotFound)
}
