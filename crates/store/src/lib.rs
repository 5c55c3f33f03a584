//! Sigil Store
//!
//! The object-store (`Bucket`) and work-queue (`Queue`) seams the workers
//! run against, the S3-style object-created notification format, and
//! in-memory implementations used by tests. One `Bucket` per named role:
//! unprocessed, batch-backup, invalid-documents, processed.

pub mod bucket;
pub mod queue;
pub mod status;

use sigil_core::Transient;
use thiserror::Error;

pub use bucket::{Bucket, ListPage, MemoryBucket, ObjectSummary, StoredObject};
pub use queue::{
    MemoryQueue, Notification, NotificationRecord, Queue, QueueMessage, ReceiveOptions, S3Object,
    OBJECT_CREATED_PUT,
};
pub use status::{lookup_status, DocumentStatus, StatusStores};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Queue error: {0}")]
    Queue(String),
    #[error("Invalid receipt handle: {0}")]
    InvalidReceipt(String),
}

impl Transient for StoreError {
    fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Queue(_))
    }
}
