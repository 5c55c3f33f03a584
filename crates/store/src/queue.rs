//! At-least-once work queue delivering object-created notifications.
//!
//! Messages are redelivered after their visibility timeout unless deleted,
//! so the compose loop deletes a message only once its document has been
//! classified as valid or invalid.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// The only actionable event type.
pub const OBJECT_CREATED_PUT: &str = "ObjectCreated:Put";

/// Queue receive parameters. `wait_time_secs` must stay in the queue's
/// allowed long-poll range (1-20s); callers clamp before use.
#[derive(Debug, Clone, Copy)]
pub struct ReceiveOptions {
    pub wait_time_secs: u64,
    pub visibility_timeout_secs: u64,
}

/// A received queue message, deleted by its receipt handle.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub body: String,
    pub receipt_handle: String,
}

/// Work queue with visibility timeout and explicit delete-on-ack.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Receive at most one message, long-polling up to `wait_time_secs`.
    async fn receive(&self, opts: &ReceiveOptions) -> Result<Option<QueueMessage>, StoreError>;

    /// Acknowledge a message so it is never redelivered.
    async fn delete(&self, receipt_handle: &str) -> Result<(), StoreError>;
}

// ─── Notification wire format ──────────────────────────────────────

/// Body of an object-created notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default)]
    pub records: Vec<NotificationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    #[serde(rename = "eventName")]
    pub event_name: String,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Entity {
    pub object: S3Object,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Object {
    pub key: String,
    pub size: u64,
    #[serde(rename = "eTag", default)]
    pub e_tag: String,
}

impl Notification {
    /// Build a single-record created-object notification (tests, tooling).
    pub fn object_created(key: &str, size: u64) -> Self {
        Self {
            records: vec![NotificationRecord {
                event_name: OBJECT_CREATED_PUT.to_string(),
                s3: S3Entity {
                    object: S3Object {
                        key: key.to_string(),
                        size,
                        e_tag: String::new(),
                    },
                },
            }],
        }
    }

    /// The created object, iff this is exactly one `ObjectCreated:Put`
    /// record. Anything else is not actionable.
    pub fn created_object(&self) -> Option<&S3Object> {
        match self.records.as_slice() {
            [record] if record.event_name == OBJECT_CREATED_PUT => Some(&record.s3.object),
            _ => None,
        }
    }
}

// ─── In-memory queue ───────────────────────────────────────────────

struct QueuedMessage {
    id: u64,
    body: String,
    invisible_until: Option<Instant>,
}

/// In-memory queue for tests, modeling visibility timeouts.
pub struct MemoryQueue {
    messages: Mutex<VecDeque<QueuedMessage>>,
    next_id: Mutex<u64>,
    failures: Mutex<u32>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(VecDeque::new()),
            next_id: Mutex::new(0),
            failures: Mutex::new(0),
        }
    }

    pub fn push(&self, body: String) {
        let mut next_id = self.next_id.lock().unwrap();
        let id = *next_id;
        *next_id += 1;
        self.messages.lock().unwrap().push_back(QueuedMessage {
            id,
            body,
            invisible_until: None,
        });
    }

    /// Enqueue an object-created notification for `key`.
    pub fn push_created(&self, key: &str, size: u64) {
        let body = serde_json::to_string(&Notification::object_created(key, size))
            .expect("notification serializes");
        self.push(body);
    }

    /// Messages still on the queue (visible or in flight).
    pub fn len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().unwrap().is_empty()
    }

    /// Make the next `n` receives fail as transient.
    pub fn fail_next(&self, n: u32) {
        *self.failures.lock().unwrap() = n;
    }

    fn try_receive(&self, visibility: Duration) -> Option<QueueMessage> {
        let now = Instant::now();
        let mut messages = self.messages.lock().unwrap();
        let msg = messages
            .iter_mut()
            .find(|m| m.invisible_until.map_or(true, |t| t <= now))?;
        msg.invisible_until = Some(now + visibility);
        Some(QueueMessage {
            body: msg.body.clone(),
            receipt_handle: msg.id.to_string(),
        })
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    async fn receive(&self, opts: &ReceiveOptions) -> Result<Option<QueueMessage>, StoreError> {
        {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(StoreError::Queue("injected failure".into()));
            }
        }

        let visibility = Duration::from_secs(opts.visibility_timeout_secs);
        let deadline = Instant::now() + Duration::from_secs(opts.wait_time_secs);
        loop {
            if let Some(msg) = self.try_receive(visibility) {
                return Ok(Some(msg));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), StoreError> {
        let id: u64 = receipt_handle
            .parse()
            .map_err(|_| StoreError::InvalidReceipt(receipt_handle.to_string()))?;
        self.messages.lock().unwrap().retain(|m| m.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPTS: ReceiveOptions = ReceiveOptions {
        wait_time_secs: 0,
        visibility_timeout_secs: 30,
    };

    #[tokio::test]
    async fn test_receive_and_delete() {
        let queue = MemoryQueue::new();
        queue.push_created("doc-1.json", 42);

        let msg = queue.receive(&OPTS).await.unwrap().unwrap();
        let notification: Notification = serde_json::from_str(&msg.body).unwrap();
        let object = notification.created_object().unwrap();
        assert_eq!(object.key, "doc-1.json");
        assert_eq!(object.size, 42);

        queue.delete(&msg.receipt_handle).await.unwrap();
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_visibility_timeout_hides_message() {
        let queue = MemoryQueue::new();
        queue.push_created("doc-1.json", 1);

        assert!(queue.receive(&OPTS).await.unwrap().is_some());
        // In flight: not redelivered while invisible.
        assert!(queue.receive(&OPTS).await.unwrap().is_none());
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_undeleted_message_redelivered() {
        let queue = MemoryQueue::new();
        queue.push_created("doc-1.json", 1);

        let opts = ReceiveOptions {
            wait_time_secs: 0,
            visibility_timeout_secs: 0,
        };
        assert!(queue.receive(&opts).await.unwrap().is_some());
        assert!(queue.receive(&opts).await.unwrap().is_some());
    }

    #[test]
    fn test_non_actionable_notifications() {
        // Wrong event type.
        let mut n = Notification::object_created("k", 1);
        n.records[0].event_name = "ObjectRemoved:Delete".to_string();
        assert!(n.created_object().is_none());

        // More than one record.
        let mut n = Notification::object_created("k", 1);
        n.records.push(n.records[0].clone());
        assert!(n.created_object().is_none());

        // No records.
        let n = Notification { records: vec![] };
        assert!(n.created_object().is_none());
    }

    #[test]
    fn test_notification_field_names() {
        let json = serde_json::to_string(&Notification::object_created("k", 9)).unwrap();
        assert!(json.contains("\"eventName\""));
        assert!(json.contains("\"eTag\""));
    }
}
