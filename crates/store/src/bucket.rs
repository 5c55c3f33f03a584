//! Durable key-value object storage.
//!
//! `get` distinguishes "object gone" (`Ok(None)`) from "store unreachable"
//! (`Err`): the compose loop drops events whose object vanished between
//! notification and download, but must retry when the store itself is down.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::StoreError;

/// A stored object body with its size in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub size: u64,
}

/// Key and size of a listed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
}

/// One page of a listing. `next_token` is `Some` while more pages remain.
#[derive(Debug, Clone)]
pub struct ListPage {
    pub objects: Vec<ObjectSummary>,
    pub next_token: Option<String>,
}

/// Durable object store with list/get/put/delete.
#[async_trait]
pub trait Bucket: Send + Sync {
    /// Fetch an object. `Ok(None)` means the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StoreError>;

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError>;

    /// Delete an object. `Ok(false)` means the key did not exist.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// List one page of objects, optionally under a prefix.
    async fn list_page(
        &self,
        prefix: Option<&str>,
        token: Option<&str>,
    ) -> Result<ListPage, StoreError>;
}

/// In-memory bucket for tests.
///
/// Supports scripted transient failures: `fail_next(n)` makes the next `n`
/// operations return `StoreError::Unavailable`, which is how the retry
/// behavior of the pipeline stages is exercised.
pub struct MemoryBucket {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    page_size: usize,
    failures: Mutex<u32>,
}

impl MemoryBucket {
    pub fn new() -> Self {
        Self::with_page_size(1000)
    }

    /// Small page sizes force the pagination path in tests.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            page_size,
            failures: Mutex::new(0),
        }
    }

    /// Make the next `n` operations fail as transient.
    pub fn fail_next(&self, n: u32) {
        *self.failures.lock().unwrap() = n;
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().unwrap().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// Synchronous insert for test setup.
    pub fn insert(&self, key: &str, body: impl Into<Vec<u8>>) {
        self.objects.lock().unwrap().insert(key.to_string(), body.into());
    }

    fn check_failure(&self) -> Result<(), StoreError> {
        let mut failures = self.failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        Ok(())
    }
}

impl Default for MemoryBucket {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Bucket for MemoryBucket {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StoreError> {
        self.check_failure()?;
        let objects = self.objects.lock().unwrap();
        Ok(objects.get(key).map(|body| StoredObject {
            size: body.len() as u64,
            body: body.clone(),
        }))
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        self.check_failure()?;
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.check_failure()?;
        Ok(self.objects.lock().unwrap().remove(key).is_some())
    }

    async fn list_page(
        &self,
        prefix: Option<&str>,
        token: Option<&str>,
    ) -> Result<ListPage, StoreError> {
        self.check_failure()?;
        let objects = self.objects.lock().unwrap();
        let matching = objects
            .iter()
            .filter(|(k, _)| prefix.map_or(true, |p| k.starts_with(p)))
            // BTreeMap iterates in key order, so a key token resumes cleanly.
            .filter(|(k, _)| token.map_or(true, |t| k.as_str() > t));

        let mut page: Vec<ObjectSummary> = matching
            .take(self.page_size + 1)
            .map(|(k, v)| ObjectSummary {
                key: k.clone(),
                size: v.len() as u64,
            })
            .collect();

        let next_token = if page.len() > self.page_size {
            page.truncate(self.page_size);
            page.last().map(|o| o.key.clone())
        } else {
            None
        };

        Ok(ListPage {
            objects: page,
            next_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_put_delete() {
        let bucket = MemoryBucket::new();
        assert!(bucket.get("a").await.unwrap().is_none());

        bucket.put("a", b"hello".to_vec()).await.unwrap();
        let obj = bucket.get("a").await.unwrap().unwrap();
        assert_eq!(obj.body, b"hello");
        assert_eq!(obj.size, 5);

        assert!(bucket.delete("a").await.unwrap());
        assert!(!bucket.delete("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let bucket = MemoryBucket::with_page_size(2);
        for i in 0..5 {
            bucket.insert(&format!("doc-{i}"), vec![0u8; 10]);
        }

        let mut seen = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = bucket.list_page(None, token.as_deref()).await.unwrap();
            seen.extend(page.objects.into_iter().map(|o| o.key));
            match page.next_token {
                Some(t) => token = Some(t),
                None => break,
            }
        }
        assert_eq!(seen.len(), 5);
        assert_eq!(seen[0], "doc-0");
        assert_eq!(seen[4], "doc-4");
    }

    #[tokio::test]
    async fn test_list_prefix() {
        let bucket = MemoryBucket::new();
        bucket.insert("issue/a", b"1".to_vec());
        bucket.insert("issue/b", b"2".to_vec());
        bucket.insert("revoke/c", b"3".to_vec());

        let page = bucket.list_page(Some("issue/"), None).await.unwrap();
        assert_eq!(page.objects.len(), 2);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let bucket = MemoryBucket::new();
        bucket.fail_next(1);
        assert!(matches!(
            bucket.get("a").await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(bucket.get("a").await.is_ok());
    }
}
