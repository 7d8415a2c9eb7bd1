//! In-process store
//!
//! Holds objects in a map and records every call, which makes it the
//! backend of choice for exercising the sync engine without a network.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use crate::domain::RemoteObject;

use super::store::{object_key, Acl, RemoteStore, StoreError, StoreResult};

/// A call made against a [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List,
    Get(String),
    Put { key: String, acl: Acl },
    Delete(String),
    SetBucketAcl(Acl),
}

/// Object store backed by a `BTreeMap`
#[derive(Default)]
pub struct MemoryStore {
    bucket: String,
    objects: Mutex<BTreeMap<String, Bytes>>,
    calls: Mutex<Vec<StoreCall>>,
    bucket_acl: Mutex<Option<Acl>>,
    fail_put_on: Option<String>,
    fail_delete_on: Option<String>,
}

impl MemoryStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            ..Default::default()
        }
    }

    /// Seed an object
    pub fn with_object(self, key: &str, data: impl Into<Bytes>) -> Self {
        self.objects.lock().insert(object_key(key).to_string(), data.into());
        self
    }

    /// Make `put` fail for one key
    pub fn fail_put_on(mut self, key: &str) -> Self {
        self.fail_put_on = Some(key.to_string());
        self
    }

    /// Make `delete` fail for one key
    pub fn fail_delete_on(mut self, key: &str) -> Self {
        self.fail_delete_on = Some(key.to_string());
        self
    }

    /// Calls made so far, in order
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    /// Keys currently stored
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().keys().cloned().collect()
    }

    pub fn bucket_acl(&self) -> Option<Acl> {
        *self.bucket_acl.lock()
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list(&self) -> StoreResult<Vec<RemoteObject>> {
        self.record(StoreCall::List);
        Ok(self
            .objects
            .lock()
            .iter()
            .map(|(key, data)| RemoteObject {
                key: key.clone(),
                size: Some(data.len() as i64),
            })
            .collect())
    }

    async fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        self.record(StoreCall::Get(key.to_string()));
        self.objects
            .lock()
            .get(object_key(key))
            .map(|data| data.to_vec())
            .ok_or_else(|| StoreError::ObjectNotFound(key.to_string()))
    }

    async fn put(&self, key: &str, local_path: &Path, acl: Acl) -> StoreResult<()> {
        self.record(StoreCall::Put {
            key: key.to_string(),
            acl,
        });

        if self.fail_put_on.as_deref() == Some(key) {
            return Err(StoreError::operation("put", key, "injected failure"));
        }

        let data = tokio::fs::read(local_path)
            .await
            .map_err(|source| StoreError::Io {
                path: local_path.to_path_buf(),
                source,
            })?;

        debug!("Stored {} ({} bytes) in memory", key, data.len());
        self.objects.lock().insert(object_key(key).to_string(), Bytes::from(data));
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.record(StoreCall::Delete(key.to_string()));

        if self.fail_delete_on.as_deref() == Some(key) {
            return Err(StoreError::operation("delete", key, "injected failure"));
        }

        self.objects.lock().remove(object_key(key));
        Ok(())
    }

    async fn set_bucket_acl(&self, acl: Acl) -> StoreResult<()> {
        self.record(StoreCall::SetBucketAcl(acl));
        *self.bucket_acl.lock() = Some(acl);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::block_on;

    #[test]
    fn test_put_get_roundtrip_replaces() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.css");
        std::fs::write(&path, "body{}").unwrap();

        let store = MemoryStore::new("static").with_object("/static/a.css", "old");
        block_on(store.put("/static/a.css", &path, Acl::PublicRead)).unwrap();

        assert_eq!(block_on(store.get("/static/a.css")).unwrap(), b"body{}");
        assert_eq!(store.keys(), vec!["static/a.css".to_string()]);
    }

    #[test]
    fn test_delete_missing_key_is_noop() {
        let store = MemoryStore::new("static");
        block_on(store.delete("never/there.js")).unwrap();
        assert_eq!(store.calls(), vec![StoreCall::Delete("never/there.js".into())]);
    }

    #[test]
    fn test_get_missing_key() {
        let store = MemoryStore::new("static");
        assert!(matches!(
            block_on(store.get("nope")),
            Err(StoreError::ObjectNotFound(_))
        ));
    }
}
