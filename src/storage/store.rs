//! Remote store contract
//!
//! Every backend (S3, S3-compatible, in-memory) implements `RemoteStore`
//! so the sync engine never depends on a concrete client.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::RemoteObject;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Authentication failed for bucket '{bucket}': {message}")]
    Authentication { bucket: String, message: String },

    #[error("Bucket not found: {0}")]
    NotFound(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("{op} failed for '{key}': {message}")]
    Operation {
        op: &'static str,
        key: String,
        message: String,
    },

    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn operation(op: &'static str, key: &str, message: impl Into<String>) -> Self {
        StoreError::Operation {
            op,
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

// ============================================================================
// Access Control
// ============================================================================

/// Canned access control applied to the bucket and to uploaded objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Acl {
    Private,
    #[default]
    PublicRead,
    AuthenticatedRead,
}

impl Acl {
    pub fn as_str(&self) -> &'static str {
        match self {
            Acl::Private => "private",
            Acl::PublicRead => "public-read",
            Acl::AuthenticatedRead => "authenticated-read",
        }
    }
}

impl std::fmt::Display for Acl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Store Trait
// ============================================================================

/// Capability set of a bucket the sync engine can publish into
///
/// `put` always replaces an existing object. `delete` of a key that is not
/// present succeeds, so an interrupted clear can simply be run again.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Bucket name
    fn bucket(&self) -> &str;

    /// Every object currently in the bucket
    async fn list(&self) -> StoreResult<Vec<RemoteObject>>;

    /// Object contents
    async fn get(&self, key: &str) -> StoreResult<Vec<u8>>;

    /// Upload a local file under `key`
    async fn put(&self, key: &str, local_path: &Path, acl: Acl) -> StoreResult<()>;

    /// Remove an object
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Apply a canned ACL to the bucket itself
    async fn set_bucket_acl(&self, acl: Acl) -> StoreResult<()>;
}

/// Object key for a remote key: buckets address objects without a leading `/`
pub fn object_key(remote_key: &str) -> &str {
    remote_key.trim_start_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_strips_leading_slash() {
        assert_eq!(object_key("/static/css/main.css"), "static/css/main.css");
        assert_eq!(object_key("static/a.js"), "static/a.js");
    }

    #[test]
    fn test_acl_strings() {
        assert_eq!(Acl::default(), Acl::PublicRead);
        assert_eq!(Acl::PublicRead.to_string(), "public-read");
        assert_eq!(Acl::Private.as_str(), "private");
    }
}
