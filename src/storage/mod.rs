//! Storage module for static asset publishing
//!
//! `RemoteStore` is the seam between the sync engine and a bucket. S3 (and
//! S3-compatible stores) are reached through the AWS SDK.

mod memory;
mod s3;
mod store;

pub use memory::{MemoryStore, StoreCall};
pub use s3::S3Store;
pub use store::{object_key, Acl, RemoteStore, StoreError, StoreResult};
