//! S3 storage client for static assets
//!
//! Works against AWS S3 and any S3-compatible store (R2, MinIO) when a
//! custom endpoint is configured.
//!
//! ## Key Layout
//! ```text
//! {bucket}/
//! ├── static/                 # app mount, url_prefix "/static"
//! │   ├── css/main.css
//! │   └── img/logo.png
//! └── admin/static/           # plugin mount, url_prefix "/admin/static"
//!     └── admin.css
//! ```

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::{
    Client as S3Client,
    config::{BehaviorVersion, Builder, Credentials as S3Credentials, Region},
    error::SdkError,
    primitives::ByteStream,
    types::{BucketCannedAcl, ObjectCannedAcl},
};
use tracing::{debug, info, instrument};

use crate::config::{BucketSettings, Credentials};
use crate::domain::{content_type_for, RemoteObject};

use super::store::{object_key, Acl, RemoteStore, StoreError, StoreResult};

/// Page size for bucket listings
const LIST_PAGE_SIZE: i32 = 1000;

impl From<Acl> for ObjectCannedAcl {
    fn from(acl: Acl) -> Self {
        match acl {
            Acl::Private => ObjectCannedAcl::Private,
            Acl::PublicRead => ObjectCannedAcl::PublicRead,
            Acl::AuthenticatedRead => ObjectCannedAcl::AuthenticatedRead,
        }
    }
}

impl From<Acl> for BucketCannedAcl {
    fn from(acl: Acl) -> Self {
        match acl {
            Acl::Private => BucketCannedAcl::Private,
            Acl::PublicRead => BucketCannedAcl::PublicRead,
            Acl::AuthenticatedRead => BucketCannedAcl::AuthenticatedRead,
        }
    }
}

/// S3 bucket client
#[derive(Clone)]
pub struct S3Store {
    client: S3Client,
    bucket: String,
}

impl S3Store {
    /// Connect to the configured bucket.
    ///
    /// The bucket is probed once so bad credentials or a missing bucket fail
    /// here rather than halfway through a batch.
    #[instrument(skip(settings, credentials), fields(bucket = %settings.name))]
    pub async fn connect(settings: &BucketSettings, credentials: &Credentials) -> StoreResult<Self> {
        let s3_credentials = S3Credentials::new(
            &credentials.access_key_id,
            &credentials.secret_access_key,
            None, // session token
            None, // expiry
            "static-s3-env",
        );

        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(s3_credentials);

        if let Some(endpoint) = settings.endpoint.as_deref() {
            debug!("Using custom S3 endpoint: {}", endpoint);
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let store = Self {
            client: S3Client::from_conf(builder.build()),
            bucket: settings.name.clone(),
        };

        store.probe().await?;
        info!("Connected to bucket {}", store.bucket);

        Ok(store)
    }

    async fn probe(&self) -> StoreResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| self.map_error("head-bucket", &self.bucket, e))?;
        Ok(())
    }

    /// Translate an SDK error into the store taxonomy
    fn map_error<E: fmt::Debug>(&self, op: &'static str, key: &str, err: SdkError<E>) -> StoreError {
        let detail = format!("{:?}", err);

        if is_auth_error(&err, &detail) {
            StoreError::Authentication {
                bucket: self.bucket.clone(),
                message: format!("{} {}: {}", op, key, summarize(&detail)),
            }
        } else if detail.contains("NoSuchBucket") || (op == "head-bucket" && status_of(&err) == Some(404)) {
            StoreError::NotFound(self.bucket.clone())
        } else if is_not_found_error(&err, &detail) && op == "get" {
            StoreError::ObjectNotFound(key.to_string())
        } else {
            StoreError::operation(op, key, summarize(&detail))
        }
    }
}

#[async_trait]
impl RemoteStore for S3Store {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn list(&self) -> StoreResult<Vec<RemoteObject>> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self.client
                .list_objects_v2()
                .bucket(&self.bucket)
                .max_keys(LIST_PAGE_SIZE);

            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let result = request
                .send()
                .await
                .map_err(|e| self.map_error("list", &self.bucket, e))?;

            if let Some(contents) = result.contents {
                for object in contents {
                    if let Some(key) = object.key {
                        objects.push(RemoteObject { key, size: object.size });
                    }
                }
            }

            if result.is_truncated.unwrap_or(false) {
                continuation_token = result.next_continuation_token;
                if continuation_token.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        debug!("Listed {} objects in {}", objects.len(), self.bucket);
        Ok(objects)
    }

    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        let result = self.client
            .get_object()
            .bucket(&self.bucket)
            .key(object_key(key))
            .send()
            .await
            .map_err(|e| self.map_error("get", key, e))?;

        let data = result.body
            .collect()
            .await
            .map_err(|e| StoreError::operation("get", key, format!("Failed to read body: {:?}", e)))?
            .into_bytes()
            .to_vec();

        debug!("Downloaded {} bytes: {}", data.len(), key);
        Ok(data)
    }

    #[instrument(skip(self, local_path), fields(local_path = %local_path.display()))]
    async fn put(&self, key: &str, local_path: &Path, acl: Acl) -> StoreResult<()> {
        let data = tokio::fs::read(local_path)
            .await
            .map_err(|source| StoreError::Io {
                path: local_path.to_path_buf(),
                source,
            })?;
        let size = data.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(object_key(key))
            .body(ByteStream::from(data))
            .content_type(content_type_for(local_path))
            .acl(ObjectCannedAcl::from(acl))
            .send()
            .await
            .map_err(|e| self.map_error("put", key, e))?;

        debug!("Uploaded {} ({} bytes)", key, size);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> StoreResult<()> {
        match self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(object_key(key))
            .send()
            .await
        {
            Ok(_) => {
                debug!("Deleted {}", key);
                Ok(())
            }
            // Already gone is as good as deleted
            Err(e) if status_of(&e) == Some(404) && !format!("{:?}", e).contains("NoSuchBucket") => {
                debug!("Delete of absent key {}", key);
                Ok(())
            }
            Err(e) => Err(self.map_error("delete", key, e)),
        }
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn set_bucket_acl(&self, acl: Acl) -> StoreResult<()> {
        self.client
            .put_bucket_acl()
            .bucket(&self.bucket)
            .acl(BucketCannedAcl::from(acl))
            .send()
            .await
            .map_err(|e| self.map_error("set-acl", &self.bucket, e))?;

        info!("Set bucket ACL to {}", acl);
        Ok(())
    }
}

/// HTTP status of the raw response, when one was received
fn status_of<E>(err: &SdkError<E>) -> Option<u16> {
    err.raw_response().map(|response| response.status().as_u16())
}

/// Helper to check if an SDK error is an authentication failure
fn is_auth_error<E>(err: &SdkError<E>, detail: &str) -> bool {
    matches!(status_of(err), Some(401) | Some(403))
        || detail.contains("InvalidAccessKeyId")
        || detail.contains("SignatureDoesNotMatch")
        || detail.contains("AccessDenied")
}

/// Helper to check if an SDK error is a "not found" error
fn is_not_found_error<E>(err: &SdkError<E>, detail: &str) -> bool {
    status_of(err) == Some(404) || detail.contains("NoSuchKey") || detail.contains("NotFound")
}

/// First line of an SDK debug dump, which can run to several kilobytes
fn summarize(detail: &str) -> String {
    const MAX: usize = 300;
    let line = detail.lines().next().unwrap_or(detail);
    if line.len() <= MAX {
        line.to_string()
    } else {
        let mut end = MAX;
        while !line.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &line[..end])
    }
}
