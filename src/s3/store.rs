//! Object storage capability
//!
//! [`ObjectStore`] names every call the client makes against the storage
//! service, so the client can run against AWS S3, MinIO or an in-memory
//! backend without changes:
//! - Production: [`crate::s3::AwsObjectStore`] on top of `aws-sdk-s3`
//! - Testing: [`crate::s3::InMemoryObjectStore`]

use async_trait::async_trait;
use std::path::Path;

use crate::s3::error::StorageResult;
use crate::s3::lifecycle::LifecycleRule;
use crate::s3::types::{ObjectListing, ObjectMetadata};

/// Abstraction over the S3 calls used by [`crate::s3::StorageClient`].
///
/// Every method is a single request to the service. Implementations must
/// not cache results or retry beyond what the underlying transport does.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Replace the bucket policy with `policy_json`.
    async fn put_bucket_policy(&self, bucket: &str, policy_json: &str) -> StorageResult<()>;

    /// Enable or suspend versioning on the bucket.
    async fn put_bucket_versioning(&self, bucket: &str, enabled: bool) -> StorageResult<()>;

    /// Replace the bucket lifecycle configuration with `rules`.
    async fn put_bucket_lifecycle(&self, bucket: &str, rules: &[LifecycleRule])
        -> StorageResult<()>;

    /// Store the contents of `path` under `key`, overwriting any existing object.
    async fn upload_file(&self, bucket: &str, key: &str, path: &Path) -> StorageResult<()>;

    /// Write the object stored under `key` to `path`.
    async fn download_file(&self, bucket: &str, key: &str, path: &Path) -> StorageResult<()>;

    /// Fetch one page of object keys.
    ///
    /// The page size is the service default; pass the previous page's
    /// `next_token` to continue.
    async fn list_objects(
        &self,
        bucket: &str,
        continuation_token: Option<&str>,
    ) -> StorageResult<ObjectListing>;

    /// Fetch an object's metadata without its body.
    ///
    /// # Errors
    ///
    /// Fails if the object is absent, access is denied, or the request
    /// cannot be delivered.
    async fn head_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectMetadata>;

    /// Delete an object. Deleting a missing key is not an error on S3.
    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()>;
}
