//! S3 bucket client wrapper

use std::path::Path;

use crate::s3::aws::AwsObjectStore;
use crate::s3::config::ConnectionConfig;
use crate::s3::error::{ErrorKind, StorageError, StorageResult};
use crate::s3::lifecycle::{LifecycleRule, DEFAULT_EXPIRATION_DAYS};
use crate::s3::policy::{PolicyDocument, PrincipalGrant};
use crate::s3::store::ObjectStore;
use crate::s3::types::{ObjectListing, ObjectMetadata};

/// Client bound to a single bucket, with high-level operations.
///
/// Holds only its configuration; every call goes to the store. Nothing is
/// cached between calls.
pub struct StorageClient<S = AwsObjectStore> {
    store: S,
    config: ConnectionConfig,
}

impl StorageClient<AwsObjectStore> {
    /// Connect to `bucket` at `endpoint` with SigV4 signing and the default region
    pub async fn connect(
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> StorageResult<Self> {
        let config = ConnectionConfig::new(endpoint, access_key, secret_key, bucket)?;
        Self::from_config(config).await
    }

    /// Create a client from a prepared configuration
    pub async fn from_config(config: ConnectionConfig) -> StorageResult<Self> {
        let store = AwsObjectStore::new(&config).await?;
        Ok(Self::with_store(config, store))
    }
}

impl<S: ObjectStore> StorageClient<S> {
    /// Bind an arbitrary storage backend to the configured bucket
    pub fn with_store(config: ConnectionConfig, store: S) -> Self {
        Self { store, config }
    }

    /// Apply a policy granting anonymous read on every object plus the given grants.
    ///
    /// Errors from the service are returned unchanged.
    pub async fn set_bucket_policy(&self, grants: &[PrincipalGrant]) -> StorageResult<()> {
        let policy = PolicyDocument::for_bucket(&self.config, grants);
        let json = policy
            .to_json()
            .map_err(|e| StorageError::Request(e.to_string()))?;

        self.store.put_bucket_policy(&self.config.bucket, &json).await?;

        tracing::info!(
            "Bucket policy updated for '{}' ({} named principals)",
            self.config.bucket,
            grants.len()
        );
        Ok(())
    }

    /// Turn on versioning for the bucket.
    ///
    /// Failures are logged and reported as an [`ErrorKind`], never propagated.
    pub async fn enable_versioning(&self) -> Result<(), ErrorKind> {
        match self.store.put_bucket_versioning(&self.config.bucket, true).await {
            Ok(()) => {
                tracing::info!("Versioning enabled for bucket '{}'", self.config.bucket);
                Ok(())
            }
            Err(e) => {
                let kind = e.kind();
                match kind {
                    ErrorKind::BucketNotFound => {
                        tracing::error!("Bucket '{}' not found", self.config.bucket)
                    }
                    ErrorKind::AccessDenied => {
                        tracing::error!("Access denied for bucket '{}'", self.config.bucket)
                    }
                    _ => tracing::error!(
                        "Failed to enable versioning: {}",
                        e.code().unwrap_or("unknown error")
                    ),
                }
                tracing::debug!("Versioning error details: {}", e);
                Err(kind)
            }
        }
    }

    /// Install a single rule expiring every object after `expiration_days`.
    ///
    /// Any failure, including a zero day count, is logged and reported as an
    /// [`ErrorKind`]. A zero day count never reaches the service.
    pub async fn set_lifecycle_policy(&self, expiration_days: u32) -> Result<(), ErrorKind> {
        let result = match LifecycleRule::expire_all_after(expiration_days) {
            Ok(rule) => {
                self.store
                    .put_bucket_lifecycle(&self.config.bucket, &[rule])
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::info!(
                    "Lifecycle policy configured: objects in bucket '{}' expire after {} days",
                    self.config.bucket,
                    expiration_days
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to configure lifecycle policy: {}", e);
                Err(e.kind())
            }
        }
    }

    /// [`StorageClient::set_lifecycle_policy`] with [`DEFAULT_EXPIRATION_DAYS`]
    pub async fn set_default_lifecycle_policy(&self) -> Result<(), ErrorKind> {
        self.set_lifecycle_policy(DEFAULT_EXPIRATION_DAYS).await
    }

    /// Upload a local file under `object_key`, replacing any existing object
    pub async fn upload(&self, local_path: impl AsRef<Path>, object_key: &str) -> StorageResult<()> {
        ensure_key(object_key)?;

        self.store
            .upload_file(&self.config.bucket, object_key, local_path.as_ref())
            .await?;

        tracing::info!("Uploaded: {}", object_key);
        Ok(())
    }

    /// Download `object_key` into a local file, replacing it once the whole object has arrived
    pub async fn download(&self, object_key: &str, local_path: impl AsRef<Path>) -> StorageResult<()> {
        ensure_key(object_key)?;

        self.store
            .download_file(&self.config.bucket, object_key, local_path.as_ref())
            .await?;

        tracing::info!("Downloaded: {}", object_key);
        Ok(())
    }

    /// Keys on the first listing page.
    ///
    /// A single request; buckets larger than one page (1000 keys on S3) are
    /// cut off. Use [`StorageClient::list_all_files`] to walk every page.
    pub async fn list_files(&self) -> StorageResult<Vec<String>> {
        let listing = self.list_page(None).await?;
        Ok(listing.keys)
    }

    /// Every key in the bucket, following continuation tokens
    pub async fn list_all_files(&self) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = self.list_page(token.as_deref()).await?;
            keys.extend(page.keys);

            match page.next_token {
                Some(next) if page.is_truncated => token = Some(next),
                _ => break,
            }
        }

        Ok(keys)
    }

    /// One raw listing page
    pub async fn list_page(&self, continuation_token: Option<&str>) -> StorageResult<ObjectListing> {
        let listing = self
            .store
            .list_objects(&self.config.bucket, continuation_token)
            .await?;

        tracing::debug!(
            "Listed {} objects in '{}' (truncated: {})",
            listing.keys.len(),
            self.config.bucket,
            listing.is_truncated
        );
        Ok(listing)
    }

    /// Whether a metadata lookup for `object_key` succeeds.
    ///
    /// Every failure counts as "does not exist", including access denied and
    /// network errors. Use [`StorageClient::object_metadata`] to tell them apart.
    pub async fn file_exists(&self, object_key: &str) -> bool {
        match self.object_metadata(object_key).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Metadata lookup for '{}' failed ({}): {}", object_key, e.kind(), e);
                false
            }
        }
    }

    /// Metadata of `object_key`, with lookup errors propagated
    pub async fn object_metadata(&self, object_key: &str) -> StorageResult<ObjectMetadata> {
        ensure_key(object_key)?;
        self.store.head_object(&self.config.bucket, object_key).await
    }

    /// Delete `object_key` from the bucket
    pub async fn delete_file(&self, object_key: &str) -> StorageResult<()> {
        ensure_key(object_key)?;

        self.store
            .delete_object(&self.config.bucket, object_key)
            .await?;

        tracing::info!("Deleted: {}", object_key);
        Ok(())
    }

    /// Get the bucket this client is bound to
    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// Get the configured region
    pub fn region(&self) -> &str {
        &self.config.region
    }

    /// Get the connection configuration
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Get the underlying storage backend
    pub fn store(&self) -> &S {
        &self.store
    }
}

fn ensure_key(object_key: &str) -> StorageResult<()> {
    if object_key.is_empty() {
        return Err(StorageError::InvalidArgument(
            "object key must not be empty".to_string(),
        ));
    }
    Ok(())
}
