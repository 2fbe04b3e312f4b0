//! In-memory object store
//!
//! Keeps buckets, objects and bucket settings in process memory and answers
//! with the same S3 error codes a real service would (`NoSuchBucket`,
//! `NoSuchKey`, `AccessDenied`). Used by the test suites and handy as an
//! offline backend.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::s3::error::{StorageError, StorageResult};
use crate::s3::lifecycle::LifecycleRule;
use crate::s3::store::ObjectStore;
use crate::s3::types::{ObjectListing, ObjectMetadata};

/// Page size S3 uses for `ListObjectsV2` when `max-keys` is not given
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Settings and contents of one bucket
#[derive(Debug, Clone, Default)]
pub struct BucketState {
    /// Objects ordered by key, as S3 lists them
    pub objects: BTreeMap<String, Bytes>,
    pub policy: Option<String>,
    pub versioning_enabled: bool,
    pub lifecycle: Vec<LifecycleRule>,
}

/// In-memory [`ObjectStore`].
///
/// # Example
///
/// ```rust,ignore
/// let store = InMemoryObjectStore::new().with_bucket("reports");
/// let client = StorageClient::with_store(config, store);
/// client.upload(Path::new("sales.csv"), "sales.csv").await?;
/// ```
pub struct InMemoryObjectStore {
    buckets: RwLock<HashMap<String, BucketState>>,
    /// Buckets whose administrative calls fail, with the error code returned
    admin_failures: RwLock<HashMap<String, String>>,
    page_size: usize,
}

impl InMemoryObjectStore {
    /// Create a store with no buckets
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            admin_failures: RwLock::new(HashMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Add an empty bucket
    pub fn with_bucket(self, bucket: impl Into<String>) -> Self {
        self.write_buckets()
            .entry(bucket.into())
            .or_default();
        self
    }

    /// Use a smaller listing page, e.g. to exercise pagination
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Refuse policy, versioning and lifecycle changes on `bucket`
    pub fn deny_admin(self, bucket: impl Into<String>) -> Self {
        self.fail_admin_with(bucket, "AccessDenied")
    }

    /// Fail policy, versioning and lifecycle changes on `bucket` with `code`,
    /// e.g. `InternalError` or `SlowDown`
    pub fn fail_admin_with(self, bucket: impl Into<String>, code: impl Into<String>) -> Self {
        self.admin_failures
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(bucket.into(), code.into());
        self
    }

    /// Snapshot of a bucket's settings and contents
    pub fn bucket_state(&self, bucket: &str) -> Option<BucketState> {
        self.read_buckets().get(bucket).cloned()
    }

    /// Store an object directly, bypassing the file system
    pub fn insert_object(&self, bucket: &str, key: &str, data: impl Into<Bytes>) -> StorageResult<()> {
        let mut buckets = self.write_buckets();
        let state = Self::bucket_mut(&mut buckets, "PutObject", bucket)?;
        state.objects.insert(key.to_string(), data.into());
        Ok(())
    }

    fn read_buckets(&self) -> RwLockReadGuard<'_, HashMap<String, BucketState>> {
        self.buckets
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_buckets(&self) -> RwLockWriteGuard<'_, HashMap<String, BucketState>> {
        self.buckets
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn no_such_bucket(operation: &'static str, bucket: &str) -> StorageError {
        StorageError::service(
            operation,
            "NoSuchBucket",
            format!("The specified bucket does not exist: {}", bucket),
        )
    }

    fn bucket_mut<'a>(
        buckets: &'a mut HashMap<String, BucketState>,
        operation: &'static str,
        bucket: &str,
    ) -> StorageResult<&'a mut BucketState> {
        buckets
            .get_mut(bucket)
            .ok_or_else(|| Self::no_such_bucket(operation, bucket))
    }

    /// Apply an administrative change, honouring existence and access checks
    fn update_settings<F>(&self, operation: &'static str, bucket: &str, apply: F) -> StorageResult<()>
    where
        F: FnOnce(&mut BucketState),
    {
        let mut buckets = self.write_buckets();
        let state = Self::bucket_mut(&mut buckets, operation, bucket)?;

        let failure = self
            .admin_failures
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(bucket)
            .cloned();
        if let Some(code) = failure {
            let message = match code.as_str() {
                "AccessDenied" => "Access Denied.".to_string(),
                other => format!("{} injected for bucket {}", other, bucket),
            };
            return Err(StorageError::service(operation, code, message));
        }

        apply(state);
        Ok(())
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put_bucket_policy(&self, bucket: &str, policy_json: &str) -> StorageResult<()> {
        check_policy(policy_json)?;

        self.update_settings("PutBucketPolicy", bucket, |state| {
            state.policy = Some(policy_json.to_string());
        })
    }

    async fn put_bucket_versioning(&self, bucket: &str, enabled: bool) -> StorageResult<()> {
        self.update_settings("PutBucketVersioning", bucket, |state| {
            state.versioning_enabled = enabled;
        })
    }

    async fn put_bucket_lifecycle(
        &self,
        bucket: &str,
        rules: &[LifecycleRule],
    ) -> StorageResult<()> {
        if let Some(rule) = rules.iter().find(|r| r.expiration_days == 0) {
            return Err(StorageError::service(
                "PutBucketLifecycleConfiguration",
                "InvalidArgument",
                format!("'Days' for Expiration action must be a positive integer (rule {})", rule.id),
            ));
        }

        self.update_settings("PutBucketLifecycleConfiguration", bucket, |state| {
            state.lifecycle = rules.to_vec();
        })
    }

    async fn upload_file(&self, bucket: &str, key: &str, path: &Path) -> StorageResult<()> {
        let exists = self.read_buckets().contains_key(bucket);
        if !exists {
            return Err(Self::no_such_bucket("PutObject", bucket));
        }

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| StorageError::local_file(path, e))?;

        self.insert_object(bucket, key, data)
    }

    async fn download_file(&self, bucket: &str, key: &str, path: &Path) -> StorageResult<()> {
        let data = {
            let buckets = self.read_buckets();
            let state = buckets
                .get(bucket)
                .ok_or_else(|| Self::no_such_bucket("GetObject", bucket))?;
            state.objects.get(key).cloned().ok_or_else(|| {
                StorageError::service("GetObject", "NoSuchKey", "The specified key does not exist.")
            })?
        };

        tokio::fs::write(path, &data)
            .await
            .map_err(|e| StorageError::local_file(path, e))
    }

    async fn list_objects(
        &self,
        bucket: &str,
        continuation_token: Option<&str>,
    ) -> StorageResult<ObjectListing> {
        let buckets = self.read_buckets();
        let state = buckets
            .get(bucket)
            .ok_or_else(|| Self::no_such_bucket("ListObjectsV2", bucket))?;

        // The token is the last key of the previous page
        let mut remaining = state
            .objects
            .keys()
            .filter(|k| continuation_token.map_or(true, |after| k.as_str() > after));

        let keys: Vec<String> = remaining.by_ref().take(self.page_size).cloned().collect();
        let is_truncated = remaining.next().is_some();
        let next_token = if is_truncated { keys.last().cloned() } else { None };

        Ok(ObjectListing {
            keys,
            is_truncated,
            next_token,
        })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectMetadata> {
        let buckets = self.read_buckets();
        let state = buckets
            .get(bucket)
            .ok_or_else(|| Self::no_such_bucket("HeadObject", bucket))?;

        let data = state
            .objects
            .get(key)
            .ok_or_else(|| StorageError::service("HeadObject", "NotFound", "Not Found"))?;

        Ok(ObjectMetadata {
            key: key.to_string(),
            size: data.len() as u64,
            last_modified: None,
            etag: None,
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let mut buckets = self.write_buckets();
        let state = Self::bucket_mut(&mut buckets, "DeleteObject", bucket)?;
        state.objects.remove(key);
        Ok(())
    }
}

/// Reject what S3 refuses with `MalformedPolicy`: invalid JSON and
/// statements sharing a `Sid`
fn check_policy(policy_json: &str) -> StorageResult<()> {
    let malformed = |message: String| StorageError::service("PutBucketPolicy", "MalformedPolicy", message);

    let document: serde_json::Value =
        serde_json::from_str(policy_json).map_err(|e| malformed(e.to_string()))?;

    let statements = document
        .get("Statement")
        .and_then(|s| s.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut seen = HashSet::new();
    for sid in statements.iter().filter_map(|s| s.get("Sid")).filter_map(|s| s.as_str()) {
        if !seen.insert(sid) {
            return Err(malformed(format!("Statement IDs (SID) must be unique: {}", sid)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3::error::ErrorKind;

    #[tokio::test]
    async fn test_missing_bucket_reports_no_such_bucket() {
        let store = InMemoryObjectStore::new();
        let err = store.put_bucket_versioning("ghost", true).await.unwrap_err();
        assert_eq!(err.code(), Some("NoSuchBucket"));
        assert_eq!(err.kind(), ErrorKind::BucketNotFound);
    }

    #[tokio::test]
    async fn test_denied_admin_reports_access_denied() {
        let store = InMemoryObjectStore::new().with_bucket("locked").deny_admin("locked");
        let err = store.put_bucket_policy("locked", "{}").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
        assert!(store.bucket_state("locked").unwrap().policy.is_none());
    }

    #[tokio::test]
    async fn test_malformed_policy_rejected() {
        let store = InMemoryObjectStore::new().with_bucket("b");
        let err = store.put_bucket_policy("b", "not json").await.unwrap_err();
        assert_eq!(err.code(), Some("MalformedPolicy"));
    }

    #[tokio::test]
    async fn test_duplicate_sids_rejected() {
        let store = InMemoryObjectStore::new().with_bucket("b");
        let policy = r#"{
            "Version": "2012-10-17",
            "Statement": [
                {"Sid": "FullAccessForUserM", "Effect": "Allow"},
                {"Sid": "FullAccessForUserM", "Effect": "Allow"}
            ]
        }"#;

        let err = store.put_bucket_policy("b", policy).await.unwrap_err();
        assert_eq!(err.code(), Some("MalformedPolicy"));
        assert!(err.to_string().contains("FullAccessForUserM"));
        assert!(store.bucket_state("b").unwrap().policy.is_none());
    }

    #[tokio::test]
    async fn test_injected_admin_failure_code() {
        let store = InMemoryObjectStore::new()
            .with_bucket("b")
            .fail_admin_with("b", "InternalError");

        let err = store.put_bucket_versioning("b", true).await.unwrap_err();
        assert_eq!(err.code(), Some("InternalError"));
        assert_eq!(err.kind(), ErrorKind::Other);
        assert!(!store.bucket_state("b").unwrap().versioning_enabled);
    }

    #[tokio::test]
    async fn test_listing_pages_in_key_order() {
        let store = InMemoryObjectStore::new().with_bucket("b").with_page_size(2);
        for key in ["c.txt", "a.txt", "e.txt", "b.txt", "d.txt"] {
            store.insert_object("b", key, Bytes::from_static(b"x")).unwrap();
        }

        let first = store.list_objects("b", None).await.unwrap();
        assert_eq!(first.keys, vec!["a.txt", "b.txt"]);
        assert!(first.is_truncated);

        let second = store.list_objects("b", first.next_token.as_deref()).await.unwrap();
        assert_eq!(second.keys, vec!["c.txt", "d.txt"]);
        assert!(second.is_truncated);

        let third = store.list_objects("b", second.next_token.as_deref()).await.unwrap();
        assert_eq!(third.keys, vec!["e.txt"]);
        assert!(!third.is_truncated);
        assert!(third.next_token.is_none());
    }

    #[tokio::test]
    async fn test_exact_page_is_not_truncated() {
        let store = InMemoryObjectStore::new().with_bucket("b").with_page_size(2);
        store.insert_object("b", "one", Bytes::from_static(b"1")).unwrap();
        store.insert_object("b", "two", Bytes::from_static(b"2")).unwrap();

        let page = store.list_objects("b", None).await.unwrap();
        assert_eq!(page.keys.len(), 2);
        assert!(!page.is_truncated);
    }

    #[tokio::test]
    async fn test_head_object_reports_size() {
        let store = InMemoryObjectStore::new().with_bucket("b");
        store.insert_object("b", "k", Bytes::from_static(b"hello")).unwrap();

        let meta = store.head_object("b", "k").await.unwrap();
        assert_eq!(meta.size, 5);

        let err = store.head_object("b", "missing").await.unwrap_err();
        assert_eq!(err.code(), Some("NotFound"));
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_ok() {
        let store = InMemoryObjectStore::new().with_bucket("b");
        assert!(store.delete_object("b", "never-there").await.is_ok());
    }
}
