//! AWS SDK implementation of [`ObjectStore`]

use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketVersioningStatus, VersioningConfiguration};
use aws_sdk_s3::Client;
use std::path::Path;
use tokio::io::AsyncWriteExt;

use crate::s3::config::ConnectionConfig;
use crate::s3::error::{StorageError, StorageResult};
use crate::s3::lifecycle::{self, LifecycleRule};
use crate::s3::store::ObjectStore;
use crate::s3::types::{to_utc, ObjectListing, ObjectMetadata};

/// [`ObjectStore`] backed by `aws-sdk-s3`, usable with any S3-compatible endpoint
#[derive(Debug, Clone)]
pub struct AwsObjectStore {
    client: Client,
}

impl AwsObjectStore {
    /// Build an SDK client from static credentials and an explicit endpoint.
    ///
    /// Region and credentials come from `config` only, so loading performs
    /// no network I/O; connection problems surface on the first request.
    pub async fn new(config: &ConnectionConfig) -> StorageResult<Self> {
        config.validate()?;

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "static",
        );

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();

        tracing::debug!(
            "Configured S3 client: endpoint={}, region={}, path_style={}",
            config.endpoint,
            config.region,
            config.force_path_style
        );

        Ok(Self {
            client: Client::from_conf(s3_config),
        })
    }

    /// Get the region the SDK client signs for
    pub fn region(&self) -> Option<&str> {
        self.client.config().region().map(|r| r.as_ref())
    }
}

#[async_trait]
impl ObjectStore for AwsObjectStore {
    async fn put_bucket_policy(&self, bucket: &str, policy_json: &str) -> StorageResult<()> {
        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy_json)
            .send()
            .await
            .map_err(|e| StorageError::from_sdk("PutBucketPolicy", e))?;

        Ok(())
    }

    async fn put_bucket_versioning(&self, bucket: &str, enabled: bool) -> StorageResult<()> {
        let status = if enabled {
            BucketVersioningStatus::Enabled
        } else {
            BucketVersioningStatus::Suspended
        };

        self.client
            .put_bucket_versioning()
            .bucket(bucket)
            .versioning_configuration(VersioningConfiguration::builder().status(status).build())
            .send()
            .await
            .map_err(|e| StorageError::from_sdk("PutBucketVersioning", e))?;

        Ok(())
    }

    async fn put_bucket_lifecycle(
        &self,
        bucket: &str,
        rules: &[LifecycleRule],
    ) -> StorageResult<()> {
        let configuration = lifecycle::sdk_configuration(rules)?;

        self.client
            .put_bucket_lifecycle_configuration()
            .bucket(bucket)
            .lifecycle_configuration(configuration)
            .send()
            .await
            .map_err(|e| StorageError::from_sdk("PutBucketLifecycleConfiguration", e))?;

        Ok(())
    }

    async fn upload_file(&self, bucket: &str, key: &str, path: &Path) -> StorageResult<()> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::local_file(path, std::io::Error::other(e)))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::from_sdk("PutObject", e))?;

        Ok(())
    }

    async fn download_file(&self, bucket: &str, key: &str, path: &Path) -> StorageResult<()> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::from_sdk("GetObject", e))?;

        // Stream into a sibling temp file and rename it over `path` only once
        // the whole body has arrived. On any failure the temp file is removed
        // and `path` keeps its previous content.
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let (std_file, temp_path) = tempfile::Builder::new()
            .prefix(".download-")
            .suffix(".part")
            .tempfile_in(parent)
            .map_err(|e| StorageError::local_file(path, e))?
            .into_parts();
        let mut file = tokio::fs::File::from_std(std_file);

        let mut body = response.body;
        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| StorageError::from_stream("GetObject", e))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| StorageError::local_file(path, e))?;
        }

        file.flush()
            .await
            .map_err(|e| StorageError::local_file(path, e))?;
        drop(file);

        temp_path
            .persist(path)
            .map_err(|e| StorageError::local_file(path, e.error))?;

        Ok(())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        continuation_token: Option<&str>,
    ) -> StorageResult<ObjectListing> {
        let mut request = self.client.list_objects_v2().bucket(bucket);

        if let Some(token) = continuation_token {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::from_sdk("ListObjectsV2", e))?;

        // A response without `Contents` means an empty bucket
        let keys = response
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(str::to_string))
            .collect();

        Ok(ObjectListing {
            keys,
            is_truncated: response.is_truncated().unwrap_or(false),
            next_token: response.next_continuation_token().map(str::to_string),
        })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectMetadata> {
        let response = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::from_sdk("HeadObject", e))?;

        Ok(ObjectMetadata {
            key: key.to_string(),
            size: response.content_length().unwrap_or(0).max(0) as u64,
            last_modified: response.last_modified().and_then(to_utc),
            etag: response.e_tag().map(str::to_string),
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::from_sdk("DeleteObject", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer every request with `Content-Length: declared` followed by
    /// `body`, then hang up. A short `body` simulates a dropped connection.
    async fn serve_object(declared: usize, body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    declared
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(body).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{}", addr)
    }

    async fn store_for(endpoint: &str) -> AwsObjectStore {
        let config = ConnectionConfig::new(endpoint, "ak", "sk", "reports").unwrap();
        AwsObjectStore::new(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_interrupted_download_keeps_existing_file() {
        let endpoint = serve_object(100_000, b"0123456789").await;
        let store = store_for(&endpoint).await;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("sales_data.csv");
        std::fs::write(&target, b"ORIGINAL CONTENT").unwrap();

        let err = store
            .download_file("reports", "sales_data.csv", &target)
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Service { operation: "GetObject", .. }));
        assert!(!err.to_string().ends_with(": "));
        assert_eq!(std::fs::read(&target).unwrap(), b"ORIGINAL CONTENT");

        // No partial file left next to the target
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_complete_download_replaces_existing_file() {
        let endpoint = serve_object(11, b"hello world").await;
        let store = store_for(&endpoint).await;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("greeting.txt");
        std::fs::write(&target, b"stale").unwrap();

        store
            .download_file("reports", "greeting.txt", &target)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"hello world");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_new_performs_no_network_io() {
        // Nothing listens on this port; construction must still succeed
        let config = ConnectionConfig::new("http://127.0.0.1:1", "ak", "sk", "offline")
            .unwrap()
            .with_region("eu-central-1");

        let store = AwsObjectStore::new(&config).await.unwrap();
        assert_eq!(store.region(), Some("eu-central-1"));
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let mut config = ConnectionConfig::new("http://127.0.0.1:1", "ak", "sk", "b").unwrap();
        config.bucket.clear();

        let err = AwsObjectStore::new(&config).await.unwrap_err();
        assert!(matches!(err, StorageError::Config(_)));
    }
}
