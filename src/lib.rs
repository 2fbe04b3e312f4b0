//! S3 Bucket Client Library
//!
//! A thin client for S3-compatible object storage (AWS S3, MinIO, Selectel,
//! Yandex Object Storage). It configures a connection, applies bucket
//! policy, versioning and lifecycle settings, and moves files in and out of
//! a single bucket.

pub mod s3;

pub use s3::{
    AccessLevel, ConnectionConfig, ErrorKind, ObjectStore, PrincipalGrant, StorageClient,
    StorageError,
};
