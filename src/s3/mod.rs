//! S3 client wrapper module
//!
//! This module provides S3 bucket functionality including:
//! - [`client::StorageClient`] - High-level bucket operations wrapper
//! - [`store::ObjectStore`] - The storage capability the client delegates to
//! - [`aws::AwsObjectStore`] / [`memory::InMemoryObjectStore`] - Its implementations
//! - [`config`], [`policy`], [`lifecycle`], [`types`] - Configuration and data types

pub mod aws;
pub mod client;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod policy;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use aws::AwsObjectStore;
pub use client::StorageClient;
pub use config::{ConfigError, ConnectionConfig};
pub use error::{ErrorKind, StorageError};
pub use lifecycle::{LifecycleRule, DEFAULT_EXPIRATION_DAYS};
pub use memory::InMemoryObjectStore;
pub use policy::{AccessLevel, PolicyDocument, PrincipalGrant};
pub use store::ObjectStore;
pub use types::{ObjectListing, ObjectMetadata};
