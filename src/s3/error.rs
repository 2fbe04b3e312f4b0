//! Error types for bucket and object operations

use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::s3::config::ConfigError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Errors surfaced by the storage capability and by the client around it
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The storage service rejected or failed the call
    #[error("{operation} failed{}: {message}", code_suffix(.code))]
    Service {
        operation: &'static str,
        /// S3 error code such as `NoSuchBucket` or `AccessDenied`, when the service sent one
        code: Option<String>,
        message: String,
    },

    #[error("local file {path:?}: {source}")]
    LocalFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request could not be assembled
    #[error("failed to build request: {0}")]
    Request(String),
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(" ({})", c))
        .unwrap_or_default()
}

impl StorageError {
    /// Construct a service error carrying an S3 error code
    pub fn service(
        operation: &'static str,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        StorageError::Service {
            operation,
            code: Some(code.into()),
            message: message.into(),
        }
    }

    pub(crate) fn local_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::LocalFile {
            path: path.into(),
            source,
        }
    }

    /// Convert an SDK error, keeping the S3 error code for classification
    pub(crate) fn from_sdk<E, R>(operation: &'static str, err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: fmt::Debug,
    {
        StorageError::Service {
            operation,
            code: err.code().map(str::to_string),
            message: DisplayErrorContext(&err).to_string(),
        }
    }

    /// Convert a failure while reading a response body
    pub(crate) fn from_stream<E>(operation: &'static str, err: E) -> Self
    where
        E: std::error::Error + 'static,
    {
        StorageError::Service {
            operation,
            code: None,
            message: DisplayErrorContext(&err).to_string(),
        }
    }

    /// The S3 error code, if the service provided one
    pub fn code(&self) -> Option<&str> {
        match self {
            StorageError::Service { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Classify the error into the coarse kinds callers branch on
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::Config(_) | StorageError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            StorageError::Service { code, .. } => ErrorKind::from_code(code.as_deref()),
            StorageError::LocalFile { .. } | StorageError::Request(_) => ErrorKind::Other,
        }
    }
}

/// Coarse classification of a failed bucket operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The bucket does not exist (`NoSuchBucket`)
    BucketNotFound,
    /// The credentials may not perform the operation (`AccessDenied`)
    AccessDenied,
    /// The request was rejected before reaching the service
    InvalidArgument,
    Other,
}

impl ErrorKind {
    /// Map an S3 error code to a kind
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("NoSuchBucket") => ErrorKind::BucketNotFound,
            Some("AccessDenied") => ErrorKind::AccessDenied,
            _ => ErrorKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BucketNotFound => "bucket not found",
            ErrorKind::AccessDenied => "access denied",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::Other => "other error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_code() {
        assert_eq!(ErrorKind::from_code(Some("NoSuchBucket")), ErrorKind::BucketNotFound);
        assert_eq!(ErrorKind::from_code(Some("AccessDenied")), ErrorKind::AccessDenied);
        assert_eq!(ErrorKind::from_code(Some("NoSuchKey")), ErrorKind::Other);
        assert_eq!(ErrorKind::from_code(None), ErrorKind::Other);
    }

    #[test]
    fn test_service_error_display_includes_code() {
        let err = StorageError::service("PutBucketVersioning", "NoSuchBucket", "bucket is gone");
        assert_eq!(err.to_string(), "PutBucketVersioning failed (NoSuchBucket): bucket is gone");
        assert_eq!(err.code(), Some("NoSuchBucket"));
        assert_eq!(err.kind(), ErrorKind::BucketNotFound);
    }

    #[test]
    fn test_service_error_display_without_code() {
        let err = StorageError::Service {
            operation: "ListObjectsV2",
            code: None,
            message: "dispatch failure".to_string(),
        };
        assert_eq!(err.to_string(), "ListObjectsV2 failed: dispatch failure");
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_local_errors_classification() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(StorageError::local_file("/tmp/x", io).kind(), ErrorKind::Other);
        assert_eq!(
            StorageError::InvalidArgument("empty key".into()).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            StorageError::from(ConfigError::EmptyField("bucket")).kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_stream_error_keeps_source_detail() {
        let source = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "body ended early");
        let err = StorageError::from_stream("GetObject", source);

        assert_eq!(err.code(), None);
        assert_eq!(err.kind(), ErrorKind::Other);
        let text = err.to_string();
        assert!(text.starts_with("GetObject failed: "));
        assert!(text.contains("body ended early"));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::AccessDenied.to_string(), "access denied");
        assert_eq!(ErrorKind::BucketNotFound.to_string(), "bucket not found");
    }
}
