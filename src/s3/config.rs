//! Connection configuration for an S3-compatible endpoint

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Region used when the caller does not pick one. Most S3-compatible
/// services ignore it, but SigV4 needs some value to sign with.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Errors raised while validating a [`ConnectionConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("invalid endpoint URL '{endpoint}': {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
}

/// Everything needed to reach one bucket on one endpoint.
///
/// Requests are always signed with SigV4 (`s3v4`); the SDK offers no other
/// scheme, so there is nothing to configure here.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Service URL, e.g. `http://localhost:9000` for MinIO
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`
    #[serde(default = "default_path_style")]
    pub force_path_style: bool,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_path_style() -> bool {
    true
}

impl ConnectionConfig {
    /// Build and validate a configuration with default region and path-style addressing
    pub fn new(
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            endpoint: endpoint.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            bucket: bucket.into(),
            region: default_region(),
            force_path_style: default_path_style(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Override the signing region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Toggle path-style bucket addressing
    pub fn with_path_style(mut self, force_path_style: bool) -> Self {
        self.force_path_style = force_path_style;
        self
    }

    /// Check that every field is usable. Deserialized configs should be
    /// validated before use since serde bypasses [`ConnectionConfig::new`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("endpoint", &self.endpoint),
            ("access key", &self.access_key),
            ("secret key", &self.secret_key),
            ("bucket", &self.bucket),
            ("region", &self.region),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyField(name));
            }
        }

        url::Url::parse(&self.endpoint).map_err(|source| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            source,
        })?;

        Ok(())
    }

    /// ARN of the bucket itself
    pub fn bucket_arn(&self) -> String {
        format!("arn:aws:s3:::{}", self.bucket)
    }

    /// ARN pattern matching every object in the bucket
    pub fn objects_arn(&self) -> String {
        format!("arn:aws:s3:::{}/*", self.bucket)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}
