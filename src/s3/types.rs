//! S3 data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One page of a bucket listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectListing {
    pub keys: Vec<String>,
    pub is_truncated: bool,
    /// Token for the next page, present only when `is_truncated`
    pub next_token: Option<String>,
}

/// Metadata of a single object, as returned by HeadObject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
}

/// Convert an SDK timestamp into a chrono one
pub(crate) fn to_utc(ts: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
}
