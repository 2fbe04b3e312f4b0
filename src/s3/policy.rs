//! Bucket policy documents
//!
//! Builds the JSON access-control document sent with `PutBucketPolicy`:
//! anonymous read on every object, plus one statement per named principal.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::HashSet;

use crate::s3::config::ConnectionConfig;

/// Policy language version understood by S3 and MinIO
pub const POLICY_VERSION: &str = "2012-10-17";

/// How much a named principal may do in the bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    /// Every S3 action on the bucket and its objects
    FullAccess,
    /// Read objects and list the bucket
    ReadOnly,
}

impl AccessLevel {
    fn actions(&self) -> Vec<String> {
        match self {
            AccessLevel::FullAccess => vec!["s3:*".to_string()],
            AccessLevel::ReadOnly => vec!["s3:GetObject".to_string(), "s3:ListBucket".to_string()],
        }
    }

    fn sid_prefix(&self) -> &'static str {
        match self {
            AccessLevel::FullAccess => "FullAccessFor",
            AccessLevel::ReadOnly => "ReadOnlyFor",
        }
    }
}

/// A principal and the access it should be granted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalGrant {
    pub principal: String,
    pub access: AccessLevel,
}

impl PrincipalGrant {
    pub fn full_access(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            access: AccessLevel::FullAccess,
        }
    }

    pub fn read_only(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            access: AccessLevel::ReadOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// Who a statement applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// `"*"`, anyone including anonymous requests
    Anyone,
    /// `{"AWS": "<name>"}`
    Aws(String),
}

impl Serialize for Principal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Principal::Anyone => serializer.serialize_str("*"),
            Principal::Aws(name) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("AWS", name)?;
                map.end()
            }
        }
    }
}

/// A single string serializes bare, several as an array
fn one_or_many<S: Serializer>(values: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    if let [single] = values {
        return serializer.serialize_str(single);
    }
    let mut seq = serializer.serialize_seq(Some(values.len()))?;
    for value in values {
        seq.serialize_element(value)?;
    }
    seq.end()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub sid: String,
    pub effect: Effect,
    pub principal: Principal,
    #[serde(serialize_with = "one_or_many")]
    pub action: Vec<String>,
    #[serde(serialize_with = "one_or_many")]
    pub resource: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    /// Public read on all objects of the configured bucket, then one statement per grant.
    ///
    /// Statement ids are unique within the document: when two grants map to
    /// the same id (same principal twice, or names differing only in
    /// punctuation) the later one gets its statement index appended.
    pub fn for_bucket(config: &ConnectionConfig, grants: &[PrincipalGrant]) -> Self {
        let bucket_arn = config.bucket_arn();
        let objects_arn = config.objects_arn();

        let mut statement = vec![Statement {
            sid: "PublicRead".to_string(),
            effect: Effect::Allow,
            principal: Principal::Anyone,
            action: vec!["s3:GetObject".to_string()],
            resource: vec![objects_arn.clone()],
        }];
        let mut used: HashSet<String> = statement.iter().map(|s| s.sid.clone()).collect();

        for grant in grants {
            let base = format!("{}{}", grant.access.sid_prefix(), sid_suffix(&grant.principal));
            let mut sid = base.clone();
            let mut index = statement.len();
            while used.contains(&sid) {
                sid = format!("{}{}", base, index);
                index += 1;
            }
            used.insert(sid.clone());

            statement.push(Statement {
                sid,
                effect: Effect::Allow,
                principal: Principal::Aws(grant.principal.clone()),
                action: grant.access.actions(),
                resource: vec![bucket_arn.clone(), objects_arn.clone()],
            });
        }

        Self {
            version: POLICY_VERSION.to_string(),
            statement,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Statement ids must be alphanumeric: `user_m` becomes `UserM`
fn sid_suffix(principal: &str) -> String {
    principal
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
