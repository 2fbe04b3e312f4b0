//! Bucket lifecycle rules

use aws_sdk_s3::types::{
    BucketLifecycleConfiguration, ExpirationStatus, LifecycleExpiration,
    LifecycleRule as SdkLifecycleRule, LifecycleRuleFilter,
};

use crate::s3::error::{StorageError, StorageResult};

/// Days after which objects expire when no value is given
pub const DEFAULT_EXPIRATION_DAYS: u32 = 3;

/// An expiration rule scoped by key prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleRule {
    pub id: String,
    pub enabled: bool,
    /// Empty prefix matches every key
    pub prefix: String,
    pub expiration_days: u32,
}

impl LifecycleRule {
    /// Enabled rule expiring every object in the bucket after `days`
    pub fn expire_all_after(days: u32) -> StorageResult<Self> {
        if days == 0 {
            return Err(StorageError::InvalidArgument(
                "expiration days must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            id: format!("expire-after-{}-days", days),
            enabled: true,
            prefix: String::new(),
            expiration_days: days,
        })
    }

    pub(crate) fn to_sdk(&self) -> StorageResult<SdkLifecycleRule> {
        let days = i32::try_from(self.expiration_days).map_err(|_| {
            StorageError::InvalidArgument(format!(
                "expiration days out of range: {}",
                self.expiration_days
            ))
        })?;

        let status = if self.enabled {
            ExpirationStatus::Enabled
        } else {
            ExpirationStatus::Disabled
        };

        SdkLifecycleRule::builder()
            .id(&self.id)
            .status(status)
            .filter(LifecycleRuleFilter::builder().prefix(&self.prefix).build())
            .expiration(LifecycleExpiration::builder().days(days).build())
            .build()
            .map_err(|e| StorageError::Request(e.to_string()))
    }
}

/// Assemble the bucket-level configuration sent with `PutBucketLifecycleConfiguration`
pub(crate) fn sdk_configuration(
    rules: &[LifecycleRule],
) -> StorageResult<BucketLifecycleConfiguration> {
    let rules = rules
        .iter()
        .map(LifecycleRule::to_sdk)
        .collect::<StorageResult<Vec<_>>>()?;

    BucketLifecycleConfiguration::builder()
        .set_rules(Some(rules))
        .build()
        .map_err(|e| StorageError::Request(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expire_all_after() {
        let rule = LifecycleRule::expire_all_after(DEFAULT_EXPIRATION_DAYS).unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.prefix, "");
        assert_eq!(rule.expiration_days, 3);
        assert_eq!(rule.id, "expire-after-3-days");
    }

    #[test]
    fn test_zero_days_rejected() {
        let err = LifecycleRule::expire_all_after(0).unwrap_err();
        assert!(matches!(err, StorageError::InvalidArgument(_)));
    }

    #[test]
    fn test_to_sdk_rule() {
        let rule = LifecycleRule::expire_all_after(30).unwrap().to_sdk().unwrap();
        assert_eq!(rule.status(), &ExpirationStatus::Enabled);
        assert_eq!(rule.expiration().and_then(|e| e.days()), Some(30));
        assert_eq!(rule.filter().and_then(|f| f.prefix()), Some(""));
    }

    #[test]
    fn test_days_overflow_rejected() {
        let rule = LifecycleRule {
            id: "huge".to_string(),
            enabled: true,
            prefix: String::new(),
            expiration_days: u32::MAX,
        };
        assert!(matches!(rule.to_sdk(), Err(StorageError::InvalidArgument(_))));
    }

    #[test]
    fn test_sdk_configuration_holds_all_rules() {
        let rules = [
            LifecycleRule::expire_all_after(1).unwrap(),
            LifecycleRule::expire_all_after(7).unwrap(),
        ];
        let config = sdk_configuration(&rules).unwrap();
        assert_eq!(config.rules().len(), 2);
    }
}
