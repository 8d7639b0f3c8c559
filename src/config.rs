//! Workflow configuration
//!
//! Values come from a TOML file, CLI flags or the environment; the entry
//! point merges them once and hands the result to each workflow.

use crate::error::{PolicyError, PolicyResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Object storage location of the baseline policy document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineLocation {
    pub bucket: String,
    pub key: String,
}

impl BaselineLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn validate(&self) -> PolicyResult<()> {
        validate_bucket_name(&self.bucket)?;
        validate_key(&self.key)
    }
}

impl fmt::Display for BaselineLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Configuration shared by the add-ip and reset workflows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// ARN of the managed allowlist policy
    pub policy_arn: String,

    /// Baseline document, required by the reset workflow only
    #[serde(default)]
    pub baseline: Option<BaselineLocation>,
}

impl PolicyConfig {
    pub fn new(policy_arn: impl Into<String>) -> Self {
        Self {
            policy_arn: policy_arn.into(),
            baseline: None,
        }
    }

    pub fn with_baseline(mut self, baseline: BaselineLocation) -> Self {
        self.baseline = Some(baseline);
        self
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> PolicyResult<Self> {
        toml::from_str(text).map_err(|e| PolicyError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> PolicyResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Assemble configuration from an optional file plus explicit overrides
    ///
    /// Overrides win over file values. A baseline override needs both bucket
    /// and key unless the file already provides the missing half.
    pub fn resolve(
        file: Option<PolicyConfig>,
        policy_arn: Option<String>,
        baseline_bucket: Option<String>,
        baseline_key: Option<String>,
    ) -> PolicyResult<Self> {
        let (file_arn, file_baseline) = match file {
            Some(config) => (Some(config.policy_arn), config.baseline),
            None => (None, None),
        };

        let policy_arn = policy_arn.or(file_arn).ok_or_else(|| {
            PolicyError::Config("policy ARN is not set (--policy-arn or POLICY_ARN)".to_string())
        })?;

        let baseline = match (baseline_bucket, baseline_key, file_baseline) {
            (None, None, baseline) => baseline,
            (Some(bucket), Some(key), _) => Some(BaselineLocation::new(bucket, key)),
            (Some(bucket), None, Some(file)) => Some(BaselineLocation::new(bucket, file.key)),
            (None, Some(key), Some(file)) => Some(BaselineLocation::new(file.bucket, key)),
            (Some(_), None, None) | (None, Some(_), None) => {
                return Err(PolicyError::Config(
                    "baseline bucket and key must be provided together".to_string(),
                ))
            }
        };

        let config = Self {
            policy_arn,
            baseline,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the policy ARN and baseline location
    pub fn validate(&self) -> PolicyResult<()> {
        validate_policy_arn(&self.policy_arn)?;
        if let Some(baseline) = &self.baseline {
            baseline.validate()?;
        }
        Ok(())
    }

    /// Baseline location, or a configuration error if none is set
    pub fn baseline(&self) -> PolicyResult<&BaselineLocation> {
        self.baseline.as_ref().ok_or_else(|| {
            PolicyError::Config(
                "baseline location is not set (--baseline-bucket/--baseline-key)".to_string(),
            )
        })
    }
}

/// Validate a managed policy ARN
///
/// Format: arn:<partition>:iam::<account>:policy/<path/name>
pub fn validate_policy_arn(arn: &str) -> PolicyResult<()> {
    let parts: Vec<&str> = arn.splitn(6, ':').collect();
    let valid = matches!(
        parts.as_slice(),
        ["arn", partition, "iam", "", account, resource]
            if !partition.is_empty()
                && !account.is_empty()
                && resource.strip_prefix("policy/").is_some_and(|name| !name.is_empty())
    );

    if !valid {
        return Err(PolicyError::Config(format!(
            "not a managed policy ARN: '{}'",
            arn
        )));
    }

    Ok(())
}

/// Validate S3 bucket name according to AWS rules
///
/// Rules:
/// - 3-63 characters
/// - Lowercase letters, numbers, dots, hyphens
/// - Must start and end with letter or number
/// - No consecutive dots
pub fn validate_bucket_name(name: &str) -> PolicyResult<()> {
    if name.len() < 3 || name.len() > 63 {
        return Err(PolicyError::Config(format!(
            "Bucket name must be 3-63 characters, got {}",
            name.len()
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
    {
        return Err(PolicyError::Config(
            "Bucket name must contain only lowercase letters, numbers, dots, and hyphens"
                .to_string(),
        ));
    }

    let starts_ok = name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    let ends_ok = name.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());
    if !(starts_ok && ends_ok) {
        return Err(PolicyError::Config(
            "Bucket name must start and end with letter or number".to_string(),
        ));
    }

    if name.contains("..") {
        return Err(PolicyError::Config(
            "Bucket name cannot contain consecutive dots".to_string(),
        ));
    }

    Ok(())
}

/// Validate S3 object key
///
/// Keys can be any UTF-8 string up to 1024 bytes
pub fn validate_key(key: &str) -> PolicyResult<()> {
    if key.is_empty() {
        return Err(PolicyError::Config("Key cannot be empty".to_string()));
    }

    if key.len() > 1024 {
        return Err(PolicyError::Config(format!(
            "Key too long: {} bytes (max 1024)",
            key.len()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ARN: &str = "arn:aws:iam::123456789012:policy/ip-allowlist";

    #[test]
    fn test_validate_policy_arn() {
        assert!(validate_policy_arn(ARN).is_ok());
        assert!(validate_policy_arn("arn:aws-cn:iam::123456789012:policy/team/allow").is_ok());

        assert!(validate_policy_arn("").is_err());
        assert!(validate_policy_arn("ip-allowlist").is_err());
        assert!(validate_policy_arn("arn:aws:iam::123456789012:role/admin").is_err());
        assert!(validate_policy_arn("arn:aws:iam::123456789012:policy/").is_err());
        assert!(validate_policy_arn("arn:aws:s3:::bucket/policy/x").is_err());
    }

    #[test]
    fn test_validate_bucket_name() {
        assert!(validate_bucket_name("mybucket").is_ok());
        assert!(validate_bucket_name("my-bucket").is_ok());
        assert!(validate_bucket_name("my.bucket").is_ok());

        assert!(validate_bucket_name("ab").is_err()); // Too short
        assert!(validate_bucket_name(&"a".repeat(64)).is_err()); // Too long
        assert!(validate_bucket_name("MyBucket").is_err()); // Uppercase
        assert!(validate_bucket_name("-bucket").is_err());
        assert!(validate_bucket_name("bucket-").is_err());
        assert!(validate_bucket_name("my..bucket").is_err());
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("policy.json").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key(&"a".repeat(1025)).is_err());
    }

    #[test]
    fn test_baseline_display() {
        let location = BaselineLocation::new("policy-baseline", "allowlist/default.json");
        assert_eq!(
            location.to_string(),
            "s3://policy-baseline/allowlist/default.json"
        );
    }

    #[test]
    fn test_from_toml() {
        let config = PolicyConfig::from_toml_str(&format!(
            r#"
policy_arn = "{}"

[baseline]
bucket = "policy-baseline"
key = "default.json"
"#,
            ARN
        ))
        .unwrap();

        assert_eq!(config.policy_arn, ARN);
        assert_eq!(
            config.baseline,
            Some(BaselineLocation::new("policy-baseline", "default.json"))
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_without_baseline() {
        let config = PolicyConfig::from_toml_str(&format!("policy_arn = \"{}\"", ARN)).unwrap();
        assert!(config.baseline.is_none());
        assert!(matches!(config.baseline(), Err(PolicyError::Config(_))));
    }

    #[test]
    fn test_from_toml_missing_arn() {
        let err = PolicyConfig::from_toml_str("[baseline]\nbucket = \"b\"\nkey = \"k\"").unwrap_err();
        assert!(matches!(err, PolicyError::Config(_)));
    }

    #[test]
    fn test_load_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "policy_arn = \"{}\"", ARN).unwrap();

        let config = PolicyConfig::load(file.path()).unwrap();
        assert_eq!(config, PolicyConfig::new(ARN));
    }

    #[test]
    fn test_load_missing_file() {
        let err = PolicyConfig::load("/nonexistent/allowlist.toml").unwrap_err();
        assert!(matches!(err, PolicyError::Io(_)));
    }

    #[test]
    fn test_resolve_overrides_file() {
        let file = PolicyConfig::new("arn:aws:iam::111111111111:policy/old")
            .with_baseline(BaselineLocation::new("file-bucket", "file.json"));

        let config = PolicyConfig::resolve(
            Some(file),
            Some(ARN.to_string()),
            None,
            Some("override.json".to_string()),
        )
        .unwrap();

        assert_eq!(config.policy_arn, ARN);
        assert_eq!(
            config.baseline,
            Some(BaselineLocation::new("file-bucket", "override.json"))
        );
    }

    #[test]
    fn test_resolve_requires_arn() {
        let err = PolicyConfig::resolve(None, None, None, None).unwrap_err();
        assert!(matches!(err, PolicyError::Config(_)));
    }

    #[test]
    fn test_resolve_rejects_half_baseline() {
        let err = PolicyConfig::resolve(
            None,
            Some(ARN.to_string()),
            Some("policy-baseline".to_string()),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, PolicyError::Config(_)));
    }

    #[test]
    fn test_resolve_validates() {
        let err = PolicyConfig::resolve(None, Some("not-an-arn".to_string()), None, None)
            .unwrap_err();
        assert!(matches!(err, PolicyError::Config(_)));
    }
}
