//! AWS SDK backed collaborators
//!
//! Credentials and region come from the SDK's default provider chain.

use crate::error::{PolicyError, PolicyResult};
use crate::service::{IdentityService, ObjectStore};
use crate::versioning::StoredVersion;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use chrono::DateTime;
use tracing::debug;

/// Load the shared SDK configuration from the environment
pub async fn load_sdk_config() -> aws_config::SdkConfig {
    aws_config::load_defaults(BehaviorVersion::latest()).await
}

/// IAM client wrapper
#[derive(Debug, Clone)]
pub struct AwsIdentityService {
    client: aws_sdk_iam::Client,
}

impl AwsIdentityService {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_iam::Client::new(sdk_config),
        }
    }

    pub fn from_client(client: aws_sdk_iam::Client) -> Self {
        Self { client }
    }
}

fn iam_error<E>(operation: &'static str, err: E) -> PolicyError
where
    E: std::error::Error + 'static,
{
    PolicyError::remote(
        operation,
        aws_sdk_iam::error::DisplayErrorContext(err).to_string(),
    )
}

#[async_trait]
impl IdentityService for AwsIdentityService {
    async fn list_policy_versions(&self, policy_arn: &str) -> PolicyResult<Vec<StoredVersion>> {
        const OPERATION: &str = "ListPolicyVersions";

        // A managed policy holds at most five versions, so one page suffices
        let output = self
            .client
            .list_policy_versions()
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(|e| iam_error(OPERATION, e))?;

        output
            .versions()
            .iter()
            .map(|v| {
                let version_id = v.version_id().ok_or_else(|| {
                    PolicyError::remote(OPERATION, "version without an id in response")
                })?;
                let mut version = StoredVersion::new(version_id, v.is_default_version());
                if let Some(created) = v
                    .create_date()
                    .and_then(|d| DateTime::from_timestamp(d.secs(), d.subsec_nanos()))
                {
                    version = version.with_created_at(created);
                }
                Ok(version)
            })
            .collect()
    }

    async fn get_policy_version(
        &self,
        policy_arn: &str,
        version_id: &str,
    ) -> PolicyResult<String> {
        const OPERATION: &str = "GetPolicyVersion";

        let output = self
            .client
            .get_policy_version()
            .policy_arn(policy_arn)
            .version_id(version_id)
            .send()
            .await
            .map_err(|e| iam_error(OPERATION, e))?;

        output
            .policy_version()
            .and_then(|v| v.document())
            .map(str::to_string)
            .ok_or_else(|| PolicyError::remote(OPERATION, "response has no policy document"))
    }

    async fn delete_policy_version(&self, policy_arn: &str, version_id: &str) -> PolicyResult<()> {
        self.client
            .delete_policy_version()
            .policy_arn(policy_arn)
            .version_id(version_id)
            .send()
            .await
            .map_err(|e| iam_error("DeletePolicyVersion", e))?;
        Ok(())
    }

    async fn create_policy_version(
        &self,
        policy_arn: &str,
        document: &str,
        set_as_default: bool,
    ) -> PolicyResult<String> {
        const OPERATION: &str = "CreatePolicyVersion";

        let output = self
            .client
            .create_policy_version()
            .policy_arn(policy_arn)
            .policy_document(document)
            .set_as_default(set_as_default)
            .send()
            .await
            .map_err(|e| iam_error(OPERATION, e))?;

        output
            .policy_version()
            .and_then(|v| v.version_id())
            .map(str::to_string)
            .ok_or_else(|| PolicyError::remote(OPERATION, "response has no version id"))
    }
}

/// S3 client wrapper
#[derive(Debug, Clone)]
pub struct AwsObjectStore {
    client: aws_sdk_s3::Client,
}

impl AwsObjectStore {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(sdk_config),
        }
    }

    pub fn from_client(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for AwsObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> PolicyResult<Option<Vec<u8>>> {
        const OPERATION: &str = "GetObject";

        let output = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    debug!("Object s3://{}/{} does not exist", bucket, key);
                    return Ok(None);
                }
                return Err(PolicyError::remote(
                    OPERATION,
                    aws_sdk_s3::error::DisplayErrorContext(e).to_string(),
                ));
            }
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| PolicyError::remote(OPERATION, e.to_string()))?;

        Ok(Some(data.into_bytes().to_vec()))
    }
}
