//! Collaborator interfaces for the identity and object storage services
//!
//! Workflows only talk to these traits. `crate::aws` backs them with the AWS
//! SDK and `crate::memory` with in-process state for tests.

use crate::error::PolicyResult;
use crate::versioning::StoredVersion;
use async_trait::async_trait;

/// Identity service operations on managed policy versions
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// List stored versions, newest first as returned by the service
    async fn list_policy_versions(&self, policy_arn: &str) -> PolicyResult<Vec<StoredVersion>>;

    /// Fetch a version's document text (URL-encoded JSON)
    async fn get_policy_version(&self, policy_arn: &str, version_id: &str)
        -> PolicyResult<String>;

    /// Delete a non-default stored version
    async fn delete_policy_version(&self, policy_arn: &str, version_id: &str) -> PolicyResult<()>;

    /// Create a new stored version, returning its version id
    async fn create_policy_version(
        &self,
        policy_arn: &str,
        document: &str,
        set_as_default: bool,
    ) -> PolicyResult<String>;
}

/// Object storage read access
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read an object's bytes, or `None` if the object does not exist
    async fn get_object(&self, bucket: &str, key: &str) -> PolicyResult<Option<Vec<u8>>>;
}
