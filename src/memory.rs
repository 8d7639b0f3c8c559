//! In-memory identity and object storage services
//!
//! Mirrors the identity service behavior the workflows depend on: the
//! stored version limit, refusal to delete the default version, URL-encoded
//! documents and newest-first listings. Every call is recorded, and any
//! operation can be made to fail.

use crate::error::{PolicyError, PolicyResult};
use crate::service::{IdentityService, ObjectStore};
use crate::versioning::{StoredVersion, VersionId, MAX_POLICY_VERSIONS};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use std::collections::{HashMap, HashSet};

/// Creation times start here and advance one second per version
const CLOCK_EPOCH: i64 = 1_600_000_000;

/// Identity service operations, as recorded in the call log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityOperation {
    ListPolicyVersions,
    GetPolicyVersion,
    DeletePolicyVersion,
    CreatePolicyVersion,
}

impl IdentityOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityOperation::ListPolicyVersions => "ListPolicyVersions",
            IdentityOperation::GetPolicyVersion => "GetPolicyVersion",
            IdentityOperation::DeletePolicyVersion => "DeletePolicyVersion",
            IdentityOperation::CreatePolicyVersion => "CreatePolicyVersion",
        }
    }
}

#[derive(Debug, Clone)]
struct MemoryVersion {
    version_id: VersionId,
    document: String,
    is_default: bool,
    created_at: DateTime<Utc>,
}

/// Versions of one policy, oldest first
#[derive(Debug)]
struct MemoryPolicy {
    versions: Vec<MemoryVersion>,
    next_version: u64,
}

impl MemoryPolicy {
    fn push(&mut self, document: &str, set_as_default: bool) -> PolicyResult<VersionId> {
        if self.versions.len() >= MAX_POLICY_VERSIONS {
            return Err(PolicyError::remote(
                IdentityOperation::CreatePolicyVersion.as_str(),
                format!(
                    "LimitExceeded: a managed policy can have at most {} versions",
                    MAX_POLICY_VERSIONS
                ),
            ));
        }

        serde_json::from_str::<serde_json::Value>(document).map_err(|e| {
            PolicyError::remote(
                IdentityOperation::CreatePolicyVersion.as_str(),
                format!("MalformedPolicyDocument: {}", e),
            )
        })?;

        self.next_version += 1;
        let version_id = format!("v{}", self.next_version);
        let created_at = DateTime::from_timestamp(CLOCK_EPOCH + self.next_version as i64, 0)
            .unwrap_or_default();

        // The first version of a policy is always the default
        let is_default = set_as_default || self.versions.is_empty();
        if is_default {
            for version in &mut self.versions {
                version.is_default = false;
            }
        }

        self.versions.push(MemoryVersion {
            version_id: version_id.clone(),
            document: document.to_string(),
            is_default,
            created_at,
        });

        Ok(version_id)
    }
}

/// Identity service backed by process memory
#[derive(Debug)]
pub struct InMemoryIdentityService {
    policies: Mutex<HashMap<String, MemoryPolicy>>,
    calls: Mutex<Vec<IdentityOperation>>,
    failing: Mutex<HashSet<IdentityOperation>>,
    report_timestamps: bool,
}

impl InMemoryIdentityService {
    pub fn new() -> Self {
        Self {
            policies: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            report_timestamps: true,
        }
    }

    /// Omit creation times from listings, leaving only list order
    pub fn without_timestamps(mut self) -> Self {
        self.report_timestamps = false;
        self
    }

    /// Create (or replace) a policy with a single default version
    ///
    /// The document is stored as given so tests can seed malformed policies.
    pub fn create_policy(&self, policy_arn: &str, document: &str) -> VersionId {
        let policy = MemoryPolicy {
            versions: vec![MemoryVersion {
                version_id: "v1".to_string(),
                document: document.to_string(),
                is_default: true,
                created_at: DateTime::from_timestamp(CLOCK_EPOCH + 1, 0).unwrap_or_default(),
            }],
            next_version: 1,
        };
        self.policies.lock().insert(policy_arn.to_string(), policy);
        "v1".to_string()
    }

    /// Add a default version without going through the call log
    pub fn push_version(&self, policy_arn: &str, document: &str) -> PolicyResult<VersionId> {
        let mut policies = self.policies.lock();
        let policy = policies.get_mut(policy_arn).ok_or_else(|| {
            Self::no_such_entity(IdentityOperation::CreatePolicyVersion, policy_arn)
        })?;
        policy.push(document, true)
    }

    /// Make every subsequent call of `operation` fail
    pub fn fail_on(&self, operation: IdentityOperation) {
        self.failing.lock().insert(operation);
    }

    /// Operations attempted so far, in order
    pub fn calls(&self) -> Vec<IdentityOperation> {
        self.calls.lock().clone()
    }

    /// Stored versions of a policy, newest first
    pub fn versions(&self, policy_arn: &str) -> Vec<StoredVersion> {
        self.policies
            .lock()
            .get(policy_arn)
            .map(|policy| {
                policy
                    .versions
                    .iter()
                    .rev()
                    .map(|v| StoredVersion::new(v.version_id.clone(), v.is_default))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Plain JSON document of a stored version
    pub fn document(&self, policy_arn: &str, version_id: &str) -> Option<String> {
        self.policies.lock().get(policy_arn).and_then(|policy| {
            policy
                .versions
                .iter()
                .find(|v| v.version_id == version_id)
                .map(|v| v.document.clone())
        })
    }

    /// Plain JSON document of the default version
    pub fn default_document(&self, policy_arn: &str) -> Option<String> {
        self.policies.lock().get(policy_arn).and_then(|policy| {
            policy
                .versions
                .iter()
                .find(|v| v.is_default)
                .map(|v| v.document.clone())
        })
    }

    fn record(&self, operation: IdentityOperation) -> PolicyResult<()> {
        self.calls.lock().push(operation);
        if self.failing.lock().contains(&operation) {
            return Err(PolicyError::remote(
                operation.as_str(),
                "ServiceFailure: injected failure",
            ));
        }
        Ok(())
    }

    fn no_such_entity(operation: IdentityOperation, what: &str) -> PolicyError {
        PolicyError::remote(operation.as_str(), format!("NoSuchEntity: {}", what))
    }
}

impl Default for InMemoryIdentityService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityService for InMemoryIdentityService {
    async fn list_policy_versions(&self, policy_arn: &str) -> PolicyResult<Vec<StoredVersion>> {
        let operation = IdentityOperation::ListPolicyVersions;
        self.record(operation)?;

        let policies = self.policies.lock();
        let policy = policies
            .get(policy_arn)
            .ok_or_else(|| Self::no_such_entity(operation, policy_arn))?;

        Ok(policy
            .versions
            .iter()
            .rev()
            .map(|v| {
                let version = StoredVersion::new(v.version_id.clone(), v.is_default);
                if self.report_timestamps {
                    version.with_created_at(v.created_at)
                } else {
                    version
                }
            })
            .collect())
    }

    async fn get_policy_version(
        &self,
        policy_arn: &str,
        version_id: &str,
    ) -> PolicyResult<String> {
        let operation = IdentityOperation::GetPolicyVersion;
        self.record(operation)?;

        let document = self
            .document(policy_arn, version_id)
            .ok_or_else(|| Self::no_such_entity(operation, version_id))?;

        Ok(utf8_percent_encode(&document, NON_ALPHANUMERIC).to_string())
    }

    async fn delete_policy_version(&self, policy_arn: &str, version_id: &str) -> PolicyResult<()> {
        let operation = IdentityOperation::DeletePolicyVersion;
        self.record(operation)?;

        let mut policies = self.policies.lock();
        let policy = policies
            .get_mut(policy_arn)
            .ok_or_else(|| Self::no_such_entity(operation, policy_arn))?;

        let index = policy
            .versions
            .iter()
            .position(|v| v.version_id == version_id)
            .ok_or_else(|| Self::no_such_entity(operation, version_id))?;

        if policy.versions[index].is_default {
            return Err(PolicyError::remote(
                operation.as_str(),
                format!("DeleteConflict: cannot delete the default version {}", version_id),
            ));
        }

        policy.versions.remove(index);
        Ok(())
    }

    async fn create_policy_version(
        &self,
        policy_arn: &str,
        document: &str,
        set_as_default: bool,
    ) -> PolicyResult<String> {
        let operation = IdentityOperation::CreatePolicyVersion;
        self.record(operation)?;

        let mut policies = self.policies.lock();
        let policy = policies
            .get_mut(policy_arn)
            .ok_or_else(|| Self::no_such_entity(operation, policy_arn))?;

        policy.push(document, set_as_default)
    }
}

/// Object store backed by process memory
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    unavailable: Mutex<bool>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_object(&self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) {
        self.objects
            .lock()
            .insert((bucket.to_string(), key.to_string()), data.into());
    }

    /// Make every read fail as if the service were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock() = unavailable;
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> PolicyResult<Option<Vec<u8>>> {
        if *self.unavailable.lock() {
            return Err(PolicyError::remote(
                "GetObject",
                "ServiceUnavailable: injected failure",
            ));
        }

        Ok(self
            .objects
            .lock()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned())
    }
}
