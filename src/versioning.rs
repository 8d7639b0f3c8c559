//! Managed policy version lifecycle
//!
//! A managed policy keeps at most [`MAX_POLICY_VERSIONS`] stored versions,
//! exactly one of which is the default. Publishing therefore always runs
//! list → retire → create, and never deletes the default version.

use crate::document::PolicyDocument;
use crate::error::{PolicyError, PolicyResult};
use crate::service::IdentityService;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Stored version limit enforced by the identity service
pub const MAX_POLICY_VERSIONS: usize = 5;

/// Version ID type (opaque, e.g. "v3")
pub type VersionId = String;

/// One stored version of a managed policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredVersion {
    pub version_id: VersionId,
    pub is_default: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl StoredVersion {
    pub fn new(version_id: impl Into<VersionId>, is_default: bool) -> Self {
        Self {
            version_id: version_id.into(),
            is_default,
            created_at: None,
        }
    }

    /// Attach the creation time reported by the service
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// Non-empty list of stored versions ordered newest first
#[derive(Debug, Clone)]
pub struct VersionListing {
    versions: Vec<StoredVersion>,
}

impl VersionListing {
    /// Build a listing from the service's enumeration
    ///
    /// When every version carries a creation time the listing is sorted by
    /// it. Otherwise the service order (newest first) is trusted as-is; that
    /// order is not a documented guarantee of the service.
    pub fn new(policy_arn: &str, mut versions: Vec<StoredVersion>) -> PolicyResult<Self> {
        if versions.is_empty() {
            return Err(PolicyError::NotFound(policy_arn.to_string()));
        }

        if versions.iter().all(|v| v.created_at.is_some()) {
            // Stable: equal timestamps keep service order
            versions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        } else {
            warn!(
                "Versions of {} lack creation times, trusting listing order",
                policy_arn
            );
        }

        Ok(Self { versions })
    }

    /// Most recently created version
    pub fn newest(&self) -> &StoredVersion {
        &self.versions[0]
    }

    /// Least recently created version
    pub fn oldest(&self) -> &StoredVersion {
        &self.versions[self.versions.len() - 1]
    }

    /// (newest, oldest) version ids; identical when only one version exists
    pub fn newest_and_oldest(&self) -> (&str, &str) {
        (&self.newest().version_id, &self.oldest().version_id)
    }

    pub fn default_version(&self) -> Option<&StoredVersion> {
        self.versions.iter().find(|v| v.is_default)
    }

    /// Version currently enforced, falling back to the newest if the service
    /// flagged none as default
    pub fn active(&self) -> &StoredVersion {
        self.default_version().unwrap_or_else(|| self.newest())
    }

    /// Oldest version that may be deleted
    ///
    /// The active version is never a candidate, so a policy with a single
    /// version has nothing to retire.
    pub fn retirement_candidate(&self) -> Option<&StoredVersion> {
        let active = &self.active().version_id;
        self.versions
            .iter()
            .rev()
            .find(|v| &v.version_id != active)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Always false; listings are non-empty by construction
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoredVersion> {
        self.versions.iter()
    }
}

/// Version manager for a single managed policy
#[derive(Clone)]
pub struct PolicyVersionManager {
    identity: Arc<dyn IdentityService>,
    policy_arn: String,
}

impl PolicyVersionManager {
    pub fn new(identity: Arc<dyn IdentityService>, policy_arn: impl Into<String>) -> Self {
        Self {
            identity,
            policy_arn: policy_arn.into(),
        }
    }

    pub fn policy_arn(&self) -> &str {
        &self.policy_arn
    }

    /// Enumerate stored versions
    pub async fn list_versions(&self) -> PolicyResult<VersionListing> {
        debug!("Listing versions of policy {}", self.policy_arn);

        let versions = self
            .identity
            .list_policy_versions(&self.policy_arn)
            .await?;
        let listing = VersionListing::new(&self.policy_arn, versions)?;

        let (newest, oldest) = listing.newest_and_oldest();
        info!(
            "Found {} versions of policy {} (newest {}, oldest {})",
            listing.len(),
            self.policy_arn,
            newest,
            oldest
        );

        Ok(listing)
    }

    /// Fetch and decode a stored version's document
    pub async fn get_document(&self, version_id: &str) -> PolicyResult<PolicyDocument> {
        debug!(
            "Fetching document of version {} of policy {}",
            version_id, self.policy_arn
        );

        let raw = self
            .identity
            .get_policy_version(&self.policy_arn, version_id)
            .await?;

        PolicyDocument::decode(&raw)
    }

    /// Delete a stored version
    ///
    /// Callers must not pass the default version; the service rejects it.
    pub async fn delete_version(&self, version_id: &str) -> PolicyResult<()> {
        debug!("Deleting version {} of policy {}", version_id, self.policy_arn);

        self.identity
            .delete_policy_version(&self.policy_arn, version_id)
            .await?;

        info!("Deleted version {} of policy {}", version_id, self.policy_arn);
        Ok(())
    }

    /// Retire the oldest non-default version so one more can be created
    ///
    /// Returns the retired version id, if any. Fails before anything is
    /// deleted when the policy would still be at the version limit.
    pub async fn make_room(&self, listing: &VersionListing) -> PolicyResult<Option<VersionId>> {
        let candidate = listing.retirement_candidate();

        let remaining = listing.len() - usize::from(candidate.is_some());
        if remaining >= MAX_POLICY_VERSIONS {
            return Err(PolicyError::VersionQuota {
                policy_arn: self.policy_arn.clone(),
                count: remaining,
                max: MAX_POLICY_VERSIONS,
            });
        }

        match candidate {
            Some(candidate) => {
                self.delete_version(&candidate.version_id).await?;
                Ok(Some(candidate.version_id.clone()))
            }
            None => {
                info!(
                    "Only the default version {} exists for policy {}, nothing to retire",
                    listing.active().version_id,
                    self.policy_arn
                );
                Ok(None)
            }
        }
    }

    /// Publish a document as the new default version
    pub async fn publish(&self, document: &PolicyDocument) -> PolicyResult<VersionId> {
        let text = document.encode()?;

        debug!(
            "Creating version of policy {} ({} bytes)",
            self.policy_arn,
            text.len()
        );

        let version_id = self
            .identity
            .create_policy_version(&self.policy_arn, &text, true)
            .await?;

        info!(
            "Published version {} as default of policy {}",
            version_id, self.policy_arn
        );
        Ok(version_id)
    }
}
