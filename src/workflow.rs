//! Add-IP and reset workflows
//!
//! Both run a fixed sequence of remote calls and stop at the first failing
//! step. Retirement always precedes publishing so the policy never needs a
//! sixth stored version.
//!
//! Add-IP: list → fetch active document → append IP → retire oldest → publish
//!
//! The append is local, so a document that cannot take the IP is rejected
//! before anything is deleted.
//!
//! Reset: list → retire oldest → fetch baseline → publish

use crate::baseline::BaselineLoader;
use crate::config::PolicyConfig;
use crate::error::PolicyResult;
use crate::service::{IdentityService, ObjectStore};
use crate::versioning::{PolicyVersionManager, VersionId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Add-IP invocation payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddIpEvent {
    #[serde(rename = "sourceIp", alias = "SourceIp")]
    pub source_ip: String,
}

impl AddIpEvent {
    pub fn new(source_ip: impl Into<String>) -> Self {
        Self {
            source_ip: source_ip.into(),
        }
    }
}

/// Result of a completed workflow run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOutcome {
    /// Version created and made default
    pub published_version: VersionId,
    /// Version deleted to make room, if any
    pub retired_version: Option<VersionId>,
    /// Human-readable completion message
    pub message: String,
}

impl fmt::Display for WorkflowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Appends a source IP to the allowlist policy
pub struct AddIpWorkflow {
    versions: PolicyVersionManager,
}

impl AddIpWorkflow {
    pub fn new(identity: Arc<dyn IdentityService>, config: &PolicyConfig) -> Self {
        Self {
            versions: PolicyVersionManager::new(identity, config.policy_arn.clone()),
        }
    }

    pub async fn run(&self, event: &AddIpEvent) -> PolicyResult<WorkflowOutcome> {
        let policy_arn = self.versions.policy_arn();
        info!("Adding source IP {} to policy {}", event.source_ip, policy_arn);

        let listing = self.versions.list_versions().await?;

        let active = listing.active().version_id.clone();
        info!("Fetching current document from version {}", active);
        let mut document = self.versions.get_document(&active).await?;
        document.add_source_ip(event.source_ip.as_str())?;

        let retired_version = self.versions.make_room(&listing).await?;
        let published_version = self.versions.publish(&document).await?;

        let message = format!(
            "Added source IP {} to policy {} (version {})",
            event.source_ip, policy_arn, published_version
        );
        info!("{}", message);

        Ok(WorkflowOutcome {
            published_version,
            retired_version,
            message,
        })
    }
}

/// Restores the allowlist policy to its baseline document
pub struct ResetWorkflow {
    versions: PolicyVersionManager,
    baseline: BaselineLoader,
}

impl ResetWorkflow {
    /// Fails when the configuration names no baseline location
    pub fn new(
        identity: Arc<dyn IdentityService>,
        store: Arc<dyn ObjectStore>,
        config: &PolicyConfig,
    ) -> PolicyResult<Self> {
        let location = config.baseline()?.clone();
        Ok(Self {
            versions: PolicyVersionManager::new(identity, config.policy_arn.clone()),
            baseline: BaselineLoader::new(store, location),
        })
    }

    pub async fn run(&self) -> PolicyResult<WorkflowOutcome> {
        let policy_arn = self.versions.policy_arn();
        info!(
            "Resetting policy {} to baseline {}",
            policy_arn,
            self.baseline.location()
        );

        let listing = self.versions.list_versions().await?;
        let retired_version = self.versions.make_room(&listing).await?;

        let document = self.baseline.load().await?;
        let published_version = self.versions.publish(&document).await?;

        let message = format!(
            "Reset policy {} to baseline {} (version {})",
            policy_arn,
            self.baseline.location(),
            published_version
        );
        info!("{}", message);

        Ok(WorkflowOutcome {
            published_version,
            retired_version,
            message,
        })
    }
}
