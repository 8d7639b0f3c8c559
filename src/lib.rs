//! # iam-ip-allowlist - Source IP allowlist policy rotation
//!
//! Maintains an IAM managed policy whose single statement exempts a list of
//! source IPs through a `NotIpAddress` condition. A managed policy keeps at
//! most five stored versions, so every change is published as a new default
//! version after retiring the oldest one:
//!
//! - **add-ip**: append one IP to the current document and publish it
//! - **reset**: publish the baseline document kept in S3
//!
//! ## Architecture
//!
//! - **Document model** → [`PolicyDocument`] and its URL-encoded wire codec
//! - **Version lifecycle** → [`PolicyVersionManager`] (list, retire, publish)
//! - **Baseline** → [`BaselineLoader`] over an [`ObjectStore`]
//! - **Workflows** → [`AddIpWorkflow`] and [`ResetWorkflow`]
//! - **Collaborators** → [`IdentityService`] / [`ObjectStore`], backed by the
//!   AWS SDK ([`aws`]) or, with the `testing` feature, process memory
//!   (`memory`)
//!
//! ## Example
//!
//! ```no_run
//! use iam_ip_allowlist::aws::{load_sdk_config, AwsIdentityService};
//! use iam_ip_allowlist::{AddIpEvent, AddIpWorkflow, PolicyConfig};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let sdk_config = load_sdk_config().await;
//! let identity = Arc::new(AwsIdentityService::new(&sdk_config));
//!
//! let config = PolicyConfig::new("arn:aws:iam::123456789012:policy/ip-allowlist");
//! let workflow = AddIpWorkflow::new(identity, &config);
//!
//! let outcome = workflow.run(&AddIpEvent::new("203.0.113.7/32")).await.unwrap();
//! println!("{}", outcome);
//! # });
//! ```

pub mod aws;
pub mod baseline;
pub mod config;
pub mod document;
pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod service;
pub mod versioning;
pub mod workflow;

pub use baseline::BaselineLoader;
pub use config::{BaselineLocation, PolicyConfig};
pub use document::{Condition, NotIpAddress, PolicyDocument, Statement};
pub use error::{PolicyError, PolicyResult};
pub use service::{IdentityService, ObjectStore};
pub use versioning::{
    PolicyVersionManager, StoredVersion, VersionId, VersionListing, MAX_POLICY_VERSIONS,
};
pub use workflow::{AddIpEvent, AddIpWorkflow, ResetWorkflow, WorkflowOutcome};
