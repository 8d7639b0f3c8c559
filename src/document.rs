//! IAM policy document structure
//!
//! The allowlist policy holds a single statement whose `NotIpAddress`
//! condition lists the source IPs exempted from its effect. The identity
//! service hands documents back URL-encoded, while baseline documents in
//! object storage are plain JSON.

use crate::error::{PolicyError, PolicyResult};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

/// Source IP list inside a `NotIpAddress` condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotIpAddress {
    /// IP or CIDR literals, in insertion order
    #[serde(rename = "aws:SourceIp")]
    pub source_ip: Vec<String>,
}

/// Statement condition block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Condition {
    pub not_ip_address: NotIpAddress,
}

/// A single policy statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Statement {
    pub sid: String,
    pub effect: String,
    pub action: String,
    pub resource: String,
    pub condition: Condition,
}

impl Statement {
    /// Source IPs listed in this statement's condition
    pub fn source_ips(&self) -> &[String] {
        &self.condition.not_ip_address.source_ip
    }
}

/// Complete policy document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct PolicyDocument {
    /// Policy language version, e.g. "2012-10-17"
    pub version: String,

    /// Policy statements; the allowlist lives at index 0
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    /// Decode a document as returned by the identity service (URL-encoded JSON)
    ///
    /// Query-string rules apply: `+` is a space and `%2B` a literal plus.
    pub fn decode(raw: &str) -> PolicyResult<Self> {
        let unplussed = raw.replace('+', " ");
        let text = percent_decode_str(&unplussed)
            .decode_utf8()
            .map_err(|e| PolicyError::Decode(format!("invalid percent-encoding: {}", e)))?;
        Self::from_json(&text)
    }

    /// Parse a plain JSON document
    pub fn from_json(json: &str) -> PolicyResult<Self> {
        let document: PolicyDocument =
            serde_json::from_str(json).map_err(|e| PolicyError::Decode(e.to_string()))?;

        if document.statement.is_empty() {
            return Err(PolicyError::Decode(
                "policy document has no statements".to_string(),
            ));
        }

        Ok(document)
    }

    /// Encode to the compact JSON text accepted by CreatePolicyVersion
    pub fn encode(&self) -> PolicyResult<String> {
        serde_json::to_string(self).map_err(|e| PolicyError::Decode(e.to_string()))
    }

    /// The allowlist statement; the document must hold exactly one statement
    pub fn allowlist_statement(&self) -> PolicyResult<&Statement> {
        match self.statement.as_slice() {
            [statement] => Ok(statement),
            [] => Err(PolicyError::MalformedDocument(
                "policy document has no statements".to_string(),
            )),
            many => Err(PolicyError::MalformedDocument(format!(
                "expected a single allowlist statement, found {}",
                many.len()
            ))),
        }
    }

    /// Append a source IP to the allowlist statement
    ///
    /// The literal is not validated; the identity service decides whether
    /// it is acceptable.
    pub fn add_source_ip(&mut self, ip: impl Into<String>) -> PolicyResult<()> {
        self.allowlist_statement()?;
        self.statement[0]
            .condition
            .not_ip_address
            .source_ip
            .push(ip.into());
        Ok(())
    }

    /// Source IPs of the allowlist statement
    pub fn source_ips(&self) -> PolicyResult<&[String]> {
        Ok(self.allowlist_statement()?.source_ips())
    }
}
