//! Trust domains and the supported-domain matching rules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::QuidId;

/// A namespace scoping validators, thresholds, and pending transactions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrustDomain {
    pub name: String,
    /// Quids permitted to validate blocks in this domain.
    pub validator_nodes: Vec<QuidId>,
    /// Observer trust at or above this accepts the validator's blocks.
    pub trust_threshold: f64,
    /// Validator weights (informational; acceptance is relational).
    pub validators: BTreeMap<QuidId, f64>,
    /// Registered key per validator, hex-encoded uncompressed P-256.
    pub validator_public_keys: BTreeMap<QuidId, String>,
}

impl TrustDomain {
    pub fn is_validator(&self, quid: &QuidId) -> bool {
        self.validator_nodes.contains(quid)
    }

    pub fn registered_key(&self, quid: &QuidId) -> Option<&str> {
        self.validator_public_keys.get(quid).map(String::as_str)
    }
}

/// Whether `name` is matched by the pattern `pattern`.
///
/// A pattern starting with `*.` matches any strict subdomain: at least one
/// extra label is required, so `*.example.com` matches `a.example.com` but
/// not `example.com` itself. Any other pattern matches by exact equality.
pub fn pattern_matches(pattern: &str, name: &str) -> bool {
    if let Some(suffix) = pattern.strip_prefix("*.") {
        return name.len() > suffix.len() + 1
            && name.ends_with(suffix)
            && name.as_bytes()[name.len() - suffix.len() - 1] == b'.';
    }
    pattern == name
}

/// Whether `name` is supported under `patterns`. An empty pattern list
/// means the node is open: every domain is supported.
pub fn domain_supported(patterns: &[String], name: &str) -> bool {
    patterns.is_empty() || patterns.iter().any(|p| pattern_matches(p, name))
}
