use serde::{Deserialize, Serialize};

use quidnet_core::{QuidId, TrustEdge};
use quidnet_trust::{Confidence, EnhancedTrustResult, TrustResult, VerificationGap};

/// Result of `quidnet_createQuid`. The private key is returned exactly
/// once; the node keeps no copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcCreatedQuid {
    pub quid_id: String,
    pub public_key_hex: String,
    pub private_key_hex: String,
    pub created_at: i64,
}

/// Parameters for `quidnet_getTrust`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcTrustQuery {
    pub observer: String,
    pub target: String,
    /// When set, the named domain must be registered on this node.
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default)]
    pub include_unverified: Option<bool>,
}

/// Relational trust result; the enhanced fields are present only for
/// enhanced queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcTrustResult {
    pub observer: String,
    pub target: String,
    pub level: f64,
    pub path: Vec<String>,
    /// Set when the traversal hit its resource caps; the level is then a
    /// partial (lower-bound) result.
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unverified_hops: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_gaps: Option<Vec<RpcVerificationGap>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcVerificationGap {
    pub from: String,
    pub to: String,
    pub validator_quid: String,
    pub validator_trust: f64,
}

/// A provenance-tracked edge as returned by `quidnet_getTrustEdges`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcTrustEdge {
    pub truster: String,
    pub trustee: String,
    pub trust_level: f64,
    pub source_block: String,
    pub validator_quid: String,
    pub verified: bool,
    pub timestamp: i64,
}

/// Node metadata returned by `quidnet_getNodeInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcNodeInfo {
    pub node_id: String,
    pub domains: Vec<String>,
    pub block_height: u64,
    pub version: String,
}

impl RpcTrustResult {
    pub fn plain(observer: &QuidId, target: &QuidId, r: TrustResult) -> Self {
        Self {
            observer: observer.to_string(),
            target: target.to_string(),
            level: r.level,
            path: r.path.iter().map(QuidId::to_string).collect(),
            truncated: r.graph_too_large,
            unverified_hops: None,
            verification_gaps: None,
            confidence: None,
        }
    }

    pub fn enhanced(observer: &QuidId, target: &QuidId, r: EnhancedTrustResult) -> Self {
        let confidence = match r.confidence {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        };
        Self {
            observer: observer.to_string(),
            target: target.to_string(),
            level: r.level,
            path: r.path.iter().map(QuidId::to_string).collect(),
            truncated: r.graph_too_large,
            unverified_hops: Some(r.unverified_hops),
            verification_gaps: Some(r.verification_gaps.iter().map(RpcVerificationGap::from).collect()),
            confidence: Some(confidence.to_string()),
        }
    }
}

impl From<&VerificationGap> for RpcVerificationGap {
    fn from(g: &VerificationGap) -> Self {
        Self {
            from: g.from.to_string(),
            to: g.to.to_string(),
            validator_quid: g.validator_quid.to_string(),
            validator_trust: g.validator_trust,
        }
    }
}

impl From<&TrustEdge> for RpcTrustEdge {
    fn from(e: &TrustEdge) -> Self {
        Self {
            truster: e.truster.to_string(),
            trustee: e.trustee.to_string(),
            trust_level: e.trust_level,
            source_block: e.source_block.clone(),
            validator_quid: e.validator_quid.to_string(),
            verified: e.verified,
            timestamp: e.timestamp,
        }
    }
}
