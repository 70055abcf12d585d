use serde::{Deserialize, Serialize};

use crate::types::{QuidId, Timestamp};

/// A provenance-tracked trust edge extracted from a block.
///
/// Edges extracted from blocks this node accepted as Trusted live in the
/// verified store; edges from any other crypto-valid block live in the
/// unverified store and only contribute to enhanced trust after being
/// discounted by the observer's trust in `validator_quid`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrustEdge {
    pub truster: QuidId,
    pub trustee: QuidId,
    pub trust_level: f64,
    /// Hash of the block this edge was extracted from.
    pub source_block: String,
    /// The validator that recorded the block.
    pub validator_quid: QuidId,
    pub verified: bool,
    pub timestamp: Timestamp,
}
