use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::QUID_ID_LEN;

/// Unix timestamp (seconds, UTC).
pub type Timestamp = i64;

/// Per-(truster, trustee) replay counter for trust declarations.
pub type Nonce = u64;

// ── QuidId ───────────────────────────────────────────────────────────────────

/// 16-character lowercase-hex identity: the first 16 hex chars of
/// SHA-256(public-key-bytes). Every entity in the system — node, person,
/// organization, asset — is addressed by one of these.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuidId(pub String);

impl QuidId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the string is exactly 16 lowercase hex characters.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == QUID_ID_LEN
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}

impl fmt::Display for QuidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for QuidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuidId({})", self.0)
    }
}

impl From<&str> for QuidId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ── NodeEntry ────────────────────────────────────────────────────────────────

/// A peer node known to this node. The directory is maintained by the core
/// and consumed by the external discovery layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeEntry {
    pub node_id: QuidId,
    /// Reachable address, e.g. `host:port`.
    pub address: String,
    /// Unix timestamp of the last successful contact (0 = never).
    pub last_seen: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_quid_ids() {
        assert!(QuidId::new("0123456789abcdef").is_well_formed());
        assert!(!QuidId::new("0123456789ABCDEF").is_well_formed()); // uppercase
        assert!(!QuidId::new("0123456789abcde").is_well_formed()); // 15 chars
        assert!(!QuidId::new("0123456789abcdeg").is_well_formed()); // non-hex
        assert!(!QuidId::new("").is_well_formed());
    }
}
