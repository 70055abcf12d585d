//! Transaction variants and their canonical signable forms.
//!
//! A transaction is a tagged sum discriminated by the JSON `type` field.
//! Every variant carries the shared base fields (`id`, `trust_domain`,
//! `timestamp`, `signature`, `public_key`) plus its kind-specific payload.
//!
//! Canonical bytes are the serde_json encoding of the transaction with the
//! `signature` field cleared; signatures and hashes everywhere in the
//! protocol are computed over this form. Map-valued fields use `BTreeMap`
//! so the encoding is stable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::QuidnetError;
use crate::types::{Nonce, QuidId, Timestamp};

// ── Ownership ────────────────────────────────────────────────────────────────

/// One owner's share of a titled asset. Percentages on a committed title
/// sum to exactly 100.0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ownership {
    pub owner_id: QuidId,
    pub percentage: f64,
}

// ── Variant payloads ─────────────────────────────────────────────────────────

/// Declares directed trust from `truster` toward `trustee`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrustTransaction {
    pub id: String,
    pub trust_domain: String,
    pub timestamp: Timestamp,
    pub truster: QuidId,
    pub trustee: QuidId,
    pub trust_level: f64,
    /// Strictly increasing per (truster, trustee); replay protection.
    pub nonce: Nonce,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<Timestamp>,
    pub signature: String,
    pub public_key: String,
}

/// Registers or updates the identity record for a quid.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentityTransaction {
    pub id: String,
    pub trust_domain: String,
    pub timestamp: Timestamp,
    pub quid_id: QuidId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, String>>,
    /// Immutable across updates of the same quid_id.
    pub creator: QuidId,
    /// Strictly increasing across updates of the same quid_id.
    pub update_nonce: Nonce,
    pub signature: String,
    pub public_key: String,
}

/// Declares or transfers ownership of a titled asset.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TitleTransaction {
    pub id: String,
    pub trust_domain: String,
    pub timestamp: Timestamp,
    pub asset_id: QuidId,
    pub owners: Vec<Ownership>,
    /// Non-empty on transfers; must multiset-equal the committed owners.
    #[serde(default)]
    pub previous_owners: Vec<Ownership>,
    /// Per-owner detached signatures (owner quid → signature hex) over the
    /// transaction with `signature`, `public_key`, and this map cleared.
    #[serde(default)]
    pub signatures: BTreeMap<QuidId, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_type: Option<String>,
    pub signature: String,
    pub public_key: String,
}

/// What an event transaction refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubjectType {
    #[serde(rename = "QUID")]
    Quid,
    #[serde(rename = "TITLE")]
    Title,
}

/// Appends an event to a quid's or title's event stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventTransaction {
    pub id: String,
    pub trust_domain: String,
    pub timestamp: Timestamp,
    pub subject_id: QuidId,
    pub subject_type: SubjectType,
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_cid: Option<String>,
    /// Strictly increasing within the subject's stream.
    pub sequence: u64,
    pub signature: String,
    pub public_key: String,
}

// ── Transaction ──────────────────────────────────────────────────────────────

/// A fully-formed, signed Quidnet transaction.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transaction {
    Trust(TrustTransaction),
    Identity(IdentityTransaction),
    Title(TitleTransaction),
    Event(EventTransaction),
}

impl Transaction {
    pub fn id(&self) -> &str {
        match self {
            Transaction::Trust(t) => &t.id,
            Transaction::Identity(t) => &t.id,
            Transaction::Title(t) => &t.id,
            Transaction::Event(t) => &t.id,
        }
    }

    pub fn trust_domain(&self) -> &str {
        match self {
            Transaction::Trust(t) => &t.trust_domain,
            Transaction::Identity(t) => &t.trust_domain,
            Transaction::Title(t) => &t.trust_domain,
            Transaction::Event(t) => &t.trust_domain,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            Transaction::Trust(t) => t.timestamp,
            Transaction::Identity(t) => t.timestamp,
            Transaction::Title(t) => t.timestamp,
            Transaction::Event(t) => t.timestamp,
        }
    }

    pub fn signature(&self) -> &str {
        match self {
            Transaction::Trust(t) => &t.signature,
            Transaction::Identity(t) => &t.signature,
            Transaction::Title(t) => &t.signature,
            Transaction::Event(t) => &t.signature,
        }
    }

    pub fn public_key(&self) -> &str {
        match self {
            Transaction::Trust(t) => &t.public_key,
            Transaction::Identity(t) => &t.public_key,
            Transaction::Title(t) => &t.public_key,
            Transaction::Event(t) => &t.public_key,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Transaction::Trust(_) => "trust",
            Transaction::Identity(_) => "identity",
            Transaction::Title(_) => "title",
            Transaction::Event(_) => "event",
        }
    }

    /// The canonical bytes covered by the main signature: the transaction
    /// with `signature` cleared, serialized as JSON.
    pub fn signable_bytes(&self) -> Result<Vec<u8>, QuidnetError> {
        let mut cleared = self.clone();
        match &mut cleared {
            Transaction::Trust(t) => t.signature.clear(),
            Transaction::Identity(t) => t.signature.clear(),
            Transaction::Title(t) => t.signature.clear(),
            Transaction::Event(t) => t.signature.clear(),
        }
        serde_json::to_vec(&cleared).map_err(|e| QuidnetError::Serialization(e.to_string()))
    }
}

impl TitleTransaction {
    /// The canonical bytes covered by each previous owner's detached
    /// signature on a transfer: `signature`, `public_key`, and the
    /// `signatures` map are all cleared.
    pub fn owner_signable_bytes(&self) -> Result<Vec<u8>, QuidnetError> {
        let mut cleared = self.clone();
        cleared.signature.clear();
        cleared.public_key.clear();
        cleared.signatures.clear();
        serde_json::to_vec(&Transaction::Title(cleared))
            .map_err(|e| QuidnetError::Serialization(e.to_string()))
    }

    /// Sum of owner percentages. Committed titles hold exactly 100.0.
    pub fn ownership_sum(&self) -> f64 {
        self.owners.iter().map(|o| o.percentage).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trust() -> TrustTransaction {
        TrustTransaction {
            id: "tx-1".into(),
            trust_domain: String::new(),
            timestamp: 1_700_000_000,
            truster: QuidId::new("aaaaaaaaaaaaaaaa"),
            trustee: QuidId::new("bbbbbbbbbbbbbbbb"),
            trust_level: 0.8,
            nonce: 1,
            description: None,
            valid_until: None,
            signature: "cafe".into(),
            public_key: "04ab".into(),
        }
    }

    #[test]
    fn signable_bytes_exclude_signature_only() {
        let tx = Transaction::Trust(sample_trust());
        let bytes = tx.signable_bytes().unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["signature"], "");
        assert_eq!(v["public_key"], "04ab");
        assert_eq!(v["type"], "trust");
    }

    #[test]
    fn signable_bytes_are_stable() {
        let tx = Transaction::Trust(sample_trust());
        assert_eq!(tx.signable_bytes().unwrap(), tx.signable_bytes().unwrap());
    }

    #[test]
    fn tagged_decoding_dispatches_on_type() {
        let json = serde_json::to_string(&Transaction::Trust(sample_trust())).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, Transaction::Trust(_)));
        assert_eq!(back.id(), "tx-1");
    }

    #[test]
    fn owner_signable_bytes_clear_key_and_sig_map() {
        let mut title = TitleTransaction {
            id: "tx-2".into(),
            trust_domain: String::new(),
            timestamp: 1_700_000_000,
            asset_id: QuidId::new("cccccccccccccccc"),
            owners: vec![Ownership {
                owner_id: QuidId::new("aaaaaaaaaaaaaaaa"),
                percentage: 100.0,
            }],
            previous_owners: vec![],
            signatures: BTreeMap::new(),
            expiry: None,
            title_type: None,
            signature: "cafe".into(),
            public_key: "04ab".into(),
        };
        title
            .signatures
            .insert(QuidId::new("aaaaaaaaaaaaaaaa"), "beef".into());

        let bytes = title.owner_signable_bytes().unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["signature"], "");
        assert_eq!(v["public_key"], "");
        assert!(v["signatures"].as_object().unwrap().is_empty());
    }

    #[test]
    fn ownership_sum_adds_percentages() {
        let title = TitleTransaction {
            id: "tx-3".into(),
            trust_domain: String::new(),
            timestamp: 0,
            asset_id: QuidId::new("cccccccccccccccc"),
            owners: vec![
                Ownership {
                    owner_id: QuidId::new("aaaaaaaaaaaaaaaa"),
                    percentage: 60.0,
                },
                Ownership {
                    owner_id: QuidId::new("bbbbbbbbbbbbbbbb"),
                    percentage: 40.0,
                },
            ],
            previous_owners: vec![],
            signatures: BTreeMap::new(),
            expiry: None,
            title_type: None,
            signature: String::new(),
            public_key: String::new(),
        };
        assert_eq!(title.ownership_sum(), 100.0);
    }
}
