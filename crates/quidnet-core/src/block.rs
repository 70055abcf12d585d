//! Block and trust-proof types, plus the canonical forms used for hashing
//! and validator signing.
//!
//! The canonical form of a block is a JSON object with keys in the order
//! `index, timestamp, transactions, trust_proof, prev_hash`; `hash` is
//! always excluded, and the signable form additionally clears
//! `validator_sigs`. Struct field order pins the key order, so the same
//! encoding is produced everywhere block bytes are needed.

use serde::{Deserialize, Serialize};

use crate::error::QuidnetError;
use crate::transaction::Transaction;
use crate::types::{QuidId, Timestamp};

// ── TrustProof ───────────────────────────────────────────────────────────────

/// Who validated a block, under which domain, and with what signature.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrustProof {
    pub trust_domain: String,
    pub validator_id: QuidId,
    /// Hex-encoded 65-byte uncompressed P-256 key. Binds `validator_id`:
    /// the first 16 hex chars of SHA-256 of these bytes must equal it.
    pub validator_public_key: String,
    pub validator_sigs: Vec<String>,
    pub validation_time: Timestamp,
}

// ── Block ────────────────────────────────────────────────────────────────────

/// A committed or candidate block. Immutable once committed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: Timestamp,
    pub transactions: Vec<Transaction>,
    pub trust_proof: TrustProof,
    pub prev_hash: String,
    pub hash: String,
}

/// Canonical hashing form: every field but `hash`, in canonical key order.
#[derive(Serialize)]
struct BlockHashForm<'a> {
    index: u64,
    timestamp: Timestamp,
    transactions: &'a [Transaction],
    trust_proof: &'a TrustProof,
    prev_hash: &'a str,
}

/// Signable form: as the hashing form, with `validator_sigs` cleared.
#[derive(Serialize)]
struct SignableProof<'a> {
    trust_domain: &'a str,
    validator_id: &'a QuidId,
    validator_public_key: &'a str,
    validator_sigs: [&'a str; 0],
    validation_time: Timestamp,
}

impl Block {
    /// Canonical bytes hashed into `hash`. Includes `validator_sigs`.
    pub fn hashable_bytes(&self) -> Result<Vec<u8>, QuidnetError> {
        let form = BlockHashForm {
            index: self.index,
            timestamp: self.timestamp,
            transactions: &self.transactions,
            trust_proof: &self.trust_proof,
            prev_hash: &self.prev_hash,
        };
        serde_json::to_vec(&form).map_err(|e| QuidnetError::Serialization(e.to_string()))
    }

    /// Canonical bytes covered by the validator signature: `hash` excluded
    /// and `validator_sigs` cleared.
    pub fn signable_bytes(&self) -> Result<Vec<u8>, QuidnetError> {
        #[derive(Serialize)]
        struct SignableForm<'a> {
            index: u64,
            timestamp: Timestamp,
            transactions: &'a [Transaction],
            trust_proof: SignableProof<'a>,
            prev_hash: &'a str,
        }
        let form = SignableForm {
            index: self.index,
            timestamp: self.timestamp,
            transactions: &self.transactions,
            trust_proof: SignableProof {
                trust_domain: &self.trust_proof.trust_domain,
                validator_id: &self.trust_proof.validator_id,
                validator_public_key: &self.trust_proof.validator_public_key,
                validator_sigs: [],
                validation_time: self.trust_proof.validation_time,
            },
            prev_hash: &self.prev_hash,
        };
        serde_json::to_vec(&form).map_err(|e| QuidnetError::Serialization(e.to_string()))
    }

    /// All trust transactions embedded in this block.
    pub fn trust_transactions(&self) -> impl Iterator<Item = &crate::transaction::TrustTransaction> {
        self.transactions.iter().filter_map(|tx| match tx {
            Transaction::Trust(t) => Some(t),
            _ => None,
        })
    }
}

// ── BlockVerdict ─────────────────────────────────────────────────────────────

/// The four-valued, observer-subjective outcome of block acceptance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockVerdict {
    /// Crypto-valid and the validator clears the domain's trust threshold;
    /// committed and projected.
    Trusted,
    /// Crypto-valid but the validator sits between the distrust and trust
    /// thresholds; held aside for re-evaluation.
    Tentative,
    /// Crypto-valid but the validator is at or below the distrust
    /// threshold; discarded (extracted edges are kept).
    Untrusted,
    /// Failed cryptographic validation; no state is mutated.
    Invalid,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        Block {
            index: 3,
            timestamp: 1_700_000_000,
            transactions: vec![],
            trust_proof: TrustProof {
                trust_domain: "default".into(),
                validator_id: QuidId::new("aaaaaaaaaaaaaaaa"),
                validator_public_key: "04ab".into(),
                validator_sigs: vec!["cafe".into()],
                validation_time: 1_700_000_000,
            },
            prev_hash: "ff".repeat(32),
            hash: "ee".repeat(32),
        }
    }

    #[test]
    fn hashable_form_has_canonical_key_order() {
        let block = sample_block();
        let bytes = block.hashable_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let idx_index = text.find("\"index\"").unwrap();
        let idx_ts = text.find("\"timestamp\"").unwrap();
        let idx_txs = text.find("\"transactions\"").unwrap();
        let idx_proof = text.find("\"trust_proof\"").unwrap();
        let idx_prev = text.find("\"prev_hash\"").unwrap();
        assert!(idx_index < idx_ts && idx_ts < idx_txs && idx_txs < idx_proof && idx_proof < idx_prev);
        assert!(!text.contains("\"hash\""));
    }

    #[test]
    fn signable_form_clears_validator_sigs() {
        let block = sample_block();
        let v: serde_json::Value =
            serde_json::from_slice(&block.signable_bytes().unwrap()).unwrap();
        assert!(v["trust_proof"]["validator_sigs"]
            .as_array()
            .unwrap()
            .is_empty());
        // The hashing form keeps them.
        let h: serde_json::Value =
            serde_json::from_slice(&block.hashable_bytes().unwrap()).unwrap();
        assert_eq!(h["trust_proof"]["validator_sigs"][0], "cafe");
    }
}
