//! The subjective block-acceptance pipeline.
//!
//! Cryptographic validity is universal: every observer agrees on it.
//! Acceptance is not: each observer computes its own relational trust in
//! the block's validator and commits, defers, or discards accordingly.
//! Trust edges are extracted from every crypto-valid block regardless of
//! the verdict, so even an untrusted validator's recordings remain
//! available (discounted) to enhanced trust computations.

use tracing::{debug, info};

use quidnet_core::constants::{DEFAULT_TRUST_MAX_DEPTH, DISTRUST_THRESHOLD};
use quidnet_core::{Block, BlockVerdict, QuidnetError};
use quidnet_crypto::{block_hash, quid_from_pubkey_hex, verify_signature_hex};

use crate::ledger::Ledger;

impl Ledger {
    // ── Cryptographic validation (observer-independent) ──────────────────────

    /// Validate linkage, hash, proof shape, validator binding, validator
    /// signature, and every embedded transaction. Mutates nothing.
    pub fn validate_block_crypto(&self, block: &Block) -> Result<(), QuidnetError> {
        {
            let chain = self.chain.read().expect("blockchain lock poisoned");
            let prev = chain
                .last()
                .ok_or_else(|| QuidnetError::BlockInvalid("empty local chain".into()))?;
            if block.index != prev.index + 1 || block.prev_hash != prev.hash {
                return Err(QuidnetError::ChainMismatch {
                    expected_index: prev.index + 1,
                    expected_prev: prev.hash.clone(),
                    got_index: block.index,
                });
            }
        }

        let recomputed = block_hash(block)?;
        if recomputed != block.hash {
            return Err(QuidnetError::BlockInvalid(format!(
                "hash mismatch: declared {}, recomputed {recomputed}",
                block.hash
            )));
        }

        let proof = &block.trust_proof;
        if proof.validator_sigs.is_empty() {
            return Err(QuidnetError::BlockInvalid("trust proof has no signatures".into()));
        }

        // Bind the claimed validator id to the embedded key. Self-signed
        // blocks may omit the key; substitute our own iff the id is ours.
        let validator_key = if proof.validator_public_key.is_empty() {
            if proof.validator_id != *self.node_id() {
                return Err(QuidnetError::BlockInvalid(
                    "trust proof has no validator public key".into(),
                ));
            }
            self.public_key_hex()
        } else {
            proof.validator_public_key.clone()
        };
        let derived = quid_from_pubkey_hex(&validator_key)
            .map_err(|_| QuidnetError::BlockInvalid("malformed validator public key".into()))?;
        if derived != proof.validator_id {
            return Err(QuidnetError::BlockInvalid(format!(
                "validator id {} does not derive from the embedded key",
                proof.validator_id
            )));
        }

        let signable = block.signable_bytes()?;
        verify_signature_hex(&validator_key, &signable, &proof.validator_sigs[0])
            .map_err(|_| QuidnetError::BlockInvalid("validator signature does not verify".into()))?;

        for tx in &block.transactions {
            self.validate_transaction(tx).map_err(|e| {
                QuidnetError::BlockInvalid(format!("transaction {}: {e}", tx.id()))
            })?;
        }
        Ok(())
    }

    // ── Tiered trust acceptance (observer-subjective) ────────────────────────

    /// Classify a crypto-valid block against this observer's trust graph.
    /// The validator signature is re-verified here against the key
    /// registered in the domain, not just the one embedded in the block.
    pub fn evaluate_block_trust(&self, block: &Block) -> BlockVerdict {
        let proof = &block.trust_proof;
        let Some(domain) = self.get_domain(&proof.trust_domain) else {
            return BlockVerdict::Invalid;
        };
        if !domain.is_validator(&proof.validator_id) {
            return BlockVerdict::Invalid;
        }
        let Some(registered_key) = domain.registered_key(&proof.validator_id) else {
            return BlockVerdict::Invalid;
        };
        let Ok(signable) = block.signable_bytes() else {
            return BlockVerdict::Invalid;
        };
        if verify_signature_hex(registered_key, &signable, &proof.validator_sigs[0]).is_err() {
            return BlockVerdict::Invalid;
        }

        if proof.validator_id == *self.node_id() {
            return BlockVerdict::Trusted;
        }

        // A capped traversal still yields a usable partial level.
        let tau = self
            .compute_trust(
                self.node_id(),
                &proof.validator_id,
                Some(DEFAULT_TRUST_MAX_DEPTH),
            )
            .map(|r| r.level)
            .unwrap_or(0.0);

        if tau >= domain.trust_threshold {
            BlockVerdict::Trusted
        } else if tau > DISTRUST_THRESHOLD {
            BlockVerdict::Tentative
        } else {
            BlockVerdict::Untrusted
        }
    }

    // ── ReceiveBlock ─────────────────────────────────────────────────────────

    /// The pipeline entrypoint for candidate blocks, local or remote.
    ///
    /// Crypto-invalid blocks are rejected without touching any registry
    /// (in particular, no edges are extracted). Otherwise edges are
    /// extracted first, then the tiered verdict dispatches:
    /// Trusted → commit; Tentative → defer (duplicate hashes are
    /// reported, not re-deferred); Untrusted → discard, keeping the
    /// extracted edges.
    pub fn receive_block(&self, block: Block) -> Result<BlockVerdict, QuidnetError> {
        self.validate_block_crypto(&block)?;
        self.extract_unverified_edges(&block);

        let verdict = self.evaluate_block_trust(&block);
        match verdict {
            BlockVerdict::Trusted => {
                self.commit_block(&block);
            }
            BlockVerdict::Tentative => {
                let domain = Self::resolve_domain_name(&block.trust_proof.trust_domain).to_string();
                let mut tentative = self.tentative.write().expect("tentative blocks lock poisoned");
                let entry = tentative.entry(domain.clone()).or_default();
                if entry.iter().any(|b| b.hash == block.hash) {
                    return Err(QuidnetError::Duplicate(block.hash));
                }
                info!(index = block.index, hash = %block.hash, %domain, "block deferred as tentative");
                entry.push(block);
            }
            BlockVerdict::Untrusted => {
                debug!(index = block.index, hash = %block.hash, "block discarded as untrusted");
            }
            BlockVerdict::Invalid => {
                return Err(QuidnetError::BlockInvalid(
                    "validator not acceptable under the declared domain".into(),
                ));
            }
        }
        Ok(verdict)
    }

    /// Append, project, and promote. Callers must not hold any registry
    /// lock.
    pub(crate) fn commit_block(&self, block: &Block) {
        {
            let mut chain = self.chain.write().expect("blockchain lock poisoned");
            chain.push(block.clone());
        }
        self.apply_block_transactions(block);
        self.promote_block_edges(block);
        info!(index = block.index, hash = %block.hash, "block committed");
    }

    // ── Re-evaluation ────────────────────────────────────────────────────────

    /// Rescan a domain's tentative blocks against the current trust
    /// graph. Returns the number of blocks promoted. Invoked after any
    /// change that could raise this node's trust in a validator.
    pub fn re_evaluate_tentative_blocks(&self, domain: &str) -> usize {
        let name = Self::resolve_domain_name(domain).to_string();
        let candidates = {
            let mut tentative = self.tentative.write().expect("tentative blocks lock poisoned");
            tentative.remove(&name).unwrap_or_default()
        };
        if candidates.is_empty() {
            return 0;
        }

        let mut kept = Vec::new();
        let mut promoted = 0;
        for block in candidates {
            match self.evaluate_block_trust(&block) {
                BlockVerdict::Trusted => {
                    info!(index = block.index, hash = %block.hash, "tentative block promoted");
                    self.commit_block(&block);
                    promoted += 1;
                }
                BlockVerdict::Tentative => kept.push(block),
                BlockVerdict::Untrusted | BlockVerdict::Invalid => {
                    debug!(index = block.index, hash = %block.hash, "tentative block dropped");
                }
            }
        }

        if !kept.is_empty() {
            let mut tentative = self.tentative.write().expect("tentative blocks lock poisoned");
            tentative.entry(name).or_default().extend(kept);
        }
        promoted
    }

    /// Re-evaluate every domain that currently holds tentative blocks.
    pub fn re_evaluate_all_tentative(&self) -> usize {
        let names: Vec<String> = {
            let tentative = self.tentative.read().expect("tentative blocks lock poisoned");
            tentative.keys().cloned().collect()
        };
        names
            .iter()
            .map(|n| self.re_evaluate_tentative_blocks(n))
            .sum()
    }
}
