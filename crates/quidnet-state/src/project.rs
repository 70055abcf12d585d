//! Registry projector: folds a newly committed block into the
//! materialized views and keeps the trust cache coherent.

use tracing::{info, warn};

use quidnet_core::{Block, QuidId, Transaction, TrustEdge};

use crate::ledger::Ledger;

impl Ledger {
    /// Apply every transaction of a committed block to the registries.
    /// Any trust mutation purges the whole trust cache afterwards.
    pub(crate) fn apply_block_transactions(&self, block: &Block) {
        let mut trust_mutated = false;

        for tx in &block.transactions {
            match tx {
                Transaction::Trust(t) => {
                    if t.truster == t.trustee {
                        // Self-trust is the algorithmic constant 1.0 and
                        // is never materialized.
                        warn!(quid = %t.truster, "skipping self-trust declaration");
                        continue;
                    }
                    let mut tables = self.trust.write().expect("trust registry lock poisoned");
                    tables
                        .levels
                        .entry(t.truster.clone())
                        .or_default()
                        .insert(t.trustee.clone(), t.trust_level);
                    tables
                        .nonces
                        .entry(t.truster.clone())
                        .or_default()
                        .insert(t.trustee.clone(), t.nonce);
                    trust_mutated = true;
                }
                Transaction::Identity(t) => {
                    let mut identities =
                        self.identities.write().expect("identity registry lock poisoned");
                    identities.insert(t.quid_id.clone(), t.clone());
                }
                Transaction::Title(t) => {
                    let mut titles = self.titles.write().expect("title registry lock poisoned");
                    titles.insert(t.asset_id.clone(), t.clone());
                }
                Transaction::Event(t) => {
                    let mut streams = self.events.write().expect("event streams lock poisoned");
                    let stream = streams.entry(t.subject_id.clone()).or_default();
                    stream.latest_sequence = stream.latest_sequence.max(t.sequence);
                    stream.events.push(t.clone());
                }
            }
        }

        if trust_mutated {
            self.invalidate_trust_cache();
        }
        info!(
            index = block.index,
            txs = block.transactions.len(),
            "block projected into registries"
        );
    }

    /// Record every trust declaration of a crypto-valid block as an
    /// unverified edge, overwriting any prior recording for the same
    /// (truster, trustee) pair.
    pub(crate) fn extract_unverified_edges(&self, block: &Block) {
        let validator = block.trust_proof.validator_id.clone();
        let mut store = self
            .unverified_edges
            .write()
            .expect("unverified edges lock poisoned");
        for t in block.trust_transactions() {
            store.entry(t.truster.clone()).or_default().insert(
                t.trustee.clone(),
                TrustEdge {
                    truster: t.truster.clone(),
                    trustee: t.trustee.clone(),
                    trust_level: t.trust_level,
                    source_block: block.hash.clone(),
                    validator_quid: validator.clone(),
                    verified: false,
                    timestamp: block.timestamp,
                },
            );
        }
    }

    /// Promote a Trusted block's edges into the verified store and drop
    /// the matching unverified recordings.
    pub(crate) fn promote_block_edges(&self, block: &Block) {
        let validator = block.trust_proof.validator_id.clone();
        let pairs: Vec<(QuidId, QuidId, f64)> = block
            .trust_transactions()
            .map(|t| (t.truster.clone(), t.trustee.clone(), t.trust_level))
            .collect();
        if pairs.is_empty() {
            return;
        }

        {
            let mut verified = self
                .verified_edges
                .write()
                .expect("verified edges lock poisoned");
            for (truster, trustee, level) in &pairs {
                verified.entry(truster.clone()).or_default().insert(
                    trustee.clone(),
                    TrustEdge {
                        truster: truster.clone(),
                        trustee: trustee.clone(),
                        trust_level: *level,
                        source_block: block.hash.clone(),
                        validator_quid: validator.clone(),
                        verified: true,
                        timestamp: block.timestamp,
                    },
                );
            }
        }

        let mut unverified = self
            .unverified_edges
            .write()
            .expect("unverified edges lock poisoned");
        for (truster, trustee, _) in &pairs {
            if let Some(edges) = unverified.get_mut(truster) {
                edges.remove(trustee);
                if edges.is_empty() {
                    unverified.remove(truster);
                }
            }
        }
    }
}
