//! Block generation: trust-filtered selection from the pending pool,
//! signing, and routing through the full acceptance pipeline.

use chrono::Utc;
use tracing::{debug, info};

use quidnet_core::constants::{DEFAULT_DOMAIN, DEFAULT_TRUST_MAX_DEPTH, TRANSACTION_TRUST_THRESHOLD};
use quidnet_core::{Block, BlockVerdict, QuidId, QuidnetError, SubjectType, Transaction, TrustProof};
use quidnet_crypto::block_hash;

use crate::ledger::Ledger;

impl Ledger {
    /// Generate, sign, and locally commit a block for `domain` from the
    /// pending pool. Returns `None` when no pending transaction survives
    /// the domain and trust filters. The committed block is handed back
    /// for the external broadcaster.
    pub fn generate_block(&self, domain: &str) -> Result<Option<Block>, QuidnetError> {
        let name = Self::resolve_domain_name(domain).to_string();
        if !self.is_domain_supported(&name) {
            return Err(QuidnetError::DomainUnsupported(name));
        }
        let registered = self
            .get_domain(&name)
            .ok_or_else(|| QuidnetError::DomainUnknown(name.clone()))?;
        if !registered.is_validator(self.node_id()) {
            return Err(QuidnetError::DomainUnsupported(format!(
                "this node is not a validator for {name}"
            )));
        }

        // Domain selection, then the trust-aware filter: only include
        // work from creators this observer trusts enough.
        let candidates: Vec<Transaction> = {
            let pending = self.pending.read().expect("pending pool lock poisoned");
            pending
                .iter()
                .filter(|tx| {
                    let d = tx.trust_domain();
                    d == name || (d.is_empty() && name == DEFAULT_DOMAIN)
                })
                .cloned()
                .collect()
        };
        let selected: Vec<Transaction> = candidates
            .into_iter()
            .filter(|tx| {
                let creator = self.creator_quid(tx);
                let trusted = self
                    .compute_trust(self.node_id(), &creator, Some(DEFAULT_TRUST_MAX_DEPTH))
                    .map(|r| r.level >= TRANSACTION_TRUST_THRESHOLD)
                    .unwrap_or(false);
                if !trusted {
                    debug!(tx = tx.id(), %creator, "pending transaction below trust threshold");
                }
                trusted
            })
            .collect();
        if selected.is_empty() {
            return Ok(None);
        }

        let head = self.head();
        let now = Utc::now().timestamp();
        let mut block = Block {
            index: head.index + 1,
            timestamp: now,
            transactions: selected,
            trust_proof: TrustProof {
                trust_domain: name.clone(),
                validator_id: self.node_id().clone(),
                validator_public_key: self.public_key_hex(),
                validator_sigs: Vec::new(),
                validation_time: now,
            },
            prev_hash: head.hash,
            hash: String::new(),
        };
        let sig = self.keypair().sign_hex(&block.signable_bytes()?);
        block.trust_proof.validator_sigs = vec![sig];
        block.hash = block_hash(&block)?;

        // Route through the full pipeline so projection and promotion
        // run exactly as they would for a remote block.
        let verdict = self.receive_block(block.clone())?;
        if verdict != BlockVerdict::Trusted {
            return Err(QuidnetError::BlockInvalid(format!(
                "self-generated block was not accepted: {verdict:?}"
            )));
        }

        {
            let included: Vec<String> =
                block.transactions.iter().map(|tx| tx.id().to_string()).collect();
            let mut pending = self.pending.write().expect("pending pool lock poisoned");
            pending.retain(|tx| !included.contains(&tx.id().to_string()));
        }

        // Committed trust declarations may have raised our trust in a
        // deferred validator.
        if block.trust_transactions().next().is_some() {
            self.re_evaluate_all_tentative();
        }

        info!(
            index = block.index,
            txs = block.transactions.len(),
            domain = %name,
            "block generated"
        );
        Ok(Some(block))
    }

    /// The quid whose trustworthiness gates a pending transaction:
    /// the truster, the identity's creator, the title's first owner, or
    /// the event subject's owner (first title owner) or the subject
    /// itself.
    fn creator_quid(&self, tx: &Transaction) -> QuidId {
        match tx {
            Transaction::Trust(t) => t.truster.clone(),
            Transaction::Identity(t) => t.creator.clone(),
            Transaction::Title(t) => t
                .owners
                .first()
                .map(|o| o.owner_id.clone())
                .unwrap_or_else(|| t.asset_id.clone()),
            Transaction::Event(t) => match t.subject_type {
                SubjectType::Quid => t.subject_id.clone(),
                SubjectType::Title => {
                    let titles = self.titles.read().expect("title registry lock poisoned");
                    titles
                        .get(&t.subject_id)
                        .and_then(|title| title.owners.first())
                        .map(|o| o.owner_id.clone())
                        .unwrap_or_else(|| t.subject_id.clone())
                }
            },
        }
    }
}
