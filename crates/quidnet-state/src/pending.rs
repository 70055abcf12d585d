//! Transaction ingress and the pending-pool snapshot.
//!
//! Each ingress method checks domain support, validates, and appends to
//! the pending pool. The pool is persisted to
//! `<data_dir>/pending_transactions.json` on shutdown and restored on
//! startup.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use quidnet_core::{
    EventTransaction, IdentityTransaction, QuidnetError, TitleTransaction, Transaction,
    TrustTransaction,
};

use crate::ledger::Ledger;

/// File name of the pending-pool snapshot inside the data directory.
pub const PENDING_SNAPSHOT_FILE: &str = "pending_transactions.json";

impl Ledger {
    // ── Ingress ──────────────────────────────────────────────────────────────

    /// Accept a trust declaration into the pending pool.
    ///
    /// A transaction arriving with `nonce == 0` gets `current + 1`
    /// assigned atomically under the nonce-table lock; if it is otherwise
    /// unsigned and names this node's key (a locally originated
    /// declaration), it is signed here as well.
    pub fn add_trust_transaction(&self, mut tx: TrustTransaction) -> Result<String, QuidnetError> {
        self.check_supported(&tx.trust_domain)?;

        if tx.nonce == 0 {
            let tables = self.trust.read().expect("trust registry lock poisoned");
            let last = tables
                .nonces
                .get(&tx.truster)
                .and_then(|m| m.get(&tx.trustee))
                .copied()
                .unwrap_or(0);
            tx.nonce = last + 1;
            drop(tables);

            if tx.signature.is_empty()
                && (tx.public_key.is_empty() || tx.public_key == self.public_key_hex())
                && tx.truster == *self.node_id()
            {
                tx.public_key = self.public_key_hex();
                let bytes = Transaction::Trust(tx.clone()).signable_bytes()?;
                tx.signature = self.keypair().sign_hex(&bytes);
            }
        }

        self.enqueue(Transaction::Trust(tx))
    }

    pub fn add_identity_transaction(
        &self,
        tx: IdentityTransaction,
    ) -> Result<String, QuidnetError> {
        self.check_supported(&tx.trust_domain)?;
        self.enqueue(Transaction::Identity(tx))
    }

    pub fn add_title_transaction(&self, tx: TitleTransaction) -> Result<String, QuidnetError> {
        self.check_supported(&tx.trust_domain)?;
        self.enqueue(Transaction::Title(tx))
    }

    pub fn add_event_transaction(&self, tx: EventTransaction) -> Result<String, QuidnetError> {
        self.check_supported(&tx.trust_domain)?;
        self.enqueue(Transaction::Event(tx))
    }

    /// Route an already-typed transaction to its ingress path.
    pub fn add_transaction(&self, tx: Transaction) -> Result<String, QuidnetError> {
        match tx {
            Transaction::Trust(t) => self.add_trust_transaction(t),
            Transaction::Identity(t) => self.add_identity_transaction(t),
            Transaction::Title(t) => self.add_title_transaction(t),
            Transaction::Event(t) => self.add_event_transaction(t),
        }
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.pending.read().expect("pending pool lock poisoned").clone()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.read().expect("pending pool lock poisoned").len()
    }

    fn check_supported(&self, domain: &str) -> Result<(), QuidnetError> {
        if !self.is_domain_supported(domain) {
            return Err(QuidnetError::DomainUnsupported(domain.to_string()));
        }
        Ok(())
    }

    fn enqueue(&self, tx: Transaction) -> Result<String, QuidnetError> {
        self.validate_transaction(&tx)?;
        let id = tx.id().to_string();
        let mut pending = self.pending.write().expect("pending pool lock poisoned");
        if pending.iter().any(|p| p.id() == id) {
            return Err(QuidnetError::Duplicate(id));
        }
        pending.push(tx);
        Ok(id)
    }

    // ── Snapshot persistence ─────────────────────────────────────────────────

    /// Write the pending pool to `<data_dir>/pending_transactions.json`.
    pub fn persist_pending(&self, data_dir: &Path) -> Result<(), QuidnetError> {
        let snapshot = self.pending_transactions();
        let json = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| QuidnetError::Serialization(e.to_string()))?;
        fs::write(data_dir.join(PENDING_SNAPSHOT_FILE), json)
            .map_err(|e| QuidnetError::Io(e.to_string()))?;
        info!(count = snapshot.len(), "pending pool persisted");
        Ok(())
    }

    /// Restore the pending pool from a prior snapshot, if one exists.
    /// Transactions that no longer validate (e.g. nonces consumed by
    /// blocks committed since) are dropped with a warning.
    pub fn restore_pending(&self, data_dir: &Path) -> Result<usize, QuidnetError> {
        let path = data_dir.join(PENDING_SNAPSHOT_FILE);
        if !path.exists() {
            return Ok(0);
        }
        let bytes = fs::read(&path).map_err(|e| QuidnetError::Io(e.to_string()))?;
        let snapshot: Vec<Transaction> =
            serde_json::from_slice(&bytes).map_err(|e| QuidnetError::Serialization(e.to_string()))?;

        let mut restored = 0;
        for tx in snapshot {
            match self.add_transaction(tx) {
                Ok(_) => restored += 1,
                Err(e) => warn!(error = %e, "dropping stale pending transaction from snapshot"),
            }
        }
        info!(count = restored, "pending pool restored");
        Ok(restored)
    }
}
