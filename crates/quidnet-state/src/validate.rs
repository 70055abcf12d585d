//! Per-kind transaction validation.
//!
//! Checks run in a fixed order for every kind: domain gate, field bounds,
//! kind-specific semantics, then the main signature over the canonical
//! signable form. Each check takes only the registry locks it needs and
//! releases them before the next.

use quidnet_core::constants::{
    MAX_DESCRIPTION_LEN, MAX_DOMAIN_LEN, MAX_EVENT_PAYLOAD_BYTES, MAX_EVENT_TYPE_LEN, MAX_NAME_LEN,
};
use quidnet_core::{
    EventTransaction, IdentityTransaction, Ownership, QuidId, QuidnetError, SubjectType,
    TitleTransaction, Transaction, TrustTransaction,
};
use quidnet_crypto::{quid_from_pubkey_hex, verify_signature_hex};

use crate::ledger::Ledger;

impl Ledger {
    /// Validate `tx` against the current registries. Mutates nothing.
    pub fn validate_transaction(&self, tx: &Transaction) -> Result<(), QuidnetError> {
        self.check_domain_gate(tx)?;
        check_field_bounds(tx)?;
        match tx {
            Transaction::Trust(t) => self.check_trust_semantics(t)?,
            Transaction::Identity(t) => self.check_identity_semantics(t)?,
            Transaction::Title(t) => self.check_title_semantics(t)?,
            Transaction::Event(t) => self.check_event_semantics(t)?,
        }
        check_signer_binding(tx)?;
        let bytes = tx.signable_bytes()?;
        verify_signature_hex(tx.public_key(), &bytes, tx.signature())
    }

    /// A non-empty trust_domain must name a registered domain; the empty
    /// string is reserved for the implicit default domain.
    fn check_domain_gate(&self, tx: &Transaction) -> Result<(), QuidnetError> {
        let name = tx.trust_domain();
        if name.is_empty() {
            return Ok(());
        }
        let domains = self.domains.read().expect("trust domains lock poisoned");
        if !domains.contains_key(name) {
            return Err(QuidnetError::DomainUnknown(name.to_string()));
        }
        Ok(())
    }

    // ── Kind-specific semantics ──────────────────────────────────────────────

    /// Replay protection: nonce strictly above the last accepted one for
    /// this (truster, trustee) pair.
    fn check_trust_semantics(&self, t: &TrustTransaction) -> Result<(), QuidnetError> {
        if t.nonce == 0 {
            return Err(QuidnetError::FieldInvalid("trust nonce must be positive".into()));
        }
        let tables = self.trust.read().expect("trust registry lock poisoned");
        let last = tables
            .nonces
            .get(&t.truster)
            .and_then(|m| m.get(&t.trustee))
            .copied()
            .unwrap_or(0);
        if t.nonce <= last {
            return Err(QuidnetError::NonceReplay {
                scope: format!("{}->{}", t.truster, t.trustee),
                got: t.nonce,
                last,
            });
        }
        Ok(())
    }

    /// Updates must advance the nonce and keep creatorship immutable.
    fn check_identity_semantics(&self, t: &IdentityTransaction) -> Result<(), QuidnetError> {
        let identities = self.identities.read().expect("identity registry lock poisoned");
        if let Some(existing) = identities.get(&t.quid_id) {
            if t.update_nonce <= existing.update_nonce {
                return Err(QuidnetError::NonceReplay {
                    scope: format!("identity {}", t.quid_id),
                    got: t.update_nonce,
                    last: existing.update_nonce,
                });
            }
            if t.creator != existing.creator {
                return Err(QuidnetError::OwnershipViolation(format!(
                    "identity {} was created by {}",
                    t.quid_id, existing.creator
                )));
            }
        }
        Ok(())
    }

    fn check_title_semantics(&self, t: &TitleTransaction) -> Result<(), QuidnetError> {
        {
            let identities = self.identities.read().expect("identity registry lock poisoned");
            if !identities.contains_key(&t.asset_id) {
                return Err(QuidnetError::FieldInvalid(format!(
                    "asset {} has no identity record",
                    t.asset_id
                )));
            }
        }

        // Binary-equal, no epsilon.
        if t.ownership_sum() != 100.0 {
            return Err(QuidnetError::FieldInvalid(format!(
                "ownership percentages sum to {}, expected exactly 100",
                t.ownership_sum()
            )));
        }

        if !t.previous_owners.is_empty() {
            let current = {
                let titles = self.titles.read().expect("title registry lock poisoned");
                titles.get(&t.asset_id).map(|cur| cur.owners.clone())
            };
            let Some(current) = current else {
                return Err(QuidnetError::OwnershipViolation(format!(
                    "transfer of {} but no committed title exists",
                    t.asset_id
                )));
            };
            if !owners_multiset_equal(&t.previous_owners, &current) {
                return Err(QuidnetError::OwnershipViolation(
                    "previous_owners do not match the committed owners".into(),
                ));
            }
            self.check_previous_owner_signatures(t)?;
        }
        Ok(())
    }

    /// Every previous owner must have countersigned the transfer. The
    /// countersignature covers the transaction with the main signature,
    /// main public key, and the signatures map cleared, and must verify
    /// against a key that derives the owner's quid.
    fn check_previous_owner_signatures(&self, t: &TitleTransaction) -> Result<(), QuidnetError> {
        let bytes = t.owner_signable_bytes()?;
        for owner in &t.previous_owners {
            let sig = t.signatures.get(&owner.owner_id).ok_or_else(|| {
                QuidnetError::OwnershipViolation(format!(
                    "missing signature from previous owner {}",
                    owner.owner_id
                ))
            })?;
            let owner_key = {
                let identities = self.identities.read().expect("identity registry lock poisoned");
                identities
                    .get(&owner.owner_id)
                    .map(|rec| rec.public_key.clone())
            };
            let Some(owner_key) = owner_key else {
                return Err(QuidnetError::OwnershipViolation(format!(
                    "previous owner {} has no identity record",
                    owner.owner_id
                )));
            };
            if quid_from_pubkey_hex(&owner_key)? != owner.owner_id {
                return Err(QuidnetError::OwnershipViolation(format!(
                    "identity key for {} does not derive its quid",
                    owner.owner_id
                )));
            }
            verify_signature_hex(&owner_key, &bytes, sig).map_err(|_| {
                QuidnetError::OwnershipViolation(format!(
                    "invalid countersignature from {}",
                    owner.owner_id
                ))
            })?;
        }
        Ok(())
    }

    fn check_event_semantics(&self, t: &EventTransaction) -> Result<(), QuidnetError> {
        let signer = quid_from_pubkey_hex(&t.public_key)?;
        match t.subject_type {
            SubjectType::Quid => {
                let identities = self.identities.read().expect("identity registry lock poisoned");
                let record = identities.get(&t.subject_id).ok_or_else(|| {
                    QuidnetError::FieldInvalid(format!("unknown event subject {}", t.subject_id))
                })?;
                if t.public_key != record.public_key {
                    return Err(QuidnetError::OwnershipViolation(format!(
                        "event signer is not the subject {}",
                        t.subject_id
                    )));
                }
            }
            SubjectType::Title => {
                let titles = self.titles.read().expect("title registry lock poisoned");
                let title = titles.get(&t.subject_id).ok_or_else(|| {
                    QuidnetError::FieldInvalid(format!("unknown event subject {}", t.subject_id))
                })?;
                if !title.owners.iter().any(|o| o.owner_id == signer) {
                    return Err(QuidnetError::OwnershipViolation(format!(
                        "event signer {signer} does not own {}",
                        t.subject_id
                    )));
                }
            }
        }

        let streams = self.events.read().expect("event streams lock poisoned");
        match streams.get(&t.subject_id) {
            Some(stream) if t.sequence <= stream.latest_sequence => {
                Err(QuidnetError::FieldInvalid(format!(
                    "event sequence {} not above latest {}",
                    t.sequence, stream.latest_sequence
                )))
            }
            Some(_) => Ok(()),
            // A new stream starts at 0 or 1.
            None if t.sequence <= 1 => Ok(()),
            None => Err(QuidnetError::FieldInvalid(format!(
                "new event stream must start at 0 or 1, got {}",
                t.sequence
            ))),
        }
    }
}

// ── Field bounds (pure, lock-free) ───────────────────────────────────────────

fn check_field_bounds(tx: &Transaction) -> Result<(), QuidnetError> {
    check_string("trust_domain", tx.trust_domain(), MAX_DOMAIN_LEN)?;
    if tx.id().is_empty() {
        return Err(QuidnetError::FieldInvalid("transaction id is empty".into()));
    }
    check_string("id", tx.id(), MAX_NAME_LEN)?;

    match tx {
        Transaction::Trust(t) => {
            check_quid("truster", &t.truster)?;
            check_quid("trustee", &t.trustee)?;
            check_trust_level(t.trust_level)?;
            if let Some(d) = &t.description {
                check_string("description", d, MAX_DESCRIPTION_LEN)?;
            }
        }
        Transaction::Identity(t) => {
            check_quid("quid_id", &t.quid_id)?;
            check_quid("creator", &t.creator)?;
            if t.name.is_empty() {
                return Err(QuidnetError::FieldInvalid("identity name is empty".into()));
            }
            check_string("name", &t.name, MAX_NAME_LEN)?;
            if let Some(d) = &t.description {
                check_string("description", d, MAX_DESCRIPTION_LEN)?;
            }
            if let Some(attrs) = &t.attributes {
                for (k, v) in attrs {
                    check_string("attribute key", k, MAX_NAME_LEN)?;
                    check_string("attribute value", v, MAX_DESCRIPTION_LEN)?;
                }
            }
        }
        Transaction::Title(t) => {
            check_quid("asset_id", &t.asset_id)?;
            if t.owners.is_empty() {
                return Err(QuidnetError::FieldInvalid("title has no owners".into()));
            }
            for o in t.owners.iter().chain(t.previous_owners.iter()) {
                check_quid("owner_id", &o.owner_id)?;
                if !o.percentage.is_finite() || o.percentage <= 0.0 {
                    return Err(QuidnetError::FieldInvalid(format!(
                        "ownership percentage {} for {}",
                        o.percentage, o.owner_id
                    )));
                }
            }
            if let Some(tt) = &t.title_type {
                check_string("title_type", tt, MAX_NAME_LEN)?;
            }
        }
        Transaction::Event(t) => {
            check_quid("subject_id", &t.subject_id)?;
            if t.event_type.is_empty() {
                return Err(QuidnetError::FieldInvalid("event_type is empty".into()));
            }
            check_string("event_type", &t.event_type, MAX_EVENT_TYPE_LEN)?;
            if let Some(cid) = &t.payload_cid {
                check_string("payload_cid", cid, MAX_NAME_LEN)?;
            }
            if let Some(payload) = &t.payload {
                let size = serde_json::to_vec(payload)
                    .map_err(|e| QuidnetError::Serialization(e.to_string()))?
                    .len();
                if size > MAX_EVENT_PAYLOAD_BYTES {
                    return Err(QuidnetError::FieldInvalid(format!(
                        "event payload is {size} bytes, max {MAX_EVENT_PAYLOAD_BYTES}"
                    )));
                }
            }
        }
    }
    Ok(())
}

/// The public key must derive the quid acting in the transaction: the
/// truster, the identity's creator, or (for titles) one of the declared
/// owners. Event signers are pinned by the kind-specific rules.
fn check_signer_binding(tx: &Transaction) -> Result<(), QuidnetError> {
    let signer = quid_from_pubkey_hex(tx.public_key())?;
    let bound = match tx {
        Transaction::Trust(t) => t.truster == signer,
        Transaction::Identity(t) => t.creator == signer,
        Transaction::Title(t) => t.owners.iter().any(|o| o.owner_id == signer),
        Transaction::Event(_) => true,
    };
    if !bound {
        return Err(QuidnetError::SignatureInvalid);
    }
    Ok(())
}

fn check_quid(field: &str, quid: &QuidId) -> Result<(), QuidnetError> {
    if !quid.is_well_formed() {
        return Err(QuidnetError::FieldInvalid(format!(
            "{field} is not a 16-char lowercase hex quid: {quid:?}"
        )));
    }
    Ok(())
}

fn check_trust_level(level: f64) -> Result<(), QuidnetError> {
    if !level.is_finite() || !(0.0..=1.0).contains(&level) {
        return Err(QuidnetError::FieldInvalid(format!(
            "trust_level {level} outside [0, 1]"
        )));
    }
    Ok(())
}

fn check_string(field: &str, value: &str, max: usize) -> Result<(), QuidnetError> {
    if value.len() > max {
        return Err(QuidnetError::FieldInvalid(format!(
            "{field} exceeds {max} bytes"
        )));
    }
    if value.bytes().any(|b| b.is_ascii_control()) {
        return Err(QuidnetError::FieldInvalid(format!(
            "{field} contains control characters"
        )));
    }
    Ok(())
}

/// Multiset equality on (owner, percentage) pairs, order-insensitive.
fn owners_multiset_equal(a: &[Ownership], b: &[Ownership]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut remaining: Vec<&Ownership> = b.iter().collect();
    for o in a {
        match remaining
            .iter()
            .position(|r| r.owner_id == o.owner_id && r.percentage == o.percentage)
        {
            Some(i) => {
                remaining.swap_remove(i);
            }
            None => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn own(id: &str, pct: f64) -> Ownership {
        Ownership {
            owner_id: QuidId::new(id),
            percentage: pct,
        }
    }

    #[test]
    fn multiset_equality_ignores_order() {
        let a = vec![own("aaaaaaaaaaaaaaaa", 60.0), own("bbbbbbbbbbbbbbbb", 40.0)];
        let b = vec![own("bbbbbbbbbbbbbbbb", 40.0), own("aaaaaaaaaaaaaaaa", 60.0)];
        assert!(owners_multiset_equal(&a, &b));
    }

    #[test]
    fn multiset_equality_respects_percentages_and_duplicates() {
        let a = vec![own("aaaaaaaaaaaaaaaa", 60.0), own("bbbbbbbbbbbbbbbb", 40.0)];
        let b = vec![own("aaaaaaaaaaaaaaaa", 40.0), own("bbbbbbbbbbbbbbbb", 60.0)];
        assert!(!owners_multiset_equal(&a, &b));
        let c = vec![own("aaaaaaaaaaaaaaaa", 50.0), own("aaaaaaaaaaaaaaaa", 50.0)];
        let d = vec![own("aaaaaaaaaaaaaaaa", 50.0), own("bbbbbbbbbbbbbbbb", 50.0)];
        assert!(!owners_multiset_equal(&c, &d));
    }

    #[test]
    fn trust_level_bounds() {
        assert!(check_trust_level(0.0).is_ok());
        assert!(check_trust_level(1.0).is_ok());
        assert!(check_trust_level(f64::NAN).is_err());
        assert!(check_trust_level(f64::INFINITY).is_err());
        assert!(check_trust_level(-0.1).is_err());
        assert!(check_trust_level(1.1).is_err());
    }

    #[test]
    fn strings_reject_control_characters() {
        assert!(check_string("name", "plain text", 256).is_ok());
        assert!(check_string("name", "with\nnewline", 256).is_err());
        assert!(check_string("name", &"x".repeat(300), 256).is_err());
    }
}
