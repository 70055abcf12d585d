//! Genesis bootstrap: the index-0 block and the default trust domain.

use std::collections::BTreeMap;

use quidnet_core::constants::GENESIS_PREV_HASH;
use quidnet_core::{Block, QuidnetError, TrustDomain, TrustProof};
use quidnet_crypto::{block_hash, KeyPair};

/// Build and self-sign the genesis block for `domain`.
///
/// Deterministic given the node key: a fixed timestamp keeps the genesis
/// hash stable across restarts of the same identity. Each observer's chain
/// is its own projection, so genesis does not need to agree across nodes.
pub fn genesis_block(keypair: &KeyPair, domain: &str) -> Result<Block, QuidnetError> {
    let mut block = Block {
        index: 0,
        timestamp: 0,
        transactions: Vec::new(),
        trust_proof: TrustProof {
            trust_domain: domain.to_string(),
            validator_id: keypair.quid_id.clone(),
            validator_public_key: keypair.public_key_hex(),
            validator_sigs: Vec::new(),
            validation_time: 0,
        },
        prev_hash: GENESIS_PREV_HASH.to_string(),
        hash: String::new(),
    };
    let sig = keypair.sign_hex(&block.signable_bytes()?);
    block.trust_proof.validator_sigs = vec![sig];
    block.hash = block_hash(&block)?;
    Ok(block)
}

/// The domain installed at genesis, with this node as its sole validator.
pub fn bootstrap_domain(keypair: &KeyPair, name: &str) -> TrustDomain {
    let mut validators = BTreeMap::new();
    validators.insert(keypair.quid_id.clone(), 1.0);
    let mut keys = BTreeMap::new();
    keys.insert(keypair.quid_id.clone(), keypair.public_key_hex());
    TrustDomain {
        name: name.to_string(),
        validator_nodes: vec![keypair.quid_id.clone()],
        trust_threshold: quidnet_core::constants::DEFAULT_TRUST_THRESHOLD,
        validators,
        validator_public_keys: keys,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_is_index_zero_on_the_zero_hash() {
        let kp = KeyPair::generate();
        let block = genesis_block(&kp, "default").unwrap();
        assert_eq!(block.index, 0);
        assert_eq!(block.prev_hash, GENESIS_PREV_HASH);
        assert!(block.transactions.is_empty());
        assert_eq!(block.hash, block_hash(&block).unwrap());
    }

    #[test]
    fn genesis_signature_verifies_with_the_node_key() {
        let kp = KeyPair::generate();
        let block = genesis_block(&kp, "default").unwrap();
        let sig = &block.trust_proof.validator_sigs[0];
        quidnet_crypto::verify_signature_hex(
            &kp.public_key_hex(),
            &block.signable_bytes().unwrap(),
            sig,
        )
        .unwrap();
    }

    #[test]
    fn bootstrap_domain_registers_the_node_key() {
        let kp = KeyPair::generate();
        let domain = bootstrap_domain(&kp, "default");
        assert!(domain.is_validator(&kp.quid_id));
        assert_eq!(
            domain.registered_key(&kp.quid_id),
            Some(kp.public_key_hex().as_str())
        );
    }
}
