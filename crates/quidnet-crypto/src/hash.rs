use sha2::{Digest, Sha256};

use quidnet_core::constants::QUID_ID_LEN;
use quidnet_core::{Block, QuidId, QuidnetError};

/// SHA-256 of arbitrary bytes, hex-encoded.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Derive a quid ID from raw public key bytes: the first 16 hex chars of
/// SHA-256(public_key_bytes).
pub fn quid_from_pubkey(pubkey_bytes: &[u8]) -> QuidId {
    QuidId::new(&sha256_hex(pubkey_bytes)[..QUID_ID_LEN])
}

/// Derive a quid ID from a hex-encoded public key.
pub fn quid_from_pubkey_hex(pubkey_hex: &str) -> Result<QuidId, QuidnetError> {
    let bytes = hex::decode(pubkey_hex).map_err(|_| QuidnetError::SignatureInvalid)?;
    Ok(quid_from_pubkey(&bytes))
}

/// Compute a block's hash: SHA-256 over the canonical hashing form,
/// hex-encoded.
pub fn block_hash(block: &Block) -> Result<String, QuidnetError> {
    Ok(sha256_hex(&block.hashable_bytes()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quid_is_first_16_hex_of_sha256() {
        let pk = [7u8; 65];
        let full = sha256_hex(&pk);
        let quid = quid_from_pubkey(&pk);
        assert_eq!(quid.as_str(), &full[..16]);
        assert!(quid.is_well_formed());
    }

    #[test]
    fn quid_from_hex_matches_raw_derivation() {
        let pk = [9u8; 65];
        let from_hex = quid_from_pubkey_hex(&hex::encode(pk)).unwrap();
        assert_eq!(from_hex, quid_from_pubkey(&pk));
    }

    #[test]
    fn bad_hex_is_a_signature_error() {
        assert!(matches!(
            quid_from_pubkey_hex("zz"),
            Err(QuidnetError::SignatureInvalid)
        ));
    }
}
