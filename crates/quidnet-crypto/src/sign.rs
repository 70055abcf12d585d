//! ECDSA P-256 signing and verification over SHA-256.
//!
//! Signatures are the 64-byte fixed form (r ‖ s, each zero-padded to 32
//! bytes); public keys are 65-byte uncompressed SEC1 (0x04 ‖ X ‖ Y). Any
//! decoding failure, length mismatch, or verification failure surfaces as
//! `SignatureInvalid`.

use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};

use quidnet_core::QuidnetError;

/// Sign `data` (SHA-256 prehash is applied by the ECDSA/P-256 scheme).
/// Returns the 64-byte r ‖ s signature.
pub fn sign(signing_key: &SigningKey, data: &[u8]) -> Vec<u8> {
    let sig: Signature = signing_key.sign(data);
    sig.to_bytes().to_vec()
}

/// Verify a 64-byte signature over `data` against a 65-byte uncompressed
/// public key.
pub fn verify_signature(
    pubkey_bytes: &[u8],
    data: &[u8],
    signature_bytes: &[u8],
) -> Result<(), QuidnetError> {
    if pubkey_bytes.len() != 65 || pubkey_bytes[0] != 0x04 {
        return Err(QuidnetError::SignatureInvalid);
    }
    let key =
        VerifyingKey::from_sec1_bytes(pubkey_bytes).map_err(|_| QuidnetError::SignatureInvalid)?;
    let sig =
        Signature::from_slice(signature_bytes).map_err(|_| QuidnetError::SignatureInvalid)?;
    key.verify(data, &sig)
        .map_err(|_| QuidnetError::SignatureInvalid)
}

/// Verify with hex-encoded key and signature, as they appear on the wire.
pub fn verify_signature_hex(
    pubkey_hex: &str,
    data: &[u8],
    signature_hex: &str,
) -> Result<(), QuidnetError> {
    let pk = hex::decode(pubkey_hex).map_err(|_| QuidnetError::SignatureInvalid)?;
    let sig = hex::decode(signature_hex).map_err(|_| QuidnetError::SignatureInvalid)?;
    verify_signature(&pk, data, &sig)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypair::KeyPair;

    #[test]
    fn sign_verify_round_trip() {
        let kp = KeyPair::generate();
        let message = b"trust is computed, not declared";
        let sig = kp.sign(message);
        assert_eq!(sig.len(), 64);
        assert!(verify_signature(&kp.public_key_bytes(), message, &sig).is_ok());
    }

    #[test]
    fn tampered_message_fails() {
        let kp = KeyPair::generate();
        let sig = kp.sign(b"original");
        assert!(matches!(
            verify_signature(&kp.public_key_bytes(), b"tampered", &sig),
            Err(QuidnetError::SignatureInvalid)
        ));
    }

    #[test]
    fn wrong_key_fails() {
        let kp = KeyPair::generate();
        let other = KeyPair::generate();
        let sig = kp.sign(b"message");
        assert!(verify_signature(&other.public_key_bytes(), b"message", &sig).is_err());
    }

    #[test]
    fn malformed_key_and_signature_are_rejected() {
        let kp = KeyPair::generate();
        let sig = kp.sign(b"m");
        // Truncated key.
        assert!(verify_signature(&kp.public_key_bytes()[..64], b"m", &sig).is_err());
        // Compressed-prefix byte.
        let mut bad = kp.public_key_bytes();
        bad[0] = 0x02;
        assert!(verify_signature(&bad, b"m", &sig).is_err());
        // Truncated signature.
        assert!(verify_signature(&kp.public_key_bytes(), b"m", &sig[..63]).is_err());
        // Hex path.
        assert!(verify_signature_hex("not-hex", b"m", "also-not-hex").is_err());
    }

    #[test]
    fn hex_round_trip_matches_wire_sizes() {
        let kp = KeyPair::generate();
        let sig = hex::encode(kp.sign(b"payload"));
        assert_eq!(kp.public_key_hex().len(), 130);
        assert_eq!(sig.len(), 128);
        assert!(verify_signature_hex(&kp.public_key_hex(), b"payload", &sig).is_ok());
    }
}
