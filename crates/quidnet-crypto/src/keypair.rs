use p256::ecdsa::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use quidnet_core::{QuidId, QuidnetError};

use crate::hash::quid_from_pubkey;
use crate::sign::sign;

/// A Quidnet keypair: a P-256 signing key with its derived quid ID.
///
/// The raw secret scalar is kept inside `SigningKey`, which zeroizes on
/// drop; exports go through `Zeroizing` buffers.
pub struct KeyPair {
    pub quid_id: QuidId,
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a fresh P-256 keypair from the OS RNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let quid_id = quid_from_pubkey(&encoded_point(&signing_key));
        Self {
            quid_id,
            signing_key,
        }
    }

    /// Restore a keypair from a 32-byte secret scalar.
    pub fn from_secret_bytes(secret: &[u8]) -> Result<Self, QuidnetError> {
        let signing_key =
            SigningKey::from_slice(secret).map_err(|_| QuidnetError::SignatureInvalid)?;
        let quid_id = quid_from_pubkey(&encoded_point(&signing_key));
        Ok(Self {
            quid_id,
            signing_key,
        })
    }

    /// Sign `data`; returns the 64-byte r ‖ s signature.
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        sign(&self.signing_key, data)
    }

    /// Sign `data` and hex-encode the signature for the wire.
    pub fn sign_hex(&self, data: &[u8]) -> String {
        hex::encode(self.sign(data))
    }

    /// The 65-byte uncompressed SEC1 public key.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        encoded_point(&self.signing_key)
    }

    /// Hex-encoded public key as it appears on the wire (130 chars).
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }

    /// Export the secret scalar (for the node key file). Wiped on drop.
    pub fn secret_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.signing_key.to_bytes().to_vec())
    }
}

fn encoded_point(key: &SigningKey) -> Vec<u8> {
    VerifyingKey::from(key)
        .to_encoded_point(false)
        .as_bytes()
        .to_vec()
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair {{ quid_id: {} }}", self.quid_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_have_wire_shapes() {
        let kp = KeyPair::generate();
        let pk = kp.public_key_bytes();
        assert_eq!(pk.len(), 65);
        assert_eq!(pk[0], 0x04);
        assert!(kp.quid_id.is_well_formed());
    }

    #[test]
    fn restore_from_secret_preserves_identity() {
        let kp = KeyPair::generate();
        let restored = KeyPair::from_secret_bytes(&kp.secret_bytes()).unwrap();
        assert_eq!(restored.quid_id, kp.quid_id);
        assert_eq!(restored.public_key_hex(), kp.public_key_hex());
    }

    #[test]
    fn quid_binds_to_public_key() {
        let kp = KeyPair::generate();
        assert_eq!(kp.quid_id, quid_from_pubkey(&kp.public_key_bytes()));
    }
}
