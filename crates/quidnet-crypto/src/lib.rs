pub mod hash;
pub mod keypair;
pub mod sign;

pub use hash::{block_hash, quid_from_pubkey, quid_from_pubkey_hex, sha256_hex};
pub use keypair::KeyPair;
pub use sign::{sign, verify_signature, verify_signature_hex};
