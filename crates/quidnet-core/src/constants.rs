//! ─── Quidnet protocol constants ─────────────────────────────────────────────
//!
//! Thresholds, traversal caps, and field maxima shared across the workspace.

// ── Identity & wire sizes ─────────────────────────────────────────────────────

/// Quid IDs are the first 16 hex chars of SHA-256(public-key-bytes).
pub const QUID_ID_LEN: usize = 16;

/// Uncompressed P-256 public key: 65 bytes (0x04 ‖ X ‖ Y), hex-encoded.
pub const PUBLIC_KEY_HEX_LEN: usize = 130;

/// ECDSA signature: 64 bytes (r ‖ s, each zero-padded to 32), hex-encoded.
pub const SIGNATURE_HEX_LEN: usize = 128;

// ── Trust graph traversal ─────────────────────────────────────────────────────

/// Default BFS hop limit when the caller passes a non-positive depth.
pub const DEFAULT_TRUST_MAX_DEPTH: usize = 5;

/// Traversal halts with a partial result once the work queue grows past this.
pub const MAX_TRUST_QUEUE_SIZE: usize = 10_000;

/// Traversal halts with a partial result once this many enqueues have happened.
pub const MAX_TRUST_VISITED_SIZE: usize = 10_000;

/// Trust cache entries expire after this many seconds.
pub const TRUST_CACHE_TTL_SECS: u64 = 60;

// ── Block acceptance ──────────────────────────────────────────────────────────

/// Observer trust at or below this level makes a block Untrusted; strictly
/// between this and the domain's trust_threshold makes it Tentative.
pub const DISTRUST_THRESHOLD: f64 = 0.1;

/// Trust threshold installed on the default domain at genesis.
pub const DEFAULT_TRUST_THRESHOLD: f64 = 0.5;

/// Minimum observer trust in a transaction's creator for the transaction to
/// be picked up by block generation.
pub const TRANSACTION_TRUST_THRESHOLD: f64 = 0.1;

/// Validator trust at or above this level keeps a single-gap enhanced result
/// at Medium confidence rather than Low.
pub const MEDIUM_CONFIDENCE_VALIDATOR_TRUST: f64 = 0.5;

// ── Field maxima (transaction validation) ─────────────────────────────────────

pub const MAX_DOMAIN_LEN: usize = 255;
pub const MAX_NAME_LEN: usize = 256;
pub const MAX_DESCRIPTION_LEN: usize = 1024;
pub const MAX_EVENT_TYPE_LEN: usize = 64;

/// Maximum serialized size of an event payload, in bytes.
pub const MAX_EVENT_PAYLOAD_BYTES: usize = 65_536;

// ── Chain ─────────────────────────────────────────────────────────────────────

/// The reserved domain used when a transaction carries an empty trust_domain.
pub const DEFAULT_DOMAIN: &str = "default";

/// prev_hash of the genesis block.
pub const GENESIS_PREV_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Protocol version reported by node info.
pub const PROTOCOL_VERSION: &str = "1.0.0";
