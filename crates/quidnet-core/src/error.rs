use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuidnetError {
    // ── Crypto ───────────────────────────────────────────────────────────────
    #[error("invalid signature")]
    SignatureInvalid,

    // ── Transaction validation ───────────────────────────────────────────────
    #[error("invalid field: {0}")]
    FieldInvalid(String),

    #[error("nonce replay on {scope}: got {got}, last accepted {last}")]
    NonceReplay { scope: String, got: u64, last: u64 },

    #[error("unknown trust domain: {0}")]
    DomainUnknown(String),

    #[error("trust domain not supported by this node: {0}")]
    DomainUnsupported(String),

    #[error("ownership violation: {0}")]
    OwnershipViolation(String),

    // ── Block validation ─────────────────────────────────────────────────────
    #[error("invalid block: {0}")]
    BlockInvalid(String),

    #[error("chain mismatch: expected index {expected_index} on prev hash {expected_prev}, got index {got_index}")]
    ChainMismatch {
        expected_index: u64,
        expected_prev: String,
        got_index: u64,
    },

    // ── Trust graph ──────────────────────────────────────────────────────────
    #[error("observer or target is empty")]
    ObserverOrTargetEmpty,

    /// Non-fatal: the traversal hit its resource caps and the accompanying
    /// level/path are a partial result. Callers use the partial, not zero.
    #[error("trust graph too large; partial result returned")]
    TrustGraphTooLarge,

    // ── Stores ───────────────────────────────────────────────────────────────
    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("not found: {0}")]
    ResourceMissing(String),

    // ── Ambient ──────────────────────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(String),
}
