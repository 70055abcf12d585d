//! quidnet-state
//!
//! The ledger core: registries as materialized views of the block log,
//! the transaction validator, and the subjective block-acceptance
//! pipeline. Everything here is synchronous and thread-blocking; the
//! async surface lives in quidnet-rpc and quidnet-node.

pub mod generate;
pub mod genesis;
pub mod ledger;
pub mod pending;
pub mod pipeline;
pub mod project;
pub mod validate;

pub use ledger::{EventStream, Ledger, LedgerConfig, TrustTables};
pub use pending::PENDING_SNAPSHOT_FILE;
