//! quidnet-rpc
//!
//! JSON-RPC 2.0 shim over the ledger core.
//!
//! Namespace: "quidnet"
//! Methods:
//!   quidnet_createQuid          — mint a fresh P-256 identity
//!   quidnet_getTrust            — relational / enhanced trust query
//!   quidnet_getTrustEdges       — provenance-tracked edges for a quid
//!   quidnet_getTentativeBlocks  — deferred blocks for a domain
//!   quidnet_getIdentity         — identity record by quid
//!   quidnet_getTitle            — title record by asset
//!   quidnet_getNodeInfo         — node id, domains, height, version
//!   quidnet_submitTransaction   — transaction ingress
//!   quidnet_registerDomain      — register a trust domain

pub mod api;
pub mod server;
pub mod types;

pub use server::{RpcServer, RpcServerState};
pub use types::{
    RpcCreatedQuid, RpcNodeInfo, RpcTrustEdge, RpcTrustQuery, RpcTrustResult,
};
