use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;

use quidnet_core::{Block, IdentityTransaction, TitleTransaction, Transaction, TrustDomain};

use crate::types::{RpcCreatedQuid, RpcNodeInfo, RpcTrustEdge, RpcTrustQuery, RpcTrustResult};

/// Quidnet JSON-RPC 2.0 API definition.
///
/// All method names are prefixed with "quidnet_" via `namespace = "quidnet"`.
#[rpc(server, namespace = "quidnet")]
pub trait QuidnetApi {
    /// Mint a fresh P-256 identity. The private key is returned exactly
    /// once and never stored on the node.
    #[method(name = "createQuid")]
    async fn create_quid(&self) -> RpcResult<RpcCreatedQuid>;

    /// Relational trust from observer to target. With
    /// `include_unverified` set, the enhanced computation over the edge
    /// stores runs instead and the result carries gap and confidence
    /// fields.
    #[method(name = "getTrust")]
    async fn get_trust(&self, query: RpcTrustQuery) -> RpcResult<RpcTrustResult>;

    /// Every provenance-tracked trust edge touching `quid`.
    #[method(name = "getTrustEdges")]
    async fn get_trust_edges(&self, quid: String) -> RpcResult<Vec<RpcTrustEdge>>;

    /// Blocks deferred for `domain`, pending trust changes.
    #[method(name = "getTentativeBlocks")]
    async fn get_tentative_blocks(&self, domain: String) -> RpcResult<Vec<Block>>;

    /// Latest committed identity record for a quid, or null.
    #[method(name = "getIdentity")]
    async fn get_identity(&self, quid: String) -> RpcResult<Option<IdentityTransaction>>;

    /// Latest committed title record for an asset, or null.
    #[method(name = "getTitle")]
    async fn get_title(&self, asset: String) -> RpcResult<Option<TitleTransaction>>;

    /// Node id, managed domains, block height, and protocol version.
    #[method(name = "getNodeInfo")]
    async fn get_node_info(&self) -> RpcResult<RpcNodeInfo>;

    /// Submit a signed transaction into the pending pool. Returns the
    /// transaction id on acceptance.
    #[method(name = "submitTransaction")]
    async fn submit_transaction(&self, tx: Transaction) -> RpcResult<String>;

    /// Register a trust domain (subject to the node's registration
    /// policy and supported-domain patterns).
    #[method(name = "registerDomain")]
    async fn register_domain(&self, domain: TrustDomain) -> RpcResult<()>;
}
