use std::net::SocketAddr;
use std::sync::Arc;

use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObject;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use quidnet_core::constants::PROTOCOL_VERSION;
use quidnet_core::{
    Block, IdentityTransaction, QuidId, QuidnetError, TitleTransaction, Transaction, TrustDomain,
};
use quidnet_crypto::KeyPair;
use quidnet_state::Ledger;

use crate::api::QuidnetApiServer;
use crate::types::{RpcCreatedQuid, RpcNodeInfo, RpcTrustEdge, RpcTrustQuery, RpcTrustResult};

fn rpc_err(code: i32, msg: impl Into<String>) -> ErrorObject<'static> {
    ErrorObject::owned(code, msg.into(), None::<()>)
}

fn map_err(e: QuidnetError) -> ErrorObject<'static> {
    let code = match e {
        QuidnetError::ResourceMissing(_) => -32001,
        QuidnetError::Duplicate(_) => -32002,
        _ => -32602,
    };
    rpc_err(code, e.to_string())
}

/// Shared state passed to the RPC server.
pub struct RpcServerState {
    pub ledger: Arc<Ledger>,
    /// Maximum accepted request body, from the node configuration.
    pub max_body_size_bytes: u32,
}

/// The RPC server implementation.
pub struct RpcServer {
    state: Arc<RpcServerState>,
}

impl RpcServer {
    pub fn new(state: Arc<RpcServerState>) -> Self {
        Self { state }
    }

    /// Start the JSON-RPC server on `addr` with permissive CORS headers.
    /// Returns a handle to stop it.
    pub async fn start(self, addr: SocketAddr) -> anyhow::Result<ServerHandle> {
        let cors = CorsLayer::new()
            .allow_methods(Any)
            .allow_origin(Any)
            .allow_headers(Any);

        let server = Server::builder()
            .max_request_body_size(self.state.max_body_size_bytes)
            .set_http_middleware(tower::ServiceBuilder::new().layer(cors))
            .build(addr)
            .await?;

        let module = self.into_rpc();
        let handle = server.start(module);
        info!(%addr, "RPC server started");
        Ok(handle)
    }
}

#[async_trait]
impl QuidnetApiServer for RpcServer {
    async fn create_quid(&self) -> RpcResult<RpcCreatedQuid> {
        let kp = KeyPair::generate();
        Ok(RpcCreatedQuid {
            quid_id: kp.quid_id.to_string(),
            public_key_hex: kp.public_key_hex(),
            private_key_hex: hex::encode(kp.secret_bytes().as_slice()),
            created_at: chrono::Utc::now().timestamp(),
        })
    }

    async fn get_trust(&self, query: RpcTrustQuery) -> RpcResult<RpcTrustResult> {
        if let Some(domain) = &query.domain {
            if self.state.ledger.get_domain(domain).is_none() {
                return Err(map_err(QuidnetError::DomainUnknown(domain.clone())));
            }
        }
        let observer = QuidId::new(query.observer);
        let target = QuidId::new(query.target);
        if query.include_unverified.unwrap_or(false) {
            let r = self
                .state
                .ledger
                .compute_trust_enhanced(&observer, &target, query.max_depth, true)
                .map_err(map_err)?;
            Ok(RpcTrustResult::enhanced(&observer, &target, r))
        } else {
            let r = self
                .state
                .ledger
                .compute_trust(&observer, &target, query.max_depth)
                .map_err(map_err)?;
            Ok(RpcTrustResult::plain(&observer, &target, r))
        }
    }

    async fn get_trust_edges(&self, quid: String) -> RpcResult<Vec<RpcTrustEdge>> {
        let quid = QuidId::new(quid);
        let edges = self.state.ledger.trust_edges_for(&quid);
        Ok(edges.iter().map(RpcTrustEdge::from).collect())
    }

    async fn get_tentative_blocks(&self, domain: String) -> RpcResult<Vec<Block>> {
        Ok(self.state.ledger.tentative_blocks(&domain))
    }

    async fn get_identity(&self, quid: String) -> RpcResult<Option<IdentityTransaction>> {
        match self.state.ledger.get_identity(&QuidId::new(quid)) {
            Ok(rec) => Ok(Some(rec)),
            Err(QuidnetError::ResourceMissing(_)) => Ok(None),
            Err(e) => Err(map_err(e)),
        }
    }

    async fn get_title(&self, asset: String) -> RpcResult<Option<TitleTransaction>> {
        match self.state.ledger.get_title(&QuidId::new(asset)) {
            Ok(rec) => Ok(Some(rec)),
            Err(QuidnetError::ResourceMissing(_)) => Ok(None),
            Err(e) => Err(map_err(e)),
        }
    }

    async fn get_node_info(&self) -> RpcResult<RpcNodeInfo> {
        let ledger = &self.state.ledger;
        Ok(RpcNodeInfo {
            node_id: ledger.node_id().to_string(),
            domains: ledger.domain_names(),
            block_height: ledger.block_height(),
            version: PROTOCOL_VERSION.to_string(),
        })
    }

    async fn submit_transaction(&self, tx: Transaction) -> RpcResult<String> {
        self.state.ledger.add_transaction(tx).map_err(map_err)
    }

    async fn register_domain(&self, domain: TrustDomain) -> RpcResult<()> {
        self.state.ledger.register_trust_domain(domain).map_err(map_err)
    }
}
