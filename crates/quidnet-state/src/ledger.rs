//! The ledger root: every registry behind its own readers-writer lock.
//!
//! Lock acquisition order is a public contract. Any method that needs more
//! than one lock acquires them in this order and releases each before
//! calling another method that may re-acquire:
//!
//!   Blockchain → TrustDomains → TrustRegistry (levels + nonces) →
//!   IdentityRegistry → TitleRegistry → TentativeBlocks →
//!   VerifiedTrustEdges → UnverifiedTrustEdges → EventStreams →
//!   KnownNodes → PendingTxs → TrustCache
//!
//! Trust computations never hold a registry lock while calling back into
//! validation: the plain BFS runs under a single TrustRegistry read guard
//! and touches nothing else, and the enhanced BFS runs over cloned
//! snapshots of the edge stores.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use tracing::info;

use quidnet_core::constants::{DEFAULT_DOMAIN, TRUST_CACHE_TTL_SECS};
use quidnet_core::domain::domain_supported;
use quidnet_core::{
    Block, EventTransaction, IdentityTransaction, NodeEntry, QuidId, QuidnetError,
    TitleTransaction, Transaction, TrustDomain, TrustEdge,
};
use quidnet_crypto::KeyPair;
use quidnet_trust::enhanced::EdgeStoreView;
use quidnet_trust::graph::TrustGraphView;
use quidnet_trust::{
    compute_trust, compute_trust_enhanced, EnhancedTrustResult, TrustCache, TrustResult,
};

use crate::genesis;

/// The configuration options observable inside the core.
#[derive(Clone, Debug)]
pub struct LedgerConfig {
    /// Supported-domain patterns; empty means the node is open.
    pub supported_domains: Vec<String>,
    pub allow_domain_registration: bool,
    pub trust_cache_ttl: Duration,
    /// Shared secret for peer-node authentication; enforced by the HTTP
    /// layer, carried here so the core can expose it to that layer.
    pub node_auth_secret: Option<String>,
    pub require_node_auth: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            supported_domains: Vec::new(),
            allow_domain_registration: true,
            trust_cache_ttl: Duration::from_secs(TRUST_CACHE_TTL_SECS),
            node_auth_secret: None,
            require_node_auth: false,
        }
    }
}

/// Committed trust relations and their replay nonces. The two tables share
/// one lock: every nonce write accompanies a level write.
#[derive(Default)]
pub struct TrustTables {
    pub levels: TrustGraphView,
    pub nonces: HashMap<QuidId, HashMap<QuidId, u64>>,
}

/// Committed events for one subject.
#[derive(Clone, Debug, Default)]
pub struct EventStream {
    pub events: Vec<EventTransaction>,
    pub latest_sequence: u64,
}

/// Process-wide ledger state for one node.
pub struct Ledger {
    keypair: KeyPair,
    node_id: QuidId,
    config: LedgerConfig,

    pub(crate) chain: RwLock<Vec<Block>>,
    pub(crate) domains: RwLock<HashMap<String, TrustDomain>>,
    pub(crate) trust: RwLock<TrustTables>,
    pub(crate) identities: RwLock<HashMap<QuidId, IdentityTransaction>>,
    pub(crate) titles: RwLock<HashMap<QuidId, TitleTransaction>>,
    pub(crate) tentative: RwLock<HashMap<String, Vec<Block>>>,
    pub(crate) verified_edges: RwLock<EdgeStoreView>,
    pub(crate) unverified_edges: RwLock<EdgeStoreView>,
    pub(crate) events: RwLock<HashMap<QuidId, EventStream>>,
    pub(crate) known_nodes: RwLock<HashMap<QuidId, NodeEntry>>,
    pub(crate) pending: RwLock<Vec<Transaction>>,
    pub(crate) cache: TrustCache,
}

impl Ledger {
    /// Build a fresh ledger: genesis block at index 0 and the default
    /// domain with this node as its validator.
    pub fn new(keypair: KeyPair, config: LedgerConfig) -> Result<Self, QuidnetError> {
        let node_id = keypair.quid_id.clone();
        let genesis = genesis::genesis_block(&keypair, DEFAULT_DOMAIN)?;
        let default_domain = genesis::bootstrap_domain(&keypair, DEFAULT_DOMAIN);

        let mut domains = HashMap::new();
        domains.insert(DEFAULT_DOMAIN.to_string(), default_domain);

        let cache = TrustCache::new(config.trust_cache_ttl);
        info!(node_id = %node_id, genesis = %genesis.hash, "ledger initialised");

        Ok(Self {
            keypair,
            node_id,
            config,
            chain: RwLock::new(vec![genesis]),
            domains: RwLock::new(domains),
            trust: RwLock::new(TrustTables::default()),
            identities: RwLock::new(HashMap::new()),
            titles: RwLock::new(HashMap::new()),
            tentative: RwLock::new(HashMap::new()),
            verified_edges: RwLock::new(HashMap::new()),
            unverified_edges: RwLock::new(HashMap::new()),
            events: RwLock::new(HashMap::new()),
            known_nodes: RwLock::new(HashMap::new()),
            pending: RwLock::new(Vec::new()),
            cache,
        })
    }

    pub fn node_id(&self) -> &QuidId {
        &self.node_id
    }

    pub fn public_key_hex(&self) -> String {
        self.keypair.public_key_hex()
    }

    pub(crate) fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ── Chain accessors ──────────────────────────────────────────────────────

    pub fn block_height(&self) -> u64 {
        let chain = self.chain.read().expect("blockchain lock poisoned");
        chain.last().map(|b| b.index).unwrap_or(0)
    }

    pub fn chain_len(&self) -> usize {
        self.chain.read().expect("blockchain lock poisoned").len()
    }

    pub fn head(&self) -> Block {
        let chain = self.chain.read().expect("blockchain lock poisoned");
        chain
            .last()
            .cloned()
            .expect("chain always holds at least genesis")
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.chain.read().expect("blockchain lock poisoned").clone()
    }

    // ── Domain gate ──────────────────────────────────────────────────────────

    /// Resolve the reserved empty name to the default domain.
    pub fn resolve_domain_name(name: &str) -> &str {
        if name.is_empty() {
            DEFAULT_DOMAIN
        } else {
            name
        }
    }

    /// Whether this node accepts work for `name` (§ supported-domain
    /// matching: empty pattern list = open node, `*.` = strict
    /// subdomains, otherwise exact).
    pub fn is_domain_supported(&self, name: &str) -> bool {
        domain_supported(&self.config.supported_domains, Self::resolve_domain_name(name))
    }

    pub fn get_domain(&self, name: &str) -> Option<TrustDomain> {
        let domains = self.domains.read().expect("trust domains lock poisoned");
        domains.get(Self::resolve_domain_name(name)).cloned()
    }

    pub fn domain_names(&self) -> Vec<String> {
        let domains = self.domains.read().expect("trust domains lock poisoned");
        let mut names: Vec<String> = domains.keys().cloned().collect();
        names.sort();
        names
    }

    /// Register a new trust domain. Permitted only when registration is
    /// enabled and the name passes the supported-domain match rule.
    pub fn register_trust_domain(&self, domain: TrustDomain) -> Result<(), QuidnetError> {
        if !self.config.allow_domain_registration {
            return Err(QuidnetError::DomainUnsupported(
                "domain registration disabled".into(),
            ));
        }
        if !self.is_domain_supported(&domain.name) {
            return Err(QuidnetError::DomainUnsupported(domain.name));
        }
        let mut domains = self.domains.write().expect("trust domains lock poisoned");
        if domains.contains_key(&domain.name) {
            return Err(QuidnetError::Duplicate(domain.name));
        }
        info!(domain = %domain.name, validators = domain.validator_nodes.len(), "trust domain registered");
        domains.insert(domain.name.clone(), domain);
        Ok(())
    }

    // ── Trust computations ───────────────────────────────────────────────────

    /// Relational trust from `observer` to `target` over the committed
    /// trust registry, served from the cache when fresh. Self-trust is
    /// the constant 1.0 and is never cached.
    pub fn compute_trust(
        &self,
        observer: &QuidId,
        target: &QuidId,
        max_depth: Option<usize>,
    ) -> Result<TrustResult, QuidnetError> {
        if observer.is_empty() || target.is_empty() {
            return Err(QuidnetError::ObserverOrTargetEmpty);
        }
        let depth = quidnet_trust::graph::effective_depth(max_depth);
        if observer == target {
            let tables = self.trust.read().expect("trust registry lock poisoned");
            return compute_trust(&tables.levels, observer, target, Some(depth));
        }

        let key = TrustCache::plain_key(observer, target, depth);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let result = {
            let tables = self.trust.read().expect("trust registry lock poisoned");
            compute_trust(&tables.levels, observer, target, Some(depth))?
        };
        self.cache.put(key, result.clone());
        Ok(result)
    }

    /// Enhanced trust over the verified edge store, plus the unverified
    /// store (discounted per recording validator) when requested.
    pub fn compute_trust_enhanced(
        &self,
        observer: &QuidId,
        target: &QuidId,
        max_depth: Option<usize>,
        include_unverified: bool,
    ) -> Result<EnhancedTrustResult, QuidnetError> {
        if observer.is_empty() || target.is_empty() {
            return Err(QuidnetError::ObserverOrTargetEmpty);
        }
        let depth = quidnet_trust::graph::effective_depth(max_depth);
        if observer == target {
            return compute_trust_enhanced(
                &HashMap::new(),
                None,
                &HashMap::new(),
                observer,
                target,
                Some(depth),
            );
        }

        let key = TrustCache::enhanced_key(observer, target, depth, include_unverified);
        if let Some(hit) = self.cache.get_enhanced(&key) {
            return Ok(hit);
        }

        // Snapshot both layers, then release the locks before any trust
        // callbacks: the recorder discounts below re-enter compute_trust.
        let verified: EdgeStoreView = self
            .verified_edges
            .read()
            .expect("verified edges lock poisoned")
            .clone();
        let unverified: Option<EdgeStoreView> = if include_unverified {
            Some(
                self.unverified_edges
                    .read()
                    .expect("unverified edges lock poisoned")
                    .clone(),
            )
        } else {
            None
        };

        let mut validator_trust: HashMap<QuidId, f64> = HashMap::new();
        if let Some(store) = &unverified {
            for edges in store.values() {
                for edge in edges.values() {
                    if !validator_trust.contains_key(&edge.validator_quid) {
                        let t = self
                            .compute_trust(observer, &edge.validator_quid, Some(depth))?
                            .level;
                        validator_trust.insert(edge.validator_quid.clone(), t);
                    }
                }
            }
        }

        let result = compute_trust_enhanced(
            &verified,
            unverified.as_ref(),
            &validator_trust,
            observer,
            target,
            Some(depth),
        )?;
        self.cache.put_enhanced(key, result.clone());
        Ok(result)
    }

    // ── Edge / registry lookups (RPC surface) ────────────────────────────────

    /// Every provenance-tracked edge touching `quid`, verified first.
    pub fn trust_edges_for(&self, quid: &QuidId) -> Vec<TrustEdge> {
        let mut out = Vec::new();
        {
            let verified = self
                .verified_edges
                .read()
                .expect("verified edges lock poisoned");
            collect_edges(&verified, quid, &mut out);
        }
        {
            let unverified = self
                .unverified_edges
                .read()
                .expect("unverified edges lock poisoned");
            collect_edges(&unverified, quid, &mut out);
        }
        out
    }

    pub fn get_identity(&self, quid: &QuidId) -> Result<IdentityTransaction, QuidnetError> {
        let identities = self.identities.read().expect("identity registry lock poisoned");
        identities
            .get(quid)
            .cloned()
            .ok_or_else(|| QuidnetError::ResourceMissing(format!("identity {quid}")))
    }

    pub fn get_title(&self, asset: &QuidId) -> Result<TitleTransaction, QuidnetError> {
        let titles = self.titles.read().expect("title registry lock poisoned");
        titles
            .get(asset)
            .cloned()
            .ok_or_else(|| QuidnetError::ResourceMissing(format!("title {asset}")))
    }

    pub fn event_stream(&self, subject: &QuidId) -> Option<EventStream> {
        let streams = self.events.read().expect("event streams lock poisoned");
        streams.get(subject).cloned()
    }

    pub fn tentative_blocks(&self, domain: &str) -> Vec<Block> {
        let tentative = self.tentative.read().expect("tentative blocks lock poisoned");
        tentative
            .get(Self::resolve_domain_name(domain))
            .cloned()
            .unwrap_or_default()
    }

    // ── Known nodes ──────────────────────────────────────────────────────────

    pub fn record_known_node(&self, entry: NodeEntry) {
        let mut nodes = self.known_nodes.write().expect("known nodes lock poisoned");
        nodes.insert(entry.node_id.clone(), entry);
    }

    pub fn known_nodes(&self) -> Vec<NodeEntry> {
        let nodes = self.known_nodes.read().expect("known nodes lock poisoned");
        nodes.values().cloned().collect()
    }

    // ── Cache coherence ──────────────────────────────────────────────────────

    /// Coarse policy: any trust registry mutation drops every cache entry.
    pub(crate) fn invalidate_trust_cache(&self) {
        self.cache.purge();
    }
}

fn collect_edges(store: &EdgeStoreView, quid: &QuidId, out: &mut Vec<TrustEdge>) {
    for edges in store.values() {
        for edge in edges.values() {
            if &edge.truster == quid || &edge.trustee == quid {
                out.push(edge.clone());
            }
        }
    }
}
