//! quidnet-node — the Quidnet full-node binary.
//!
//! Startup sequence:
//!   1. Load (or mint) the node identity from the data directory
//!   2. Build the ledger: genesis block + default trust domain
//!   3. Restore the pending-transaction snapshot
//!   4. Seed the known-node directory from --seed-nodes
//!   5. Start the JSON-RPC 2.0 server
//!   6. Run the periodic block generator until ctrl-c, then persist the
//!      pending pool and exit

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use quidnet_core::{NodeEntry, QuidId};
use quidnet_crypto::{quid_from_pubkey, KeyPair};
use quidnet_rpc::{RpcServer, RpcServerState};
use quidnet_state::{Ledger, LedgerConfig};

#[derive(Parser, Debug)]
#[command(
    name = "quidnet-node",
    version,
    about = "Quidnet full node — a trust-propagation ledger with subjective block acceptance"
)]
struct Args {
    /// JSON-RPC bind address.
    #[arg(long, default_value = "127.0.0.1:9411")]
    port: SocketAddr,

    /// Bootstrap peer addresses (comma-separated host:port).
    #[arg(long, value_delimiter = ',')]
    seed_nodes: Vec<String>,

    /// Log level filter (tracing EnvFilter syntax).
    #[arg(long, default_value = "info,quidnet=debug")]
    log_level: String,

    /// Block generator period, in seconds.
    #[arg(long, default_value_t = 10)]
    block_interval: u64,

    /// Maximum accepted RPC request body, in bytes.
    #[arg(long, default_value_t = 1_048_576)]
    max_body_size_bytes: u32,

    /// Directory for the node key and pending-transaction snapshot.
    #[arg(long, default_value = "~/.quidnet/data")]
    data_dir: PathBuf,

    /// Grace period for the shutdown snapshot, in seconds.
    #[arg(long, default_value_t = 10)]
    shutdown_timeout: u64,

    /// Shared secret for peer-node authentication (enforced by the HTTP
    /// layer).
    #[arg(long)]
    node_auth_secret: Option<String>,

    /// Require peer-node authentication.
    #[arg(long, default_value_t = false)]
    require_node_auth: bool,

    /// Supported-domain patterns (comma-separated; empty = open node).
    #[arg(long, value_delimiter = ',')]
    supported_domains: Vec<String>,

    /// Permit quidnet_registerDomain.
    #[arg(long, default_value_t = true)]
    allow_domain_registration: bool,

    /// Trust cache TTL, in seconds.
    #[arg(long, default_value_t = 60)]
    trust_cache_ttl: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&args.log_level))
                .unwrap_or_else(|_| "info".parse().expect("static filter parses")),
        )
        .init();

    info!("Quidnet node starting");

    // ── Data directory & node identity ───────────────────────────────────────
    let data_dir = expand_tilde(&args.data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let keypair = load_or_generate_key(&data_dir)?;
    info!(node_id = %keypair.quid_id, "node identity");

    // ── Ledger ───────────────────────────────────────────────────────────────
    let config = LedgerConfig {
        supported_domains: args.supported_domains.clone(),
        allow_domain_registration: args.allow_domain_registration,
        trust_cache_ttl: Duration::from_secs(args.trust_cache_ttl),
        node_auth_secret: args.node_auth_secret.clone(),
        require_node_auth: args.require_node_auth,
    };
    let ledger = Arc::new(Ledger::new(keypair, config).context("building ledger")?);

    match ledger.restore_pending(&data_dir) {
        Ok(n) if n > 0 => info!(count = n, "restored pending transactions"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "pending snapshot could not be restored"),
    }

    // ── Known-node directory ─────────────────────────────────────────────────
    // Seeded with placeholder ids derived from the address; the external
    // discovery layer replaces them once peers respond.
    for addr in &args.seed_nodes {
        ledger.record_known_node(NodeEntry {
            node_id: placeholder_node_id(addr),
            address: addr.clone(),
            last_seen: 0,
        });
    }

    // ── RPC server ───────────────────────────────────────────────────────────
    let rpc_state = Arc::new(RpcServerState {
        ledger: Arc::clone(&ledger),
        max_body_size_bytes: args.max_body_size_bytes,
    });
    let _rpc_handle = RpcServer::new(rpc_state)
        .start(args.port)
        .await
        .context("starting RPC server")?;

    // ── Periodic block generator ─────────────────────────────────────────────
    let generator_ledger = Arc::clone(&ledger);
    let generator = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(args.block_interval.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let ledger = Arc::clone(&generator_ledger);
            let result = tokio::task::spawn_blocking(move || {
                let mut produced = 0;
                for domain in ledger.domain_names() {
                    let ours = ledger
                        .get_domain(&domain)
                        .is_some_and(|d| d.is_validator(ledger.node_id()));
                    if !ours {
                        continue;
                    }
                    match ledger.generate_block(&domain) {
                        Ok(Some(block)) => {
                            produced += 1;
                            // Hand-off point for the external broadcaster.
                            info!(index = block.index, domain = %domain, "generated block ready for broadcast");
                        }
                        Ok(None) => {}
                        Err(e) => warn!(domain = %domain, error = %e, "block generation failed"),
                    }
                }
                produced
            })
            .await;
            if let Err(e) = result {
                warn!(error = %e, "generator task panicked");
            }
        }
    });

    info!("node ready");
    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("shutting down");
    generator.abort();

    // ── Shutdown snapshot ────────────────────────────────────────────────────
    let snapshot_ledger = Arc::clone(&ledger);
    let snapshot_dir = data_dir.clone();
    let persist = tokio::task::spawn_blocking(move || snapshot_ledger.persist_pending(&snapshot_dir));
    match tokio::time::timeout(Duration::from_secs(args.shutdown_timeout), persist).await {
        Ok(Ok(Ok(()))) => info!("pending snapshot written"),
        Ok(Ok(Err(e))) => warn!(error = %e, "pending snapshot failed"),
        Ok(Err(e)) => warn!(error = %e, "snapshot task failed"),
        Err(_) => warn!("shutdown timeout elapsed before snapshot completed"),
    }

    Ok(())
}

/// Load the node key from `<data_dir>/node_key`, or mint and persist one.
fn load_or_generate_key(data_dir: &Path) -> anyhow::Result<KeyPair> {
    let path = data_dir.join("node_key");
    if path.exists() {
        let hex_key = std::fs::read_to_string(&path)
            .with_context(|| format!("reading node key from {}", path.display()))?;
        let secret = hex::decode(hex_key.trim()).context("decoding node key hex")?;
        let kp = KeyPair::from_secret_bytes(&secret)
            .map_err(|e| anyhow::anyhow!("restoring node key: {e}"))?;
        return Ok(kp);
    }
    warn!("no node key found — minting a fresh identity");
    let kp = KeyPair::generate();
    std::fs::write(&path, hex::encode(kp.secret_bytes().as_slice()))
        .with_context(|| format!("writing node key to {}", path.display()))?;
    Ok(kp)
}

/// Placeholder directory id for a seed address, until discovery learns
/// the peer's real quid.
fn placeholder_node_id(address: &str) -> QuidId {
    quid_from_pubkey(address.as_bytes())
}

/// Expand a leading `~` to the user's home directory (`HOME` or `USERPROFILE`).
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
