//! End-to-end smoke test for quidnet-node.
//!
//! Starts a real node process with a fresh data directory, exercises the
//! JSON-RPC surface, and asserts the core invariants are visible from
//! outside.
//!
//! Run with:
//!   cargo test -p quidnet-node --test smoke

use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

// ── Node lifecycle ────────────────────────────────────────────────────────────

struct NodeGuard {
    child: Child,
    data_dir: PathBuf,
}

impl Drop for NodeGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.data_dir);
    }
}

/// Find a free TCP port on loopback.
fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn spawn_node(port: u16, data_dir: &PathBuf) -> NodeGuard {
    let child = Command::new(env!("CARGO_BIN_EXE_quidnet-node"))
        .arg("--port")
        .arg(format!("127.0.0.1:{port}"))
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--block-interval")
        .arg("1")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn quidnet-node");
    NodeGuard {
        child,
        data_dir: data_dir.clone(),
    }
}

// ── RPC helpers ───────────────────────────────────────────────────────────────

async fn rpc_call(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1
    });
    let resp = client
        .post(url)
        .json(&body)
        .send()
        .await
        .unwrap_or_else(|e| panic!("RPC call {method} failed: {e}"));
    let json: serde_json::Value = resp.json().await.expect("parse RPC JSON");
    if let Some(err) = json.get("error") {
        panic!("RPC error from {method}: {err}");
    }
    json["result"].clone()
}

/// Poll until the RPC server responds or the timeout elapses.
async fn wait_for_rpc(client: &reqwest::Client, url: &str, timeout: Duration) -> bool {
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "quidnet_getNodeInfo",
        "params": [],
        "id": 1
    });
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Ok(resp) = client.post(url).json(&body).send().await {
            if resp.status().is_success() {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    false
}

// ── The test ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn node_exposes_the_core_surface() {
    let port = free_port();
    let data_dir =
        std::env::temp_dir().join(format!("quidnet-smoke-{}-{port}", std::process::id()));
    std::fs::create_dir_all(&data_dir).unwrap();
    let _node = spawn_node(port, &data_dir);

    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{port}");
    assert!(
        wait_for_rpc(&client, &url, Duration::from_secs(20)).await,
        "node did not come up"
    );

    // Node info: identity, default domain, genesis height, version.
    let info = rpc_call(&client, &url, "quidnet_getNodeInfo", serde_json::json!([])).await;
    let node_id = info["node_id"].as_str().unwrap().to_string();
    assert_eq!(node_id.len(), 16);
    assert!(info["domains"]
        .as_array()
        .unwrap()
        .iter()
        .any(|d| d == "default"));
    assert_eq!(info["block_height"].as_u64().unwrap(), 0);
    assert_eq!(info["version"], "1.0.0");

    // Create-quid returns a well-formed identity.
    let created = rpc_call(&client, &url, "quidnet_createQuid", serde_json::json!([])).await;
    let quid = created["quid_id"].as_str().unwrap();
    assert_eq!(quid.len(), 16);
    assert_eq!(created["public_key_hex"].as_str().unwrap().len(), 130);
    assert!(created["created_at"].as_i64().unwrap() > 0);

    // Self-trust is the constant 1.0; trust toward a stranger is 0.
    let self_trust = rpc_call(
        &client,
        &url,
        "quidnet_getTrust",
        serde_json::json!([{ "observer": node_id, "target": node_id }]),
    )
    .await;
    assert_eq!(self_trust["level"].as_f64().unwrap(), 1.0);

    let stranger_trust = rpc_call(
        &client,
        &url,
        "quidnet_getTrust",
        serde_json::json!([{ "observer": node_id, "target": quid, "max_depth": 5 }]),
    )
    .await;
    assert_eq!(stranger_trust["level"].as_f64().unwrap(), 0.0);

    // No tentative blocks on a fresh node.
    let tentative = rpc_call(
        &client,
        &url,
        "quidnet_getTentativeBlocks",
        serde_json::json!(["default"]),
    )
    .await;
    assert!(tentative.as_array().unwrap().is_empty());

    // Unknown identity lookups are null, not errors.
    let missing = rpc_call(
        &client,
        &url,
        "quidnet_getIdentity",
        serde_json::json!([quid]),
    )
    .await;
    assert!(missing.is_null());
}
