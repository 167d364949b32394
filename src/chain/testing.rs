//! In-process fake node for chain tests.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use super::client::ChainClient;
use crate::config::ChainConfig;

pub const MODULE_ADDRESS: &str = "0x42";

#[derive(Debug, Clone, Default)]
pub struct MockNode {
    /// Answer every view call with 429.
    pub rate_limited: bool,
    /// 404s served for a hash before it shows up as pending.
    pub pending_polls: u32,
}

struct NodeState {
    cfg: MockNode,
    polls: Mutex<HashMap<String, u32>>,
}

pub struct RunningNode {
    pub addr: SocketAddr,
    handle: tokio::task::JoinHandle<()>,
}

impl RunningNode {
    pub fn client(&self) -> ChainClient {
        let config = ChainConfig {
            node_url: format!("http://{}", self.addr),
            module_address: MODULE_ADDRESS.to_string(),
            tx_poll_interval_ms: 5,
            tx_max_polls: 10,
            ..ChainConfig::default()
        };
        ChainClient::new(&config).unwrap()
    }
}

impl Drop for RunningNode {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn mock_node(cfg: MockNode) -> RunningNode {
    let state = Arc::new(NodeState { cfg, polls: Mutex::new(HashMap::new()) });
    let app = Router::new()
        .route("/view", post(view))
        .route("/accounts/:addr/resource/:resource", get(resource))
        .route("/accounts/:addr/module/:name", get(|| async { Json(json!({})) }))
        .route("/transactions/by_hash/:hash", get(transaction))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    RunningNode { addr, handle }
}

async fn view(State(state): State<Arc<NodeState>>, Json(body): Json<Value>) -> Response {
    if state.cfg.rate_limited {
        return (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response();
    }
    let function = body["function"].as_str().unwrap_or_default();
    let name = function.rsplit("::").next().unwrap_or_default();
    let result = match name {
        "get_current_sentiment" => json!([72, 2, "1700000000"]),
        "get_trading_signal" => json!([2, "80", "1700000000"]),
        "get_treasury_balance" => json!(["5000000000"]),
        "interpret_sentiment" => json!(["0x4772656564"]),
        "get_user_position" if body["arguments"][0] == "0xabc" => {
            json!(["100000000", 1, 60, true])
        }
        "get_user_position" => json!([]),
        _ => return (StatusCode::BAD_REQUEST, "unknown function").into_response(),
    };
    Json(result).into_response()
}

async fn resource(Path((addr, _resource)): Path<(String, String)>) -> Response {
    if addr == "0xabc" {
        Json(json!({ "type": "coin_store", "data": { "coin": { "value": "250000000" } } }))
            .into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn transaction(State(state): State<Arc<NodeState>>, Path(hash): Path<String>) -> Response {
    if hash == "0xlost" {
        return StatusCode::NOT_FOUND.into_response();
    }
    let seen = {
        let mut polls = state.polls.lock().unwrap();
        let n = polls.entry(hash.clone()).or_insert(0);
        *n += 1;
        *n
    };
    if seen <= state.cfg.pending_polls {
        return StatusCode::NOT_FOUND.into_response();
    }
    if seen == state.cfg.pending_polls + 1 {
        return Json(json!({ "type": "pending_transaction", "hash": hash })).into_response();
    }
    if hash == "0xfail" {
        Json(json!({
            "type": "user_transaction",
            "success": false,
            "vm_status": "Move abort: E_NO_POSITION",
        }))
        .into_response()
    } else {
        Json(json!({ "type": "user_transaction", "success": true, "hash": hash })).into_response()
    }
}
