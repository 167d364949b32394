//! HTTP API over a real on-disk store.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

use xenith::engine::{Session, SessionController};
use xenith::feeds::price::PriceSeries;
use xenith::feeds::ScriptedScores;
use xenith::server::{build_router, AppState, ServerState};
use xenith::storage::{JsonStore, SharedStore, SENTIMENT_READ_CAP, SENTIMENT_WRITE_CAP};
use xenith::types::{SentimentSample, StrategyConfig, Trend};

struct TempDir(PathBuf);

impl TempDir {
    fn new() -> Self {
        let mut dir = std::env::temp_dir();
        dir.push(format!("xenith_it_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn state_in(dir: &TempDir) -> AppState {
    let session = Session::new(
        StrategyConfig::default(),
        1000.0,
        PriceSeries::new(vec![100.0]).unwrap(),
        Box::new(ScriptedScores::new(vec![])),
    );
    Arc::new(ServerState::new(
        JsonStore::new(&dir.0),
        Arc::new(SessionController::new(session)),
    ))
}

async fn call(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let req = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => req
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let resp = build_router(state.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}

#[tokio::test]
async fn bet_upsert_merges_and_persists_across_restarts() {
    let dir = TempDir::new();
    let state = state_in(&dir);

    let (status, _) = call(
        &state,
        "POST",
        "/api/bets",
        Some(json!({
            "id": "0xabc-1", "address": "0xabc", "direction": 1, "amountOctas": "100000000",
            "entrySentiment": 61, "createdAt": 1, "txHash": "0x1", "status": "active",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    call(
        &state,
        "POST",
        "/api/bets",
        Some(json!({ "id": "0xabc-1", "status": "resolved", "resolvedAt": 2, "won": true })),
    )
    .await;

    // A fresh server over the same directory sees the merged record.
    let restarted = state_in(&dir);
    let (_, body) = call(&restarted, "GET", "/api/bets", None).await;
    let bets = body["bets"].as_array().unwrap();
    assert_eq!(bets.len(), 1);
    assert_eq!(bets[0]["status"], "resolved");
    assert_eq!(bets[0]["won"], true);
    assert_eq!(bets[0]["amountOctas"], "100000000");

    let records = JsonStore::new(&dir.0).read_bets().unwrap().records();
    assert_eq!(records[0].won, Some(true));
}

#[tokio::test]
async fn rejected_writes_leave_state_unchanged() {
    let dir = TempDir::new();
    let state = state_in(&dir);
    call(&state, "POST", "/api/bets", Some(json!({ "id": "keep" }))).await;

    let (status, body) = call(&state, "POST", "/api/bets", Some(json!({ "id": 7 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "missing id" }));

    let (status, _) = call(&state, "POST", "/api/sentiment", Some(json!({ "t": null }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, bets) = call(&state, "GET", "/api/bets", None).await;
    assert_eq!(bets, json!({ "bets": [{ "id": "keep" }] }));
    let (_, history) = call(&state, "GET", "/api/sentiment", None).await;
    assert_eq!(history, json!({ "history": [] }));
}

#[tokio::test]
async fn sentiment_history_caps_on_write_and_read() {
    let dir = TempDir::new();
    let state = state_in(&dir);

    for t in 0..(SENTIMENT_WRITE_CAP as i64 + 5) {
        tokio_test::assert_ok!(
            state
                .record_sample(&SentimentSample::new(t, 50, Trend::Stable))
                .await
        );
    }
    let (_, body) = call(&state, "GET", "/api/sentiment", None).await;
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), SENTIMENT_READ_CAP);
    assert_eq!(history.last().unwrap()["t"], SENTIMENT_WRITE_CAP as i64 + 4);

    let samples = state.sentiment_history().await.unwrap();
    assert_eq!(samples.len(), SENTIMENT_READ_CAP);
}

#[tokio::test]
async fn leaderboard_ranks_by_volume() {
    let dir = TempDir::new();
    let state = state_in(&dir);
    for (id, addr, amt) in [("1", "0xa", "300"), ("2", "0xb", "1000"), ("3", "0xa", "800")] {
        call(&state, "POST", "/api/bets", Some(json!({ "id": id, "address": addr, "amountOctas": amt }))).await;
    }
    let (status, body) = call(&state, "GET", "/api/leaderboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            { "address": "0xa", "totalBets": 2, "totalVolumeOctas": 1100 },
            { "address": "0xb", "totalBets": 1, "totalVolumeOctas": 1000 },
        ])
    );
}

#[tokio::test]
async fn bot_endpoints_share_one_session() {
    let dir = TempDir::new();
    let state = state_in(&dir);

    let (_, cfg) = call(
        &state,
        "PUT",
        "/api/bot/config",
        Some(json!({ "mode": "inverse", "tick_interval_ms": 250 })),
    )
    .await;
    assert_eq!(cfg, json!({ "mode": "inverse", "tick_interval_ms": 250 }));

    let (_, step) = call(&state, "POST", "/api/bot/step", None).await;
    // No score ever observed: neutral 50, flat.
    assert_eq!(step["score"], 50);
    assert_eq!(step["decision"], json!({ "action": "flat" }));

    let (_, snap) = call(&state, "GET", "/api/bot", None).await;
    assert_eq!(snap["steps"], 1);
    assert_eq!(snap["config"]["mode"], "inverse");
    assert_eq!(snap["equity"], 1000.0);
}

#[tokio::test]
async fn live_readings_land_in_sentiment_history() {
    let dir = TempDir::new();
    let shared = SharedStore::new(JsonStore::new(&dir.0));
    let session = Session::new(
        StrategyConfig::default(),
        1000.0,
        PriceSeries::new(vec![100.0]).unwrap(),
        Box::new(ScriptedScores::new(vec![64, 58])),
    );
    let bot = SessionController::new(session).with_sink(Arc::new(shared.clone()));
    let state: AppState = Arc::new(ServerState::with_shared(shared, Arc::new(bot)));

    for _ in 0..3 {
        call(&state, "POST", "/api/bot/step", None).await;
    }

    // Two fresh readings; the third step reused the last score.
    let (_, body) = call(&state, "GET", "/api/sentiment", None).await;
    let scores: Vec<i64> = body["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["score"].as_i64().unwrap())
        .collect();
    assert_eq!(scores, vec![64, 58]);
    assert_eq!(body["history"][1]["trend"], 0);
}
