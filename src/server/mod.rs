//! Axum HTTP server for the bet store and the bot session.
//!
//! Serves a JSON API under `/api`. CORS is open for local frontends.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    routing::{get, post, put},
    Router,
};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

pub use routes::{AppState, ServerState};

/// Bind the port and serve in a background task.
///
/// Binding happens before this returns, so a taken port is reported to the
/// caller rather than inside the task.
pub async fn spawn_server(state: AppState, port: u16) -> Result<JoinHandle<()>> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind server port {port}"))?;

    info!(port, "Server listening on http://localhost:{port}");

    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Server error");
        }
    }))
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // Store
        .route("/api/bets", get(routes::get_bets).post(routes::post_bet))
        .route("/api/sentiment", get(routes::get_sentiment).post(routes::post_sentiment))
        .route("/api/leaderboard", get(routes::get_leaderboard))
        // Bot session
        .route("/api/bot", get(routes::get_bot))
        .route("/api/bot/start", post(routes::start_bot))
        .route("/api/bot/stop", post(routes::stop_bot))
        .route("/api/bot/step", post(routes::step_bot))
        .route("/api/bot/config", put(routes::put_bot_config))
        .route("/api/backtest", post(routes::post_backtest))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Session, SessionController};
    use crate::feeds::price::PriceSeries;
    use crate::feeds::ScriptedScores;
    use crate::storage::JsonStore;
    use crate::types::StrategyConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::path::PathBuf;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> (AppState, PathBuf) {
        let mut dir = std::env::temp_dir();
        dir.push(format!("xenith_server_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        let session = Session::new(
            StrategyConfig::default(),
            1000.0,
            PriceSeries::new(vec![100.0, 101.0, 102.5]).unwrap(),
            Box::new(ScriptedScores::new(vec![60, 60, 60])),
        );
        let state = Arc::new(ServerState::new(
            JsonStore::new(&dir),
            Arc::new(SessionController::new(session)),
        ));
        (state, dir)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (state, dir) = test_state();
        let resp = build_router(state).oneshot(get_request("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_post_then_get_bets() {
        let (state, dir) = test_state();
        let app = build_router(state);

        let resp = app
            .clone()
            .oneshot(json_request("POST", "/api/bets", json!({ "id": "a-1", "address": "a" })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!({ "ok": true }));

        let resp = app.oneshot(get_request("/api/bets")).await.unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["bets"][0]["address"], "a");
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_post_bet_without_id_is_400() {
        let (state, dir) = test_state();
        let resp = build_router(state)
            .oneshot(json_request("POST", "/api/bets", json!({ "address": "a" })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await, json!({ "error": "missing id" }));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_invalid_sentiment_is_400() {
        let (state, dir) = test_state();
        let resp = build_router(state)
            .oneshot(json_request("POST", "/api/sentiment", json!({ "score": 50 })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await, json!({ "error": "invalid sample" }));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_sentiment_roundtrip() {
        let (state, dir) = test_state();
        let app = build_router(state);
        app.clone()
            .oneshot(json_request("POST", "/api/sentiment", json!({ "t": 1, "score": 70, "trend": 2 })))
            .await
            .unwrap();
        let resp = app.oneshot(get_request("/api/sentiment")).await.unwrap();
        assert_eq!(
            body_json(resp).await,
            json!({ "history": [{ "t": 1, "score": 70, "trend": 2 }] })
        );
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_leaderboard_endpoint() {
        let (state, dir) = test_state();
        let app = build_router(state);
        for (id, addr, amt) in [("1", "a", "10"), ("2", "b", "30"), ("3", "a", "5")] {
            app.clone()
                .oneshot(json_request(
                    "POST",
                    "/api/bets",
                    json!({ "id": id, "address": addr, "amountOctas": amt }),
                ))
                .await
                .unwrap();
        }
        let json = body_json(app.oneshot(get_request("/api/leaderboard")).await.unwrap()).await;
        assert_eq!(json[0]["address"], "b");
        assert_eq!(json[1]["totalBets"], 2);
        assert_eq!(json[1]["totalVolumeOctas"], 15);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_bot_step_and_snapshot() {
        let (state, dir) = test_state();
        let app = build_router(state);

        let resp = app
            .clone()
            .oneshot(Request::builder().method("POST").uri("/api/bot/step").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let step = body_json(resp).await;
        assert_eq!(step["step"], 1);
        assert_eq!(step["decision"]["action"], "open");

        let snap = body_json(app.oneshot(get_request("/api/bot")).await.unwrap()).await;
        assert_eq!(snap["running"], false);
        assert_eq!(snap["position"]["direction"], "long");
        assert_eq!(snap["log"][0], "Open LONG at 100.00 (score 60)");
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_bot_start_stop() {
        let (state, dir) = test_state();
        let app = build_router(state.clone());
        let post = |uri: &str| Request::builder().method("POST").uri(uri).body(Body::empty()).unwrap();

        let json = body_json(app.clone().oneshot(post("/api/bot/start")).await.unwrap()).await;
        assert_eq!(json, json!({ "changed": true, "running": true }));
        let json = body_json(app.clone().oneshot(post("/api/bot/start")).await.unwrap()).await;
        assert_eq!(json["changed"], false);
        assert!(state.bot.is_running().await);

        let json = body_json(app.oneshot(post("/api/bot/stop")).await.unwrap()).await;
        assert_eq!(json, json!({ "changed": true, "running": false }));
        assert!(!state.bot.is_running().await);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_backtest_is_reproducible_by_seed() {
        let (state, dir) = test_state();
        let app = build_router(state);
        let body = json!({ "mode": "inverse", "steps": 300, "seed": 7 });

        let resp = app.clone().oneshot(json_request("POST", "/api/backtest", body.clone())).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let first = body_json(resp).await;
        assert_eq!(first["seed"], 7);
        assert_eq!(first["steps"], 300);
        assert_eq!(first["initial_equity"], 1000.0);

        let second = body_json(app.oneshot(json_request("POST", "/api/backtest", body)).await.unwrap()).await;
        assert_eq!(first["final_equity"], second["final_equity"]);
        assert_eq!(first["total_trades"], second["total_trades"]);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_backtest_rejects_bad_parameters() {
        let (state, dir) = test_state();
        let app = build_router(state);
        for body in [json!({ "steps": 0 }), json!({ "start_price": -1.0 }), json!({ "initial_equity": 0.0 })] {
            let resp = app.clone().oneshot(json_request("POST", "/api/backtest", body)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_bot_config_clamps_tick() {
        let (state, dir) = test_state();
        let resp = build_router(state)
            .oneshot(json_request(
                "PUT",
                "/api/bot/config",
                json!({ "mode": "inverse", "tick_interval_ms": 10 }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!({ "mode": "inverse", "tick_interval_ms": 50 }));
        std::fs::remove_dir_all(dir).unwrap();
    }
}
