//! HTTP API tests over a local listener
//!
//! Run with: `cargo test --test server_test`

mod common;

use common::{engine_with, StubBackend, StubCompletion};
use nl_spl_engine::web::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;

struct TestServer {
    base: String,
    client: reqwest::Client,
    backend: Arc<StubBackend>,
}

impl TestServer {
    async fn start(backend: StubBackend, completion: StubCompletion) -> Self {
        Self::start_with_default(backend, completion, 100).await
    }

    async fn start_with_default(backend: StubBackend, completion: StubCompletion, default_max_results: usize) -> Self {
        let (engine, backend, _, _) = engine_with(backend, completion);
        let state = AppState {
            engine: Arc::new(engine),
            history: Arc::new(Default::default()),
            default_max_results,
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });

        Self {
            base: format!("http://{}/api/v1/query", addr),
            client: reqwest::Client::new(),
            backend,
        }
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let response = self
            .client
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let response = self.client.get(format!("{}{}", self.base, path)).send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }
}

#[tokio::test]
async fn test_natural_query_and_session() {
    let server = TestServer::start(
        StubBackend::with_records(3),
        StubCompletion::replying(r#"{"query": "search index=* error earliest=-1h", "confidence": "high"}"#),
    )
    .await;

    let (status, body) = server
        .post("/natural", json!({ "question": "show me errors from the last hour", "max_results": 50 }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["result_count"], 3);
    assert_eq!(body["spl_query"], "search index=* error earliest=-1h");
    assert_eq!(body["confidence"], "high");

    let (status, body) = server.get("/session").await;
    assert_eq!(status, 200);
    assert_eq!(body["count"], 1);
    assert_eq!(body["entries"][0]["kind"], "natural");
    assert_eq!(body["entries"][0]["result_count"], 3);
}

#[tokio::test]
async fn test_invalid_inputs_rejected() {
    let server = TestServer::start(StubBackend::default(), StubCompletion::replying("unused")).await;

    let (status, body) = server.post("/natural", json!({ "question": "hi" })).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("at least"));

    let (status, _) = server
        .post("/natural", json!({ "question": "show me errors", "max_results": 0 }))
        .await;
    assert_eq!(status, 400);

    let (status, body) = server.post("/spl", json!({ "spl_query": "search index=main | delete" })).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("delete"));

    let (status, _) = server
        .post("/enhance", json!({ "spl_query": "search index=main", "feedback": "hi" }))
        .await;
    assert_eq!(status, 400);

    let (status, _) = server
        .post("/suggestions", json!({ "partial_question": "login", "max_suggestions": 21 }))
        .await;
    assert_eq!(status, 400);

    let (status, _) = server.get("/history?count=0").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_spl_suggestions_and_indexes() {
    let server = TestServer::start(StubBackend::with_records(2), StubCompletion::replying("unused")).await;

    let (status, body) = server
        .post("/spl", json!({ "spl_query": "search index=main | head 10", "max_results": 10 }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["spl_query"], "search index=main | head 10");
    assert_eq!(body["result_count"], 2);
    assert!(body.get("question").is_none());

    let (status, body) = server.post("/suggestions", json!({ "partial_question": "login" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["suggestions"], json!(["Find failed login attempts in the last 24 hours"]));

    let (status, body) = server.get("/indexes").await;
    assert_eq!(status, 200);
    assert_eq!(body["indexes"], json!(["_internal", "main"]));
    assert_eq!(body["count"], 2);

    let (status, body) = server.get("/history").await;
    assert_eq!(status, 200);
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_health_status_codes() {
    let server = TestServer::start(StubBackend::default(), StubCompletion::replying("unused")).await;
    let (status, body) = server.get("/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["overall"], "healthy");

    let server = TestServer::start(
        StubBackend::default(),
        StubCompletion {
            has_key: false,
            ..StubCompletion::replying("unused")
        },
    )
    .await;
    let (status, body) = server.get("/health").await;
    assert_eq!(status, 503);
    assert_eq!(body["overall"], "degraded");
    assert_eq!(body["components"]["openai"]["status"], "not_configured");
}

#[tokio::test]
async fn test_omitted_max_results_uses_configured_default() {
    // above the oneshot cap, so the default decides the strategy
    let server = TestServer::start_with_default(
        StubBackend {
            job_result_count: 12,
            ..StubBackend::default()
        },
        StubCompletion::replying("unused"),
        500,
    )
    .await;

    let (status, body) = server.post("/spl", json!({ "spl_query": "search index=main" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["statistics"]["result_count"], 12);
    assert!(!server.backend.called("oneshot"));
    assert!(server.backend.called("create_job"));

    let server = TestServer::start(StubBackend::with_records(2), StubCompletion::replying("unused")).await;
    let (_, body) = server.post("/spl", json!({ "spl_query": "search index=main" })).await;
    assert_eq!(body["result_count"], 2);
    assert!(server.backend.called("oneshot"));
}
