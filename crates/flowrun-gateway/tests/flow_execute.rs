use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use flowrun_core::config::{ApiKeyConfig, AppConfig, GatewayConfig};
use flowrun_engine::FlowEngine;
use flowrun_gateway::{router, AppState};
use flowrun_test_utils::{edge, graph, http, payload, trigger, MockHttpClient};

fn app_with(gateway: GatewayConfig, mock: Arc<MockHttpClient>) -> Router {
    let engine = FlowEngine::new(AppConfig::default(), mock);
    router(Arc::new(AppState {
        config: gateway,
        engine: Arc::new(engine),
    }))
}

fn app() -> Router {
    app_with(GatewayConfig::default(), Arc::new(MockHttpClient::new()))
}

fn secured() -> GatewayConfig {
    GatewayConfig {
        api_keys: vec![ApiKeyConfig {
            name: "editor".into(),
            key: "fk_live".into(),
        }],
        ..GatewayConfig::default()
    }
}

fn execute(body: impl Into<Body>) -> Request<Body> {
    Request::post("/api/flow/execute")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn two_triggers() -> Value {
    json!({
        "nodes": [
            {"id": "t1", "type": "trigger", "label": "A", "config": {}},
            {"id": "t2", "type": "trigger", "label": "B", "config": {}}
        ],
        "edges": []
    })
}

#[tokio::test]
async fn health_needs_no_auth() {
    let app = app_with(secured(), Arc::new(MockHttpClient::new()));
    let req = Request::get("/api/health").body(Body::empty()).unwrap();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn anonymous_run_returns_trace() {
    let (status, body) = send(app(), execute(two_triggers().to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["results"][0]["nodeId"], "t1");
    assert_eq!(body["results"][1]["nodeId"], "t2");
    assert_eq!(body["results"][0]["status"], "success");
    assert!(body["totalDurationMs"].is_u64());
}

#[tokio::test]
async fn missing_or_wrong_key_is_401() {
    let (status, body) = send(
        app_with(secured(), Arc::new(MockHttpClient::new())),
        execute(two_triggers().to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "Unauthorized"}));

    let mut req = execute(two_triggers().to_string());
    req.headers_mut()
        .insert("authorization", "Bearer nope".parse().unwrap());
    let (status, _) = send(app_with(secured(), Arc::new(MockHttpClient::new())), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn auth_runs_before_body_parsing() {
    let (status, _) = send(
        app_with(secured(), Arc::new(MockHttpClient::new())),
        execute("not json"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn valid_key_is_accepted() {
    let mut req = execute(two_triggers().to_string());
    req.headers_mut()
        .insert("authorization", "Bearer fk_live".parse().unwrap());
    let (status, body) = send(app_with(secured(), Arc::new(MockHttpClient::new())), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn invalid_json_is_400() {
    let (status, body) = send(app(), execute("{nodes:")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid JSON body"}));
}

#[tokio::test]
async fn too_many_nodes_is_400_and_runs_nothing() {
    let mock = Arc::new(MockHttpClient::new());
    let nodes: Vec<_> = (0..51)
        .map(|i| http(&format!("h{}", i), "https://api.test"))
        .collect();
    let body = payload(&graph(nodes, vec![]));

    let (status, body) = send(app_with(GatewayConfig::default(), mock.clone()), execute(body.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
    assert!(body["details"].as_str().unwrap().contains("51"));
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn empty_graph_is_400() {
    let (status, body) = send(app(), execute(json!({"nodes": [], "edges": []}).to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
}

#[tokio::test]
async fn cycle_is_400() {
    let g = graph(
        vec![trigger("a"), trigger("b")],
        vec![edge("a", "b"), edge("b", "a")],
    );
    let (status, body) = send(app(), execute(payload(&g).to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Flow graph contains a cycle"}));
}

#[tokio::test]
async fn node_failure_is_still_200() {
    let mock = Arc::new(MockHttpClient::new());
    let g = graph(
        vec![trigger("t"), http("h", "ftp://example.com/file")],
        vec![edge("t", "h")],
    );
    let (status, body) = send(
        app_with(GatewayConfig::default(), mock.clone()),
        execute(payload(&g).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["results"][1]["status"], "error");
    let err = body["results"][1]["error"].as_str().unwrap();
    assert!(err.contains("protocol") && err.contains("not allowed"), "{}", err);
    assert_eq!(mock.request_count(), 0);
}
