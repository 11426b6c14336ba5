//! # Integration Tests for sgate-api
//!
//! Health probes, schema introspection, gate dry-runs and reload against a
//! gateway populated from a temporary schema directory.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sgate_core::{GatePolicy, GatewayConfig, MissingSchemaPolicy};
use sgate_gate::{LocalHost, SchemaGateway};
use tower::ServiceExt;

use sgate_api::state::AppState;

fn schema_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let schema = json!({
        "type": "object",
        "properties": {
            "id": { "type": "string" },
            "total": { "type": "number" }
        },
        "required": ["id", "total"]
    });
    std::fs::write(
        dir.path().join("orderCreated.schema"),
        serde_json::to_vec(&schema).unwrap(),
    )
    .unwrap();
    dir
}

/// Helper: build the app over a gateway for `config`.
fn test_app(config: GatewayConfig) -> (axum::Router, Arc<SchemaGateway>) {
    let mut host = LocalHost::new("orders")
        .action("orderCreated", |p| p.clone())
        .action("pingHealth", |_| json!("pong"));
    let gateway = Arc::new(SchemaGateway::start(config, &mut host).unwrap());
    (sgate_api::app(AppState::new(Arc::clone(&gateway))), gateway)
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::http::Response<Body>) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let dir = schema_dir();
    let (app, _gateway) = test_app(GatewayConfig::filesystem(dir.path()));
    let response = app.oneshot(get("/health/liveness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let dir = schema_dir();
    let (app, _gateway) = test_app(GatewayConfig::filesystem(dir.path()));
    let response = app.oneshot(get("/health/readiness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["source"]["status"], "healthy");
}

#[tokio::test]
async fn test_readiness_fails_when_source_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _gateway) = test_app(GatewayConfig::filesystem(dir.path().join("missing")));
    let response = app.oneshot(get("/health/readiness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "unavailable");
    assert!(body["reason"].as_str().unwrap().contains("missing"));
}

// -- Schema Introspection -----------------------------------------------------

#[tokio::test]
async fn test_list_schemas() {
    let dir = schema_dir();
    let (app, _gateway) = test_app(GatewayConfig::filesystem(dir.path()));
    let response = app.oneshot(get("/v1/schemas")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["populated"], true);
    assert_eq!(body["loaded"], json!(["orderCreated"]));
    assert_eq!(body["load_failures"], 0);
}

#[tokio::test]
async fn test_get_schema() {
    let dir = schema_dir();
    let (app, gateway) = test_app(GatewayConfig::filesystem(dir.path()));
    let response = app.oneshot(get("/v1/schemas/orderCreated")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let schema = gateway.registry().lookup("orderCreated").unwrap();
    assert_eq!(body["name"], "orderCreated");
    assert_eq!(body["digest"], schema.digest());
    assert_eq!(&body["document"], schema.document());
}

#[tokio::test]
async fn test_get_unknown_schema_is_404() {
    let dir = schema_dir();
    let (app, _gateway) = test_app(GatewayConfig::filesystem(dir.path()));
    let response = app.oneshot(get("/v1/schemas/pingHealth")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_diagnostics_include_gate_counters() {
    let dir = schema_dir();
    let (app, gateway) = test_app(GatewayConfig::filesystem(dir.path()));
    gateway
        .validate_call("orderCreated", &json!({"id": "o1", "total": 1}))
        .unwrap();
    let response = app.oneshot(get("/v1/diagnostics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["source"], "filesystem");
    assert_eq!(body["gate"]["actions"]["accepted"], 1);
    assert_eq!(body["population"]["loaded"], json!(["orderCreated"]));
}

// -- Validation ---------------------------------------------------------------

#[tokio::test]
async fn test_validate_accepted() {
    let dir = schema_dir();
    let (app, _gateway) = test_app(GatewayConfig::filesystem(dir.path()));
    let response = app
        .oneshot(post_json(
            "/v1/validate/orderCreated",
            &json!({"id": "o1", "total": 9.99}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body, json!({"name": "orderCreated", "outcome": "accepted"}));
}

#[tokio::test]
async fn test_validate_rejected_is_422_with_errors() {
    let dir = schema_dir();
    let (app, _gateway) = test_app(GatewayConfig::filesystem(dir.path()));
    let response = app
        .oneshot(post_json("/v1/validate/orderCreated", &json!({"id": "o1"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "PAYLOAD_REJECTED");
    assert_eq!(body["error"]["name"], "orderCreated");
    let errors = body["error"]["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0]["message"].as_str().unwrap().contains("total"));
}

#[tokio::test]
async fn test_validate_missing_schema_proceeds_by_default() {
    let dir = schema_dir();
    let (app, _gateway) = test_app(GatewayConfig::filesystem(dir.path()));
    let response = app
        .oneshot(post_json("/v1/validate/pingHealth", &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "unvalidated");
    assert_eq!(body["detail"], "missing-schema");
}

#[tokio::test]
async fn test_validate_missing_schema_refused_under_reject_policy() {
    let dir = schema_dir();
    let config = GatewayConfig::filesystem(dir.path()).with_policy(GatePolicy {
        missing_schema: MissingSchemaPolicy::Reject,
        ..GatePolicy::default()
    });
    let (app, _gateway) = test_app(config);
    let response = app
        .oneshot(post_json("/v1/validate/pingHealth", &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "MISSING_SCHEMA");
}

#[tokio::test]
async fn test_validate_does_not_touch_gate_counters() {
    let dir = schema_dir();
    let (app, gateway) = test_app(GatewayConfig::filesystem(dir.path()));
    let response = app
        .clone()
        .oneshot(post_json("/v1/validate/orderCreated", &json!({"id": "o1"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let response = app
        .oneshot(post_json("/v1/validate/pingHealth", &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let gate = gateway.diagnostics().gate;
    assert_eq!(gate.actions.total(), 0);
    assert!(gate.recent_failures.is_empty());
}

// -- Reload -------------------------------------------------------------------

#[tokio::test]
async fn test_reload_picks_up_new_schema() {
    let dir = schema_dir();
    let (app, gateway) = test_app(GatewayConfig::filesystem(dir.path()));
    std::fs::write(dir.path().join("pingHealth.json"), r#"{"type": "object"}"#).unwrap();

    let response = app
        .oneshot(Request::builder().method("POST").uri("/v1/reload").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["loaded"], 2);
    assert!(gateway.registry().lookup("pingHealth").is_some());
}
