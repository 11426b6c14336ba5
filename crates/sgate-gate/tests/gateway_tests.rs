//! # Integration Tests for the Gateway Bootstrap
//!
//! Drives a `LocalHost` service through an installed `SchemaGateway`, with
//! schemas from a temporary directory or from a wiremock authority.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};
use sgate_core::{
    ConnectionState, GatePolicy, GatewayConfig, GatewayError, MissingSchemaPolicy, SourceHealth,
    UnvalidatedReason, ValidationOutcome,
};
use sgate_gate::{EventContext, HostError, LocalHost, SchemaGateway};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn order_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": { "type": "string" },
            "total": { "type": "number" }
        },
        "required": ["id", "total"]
    })
}

fn shipped_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "orderId": { "type": "string" } },
        "required": ["orderId"]
    })
}

fn write(dir: &Path, file: &str, document: &Value) {
    std::fs::write(dir.join(file), serde_json::to_vec_pretty(document).unwrap()).unwrap();
}

fn schema_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "orderCreated.schema", &order_schema());
    write(dir.path(), "orderShipped.schema.json", &shipped_schema());
    dir
}

/// An order service recording which handlers actually ran.
fn order_service(shipped: Arc<Mutex<Vec<Value>>>) -> LocalHost {
    LocalHost::new("orders")
        .action("orderCreated", |p| json!({ "created": p["id"] }))
        .action("pingHealth", |_| json!("pong"))
        .event("orderShipped", move |ctx| shipped.lock().push(ctx.payload.clone()))
}

// -- Filesystem source ---------------------------------------------------------

#[test]
fn order_created_scenario() {
    let dir = schema_dir();
    let mut host = order_service(Arc::default());
    let gateway = SchemaGateway::start(GatewayConfig::filesystem(dir.path()), &mut host).unwrap();

    assert_eq!(
        host.call("orderCreated", &json!({"id": "o1", "total": 9.99})).unwrap(),
        json!({"created": "o1"})
    );

    let err = host.call("orderCreated", &json!({"id": "o1"})).unwrap_err();
    match err {
        HostError::Refused(GatewayError::PayloadRejected { name, violations }) => {
            assert_eq!(name, "orderCreated");
            assert_eq!(violations.len(), 1);
            assert!(violations.violations()[0].message.contains("total"));
        }
        other => panic!("expected PayloadRejected, got {other}"),
    }

    assert_eq!(gateway.health(), SourceHealth::Healthy);
    assert!(gateway.check().is_ok());
    let diag = gateway.diagnostics();
    assert_eq!(diag.registry.loaded, vec!["orderCreated", "orderShipped"]);
    assert_eq!(diag.gate.actions.accepted, 1);
    assert_eq!(diag.gate.actions.rejected, 1);
}

#[test]
fn missing_schema_proceeds_under_default_policy() {
    let dir = schema_dir();
    let mut host = order_service(Arc::default());
    let gateway = SchemaGateway::start(GatewayConfig::filesystem(dir.path()), &mut host).unwrap();

    assert_eq!(
        gateway.validate_call("pingHealth", &json!({})).unwrap(),
        ValidationOutcome::Unvalidated(UnvalidatedReason::MissingSchema)
    );
    assert_eq!(host.call("pingHealth", &json!({})).unwrap(), json!("pong"));

    let snap = gateway.diagnostics().gate;
    assert_eq!(snap.actions.unvalidated, 2);
    assert!(snap.recent_failures.iter().all(|f| f.reason == "missing-schema"));
}

#[test]
fn missing_schema_is_refused_under_reject_policy() {
    let dir = schema_dir();
    let mut host = order_service(Arc::default());
    let config = GatewayConfig::filesystem(dir.path()).with_policy(GatePolicy {
        missing_schema: MissingSchemaPolicy::Reject,
        ..GatePolicy::default()
    });
    let _gateway = SchemaGateway::start(config, &mut host).unwrap();

    let err = host.call("pingHealth", &json!({})).unwrap_err();
    assert!(matches!(err, HostError::Refused(GatewayError::MissingSchema { .. })));
    assert!(host
        .call("orderCreated", &json!({"id": "o1", "total": 1}))
        .is_ok());
}

#[test]
fn invalid_event_is_recorded_but_delivered() {
    let dir = schema_dir();
    let shipped = Arc::new(Mutex::new(Vec::new()));
    let mut host = order_service(Arc::clone(&shipped));
    let gateway = SchemaGateway::start(GatewayConfig::filesystem(dir.path()), &mut host).unwrap();

    assert!(host.emit(
        EventContext::new("orderShipped", json!({"orderId": 7})).with_sender("warehouse")
    ));
    assert!(host.emit(EventContext::new("orderShipped", json!({"orderId": "o1"}))));

    assert_eq!(shipped.lock().len(), 2);
    let snap = gateway.diagnostics().gate;
    assert_eq!(snap.events.rejected, 1);
    assert_eq!(snap.events.accepted, 1);
    let failure = &snap.recent_failures[0];
    assert_eq!(failure.sender.as_deref(), Some("warehouse"));
    assert!(!failure.dropped);
}

#[test]
fn invalid_event_is_dropped_when_configured() {
    let dir = schema_dir();
    let shipped = Arc::new(Mutex::new(Vec::new()));
    let mut host = order_service(Arc::clone(&shipped));
    let config = GatewayConfig::filesystem(dir.path()).with_policy(GatePolicy {
        drop_invalid_events: true,
        ..GatePolicy::default()
    });
    let gateway = SchemaGateway::start(config, &mut host).unwrap();

    host.emit(EventContext::new("orderShipped", json!({})));
    host.emit(EventContext::new("orderShipped", json!({"orderId": "o2"})));

    assert_eq!(*shipped.lock(), vec![json!({"orderId": "o2"})]);
    assert!(gateway.diagnostics().gate.recent_failures[0].dropped);
}

#[test]
fn missing_directory_does_not_fail_startup() {
    let dir = tempfile::tempdir().unwrap();
    let mut host = order_service(Arc::default());
    let gateway =
        SchemaGateway::start(GatewayConfig::filesystem(dir.path().join("absent")), &mut host)
            .unwrap();

    assert!(matches!(
        gateway.startup_error(),
        Some(GatewayError::DirectoryNotFound { .. })
    ));
    assert!(gateway.health().is_unavailable());
    assert!(gateway.check().is_err());
    assert!(!gateway.registry().is_populated());
    assert_eq!(
        gateway.validate_call("orderCreated", &json!({})).unwrap(),
        ValidationOutcome::Unvalidated(UnvalidatedReason::RegistryNotPopulated)
    );
    // Calls keep flowing.
    assert!(host.call("orderCreated", &json!({})).is_ok());
    assert_eq!(
        gateway.diagnostics().startup_error.unwrap().code,
        "DIRECTORY_NOT_FOUND"
    );
}

#[test]
fn broken_schema_file_degrades_health() {
    let dir = schema_dir();
    std::fs::write(dir.path().join("refundIssued.json"), "{ not json").unwrap();
    let mut host = order_service(Arc::default());
    let gateway = SchemaGateway::start(GatewayConfig::filesystem(dir.path()), &mut host).unwrap();

    assert!(matches!(gateway.health(), SourceHealth::Degraded { .. }));
    let diag = gateway.diagnostics();
    assert_eq!(diag.registry.load_failures, 1);
    assert_eq!(diag.population.unwrap().parse_failures[0].name, "refundIssued");
    assert!(gateway.registry().lookup("orderCreated").is_some());
}

#[tokio::test]
async fn reload_picks_up_added_and_removed_files() {
    let dir = schema_dir();
    let mut host = order_service(Arc::default());
    let gateway = SchemaGateway::start(GatewayConfig::filesystem(dir.path()), &mut host).unwrap();

    std::fs::remove_file(dir.path().join("orderShipped.schema.json")).unwrap();
    write(
        dir.path(),
        "pingHealth.schema",
        &json!({"type": "object", "additionalProperties": false}),
    );
    gateway.reload().await.unwrap();

    assert_eq!(gateway.registry().names(), vec!["orderCreated", "pingHealth"]);
    assert!(host.call("pingHealth", &json!({"extra": 1})).is_err());
    assert!(host.call("pingHealth", &json!({})).is_ok());
}

#[tokio::test]
async fn reload_of_vanished_directory_keeps_entries() {
    let dir = schema_dir();
    let root = dir.path().to_path_buf();
    let mut host = order_service(Arc::default());
    let gateway = SchemaGateway::start(GatewayConfig::filesystem(&root), &mut host).unwrap();

    drop(dir);
    assert!(gateway.reload().await.is_err());
    assert!(gateway.registry().lookup("orderCreated").is_some());
    assert!(gateway.startup_error().is_some());
}

// -- Remote source ---------------------------------------------------------------

#[tokio::test]
async fn remote_source_populates_declared_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/schemas/orderCreated"))
        .respond_with(ResponseTemplate::new(200).set_body_json(order_schema()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/schemas/orderShipped"))
        .respond_with(ResponseTemplate::new(200).set_body_json(shipped_schema()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/schemas/pingHealth"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut host = order_service(Arc::default());
    let config = GatewayConfig::remote(
        Url::parse(&server.uri()).unwrap(),
        3,
        Duration::from_millis(20),
    );
    let gateway = SchemaGateway::start(config, &mut host).unwrap();
    gateway.wait_settled().await;

    assert_eq!(gateway.connection_state(), Some(ConnectionState::Connected));
    assert!(host.call("orderCreated", &json!({"id": "o1"})).is_err());
    assert!(host.call("pingHealth", &json!({})).is_ok());
    let status = gateway.diagnostics().connection.unwrap();
    assert_eq!(status.unresolved, vec!["pingHealth".to_string()]);
    assert!(matches!(gateway.health(), SourceHealth::Degraded { .. }));

    gateway.shutdown().await;
}

#[tokio::test]
async fn unreachable_authority_leaves_calls_unvalidated() {
    let mut host = order_service(Arc::default());
    let config = GatewayConfig::remote(
        Url::parse("http://127.0.0.1:1/").unwrap(),
        2,
        Duration::from_millis(50),
    );
    let gateway = SchemaGateway::start(config, &mut host).unwrap();
    gateway.wait_settled().await;

    assert_eq!(gateway.connection_state(), Some(ConnectionState::Exhausted));
    assert!(matches!(
        gateway.check(),
        Err(GatewayError::ConnectivityExhausted { attempts: 2, .. })
    ));
    assert!(gateway.health().is_unavailable());
    assert_eq!(
        gateway.validate_call("orderCreated", &json!({})).unwrap(),
        ValidationOutcome::Unvalidated(UnvalidatedReason::RegistryNotPopulated)
    );
    assert!(host.call("orderCreated", &json!({})).is_ok());
}

#[tokio::test]
async fn shutdown_halts_retries_while_another_task_waits() {
    let mut host = order_service(Arc::default());
    let config = GatewayConfig::remote(
        Url::parse("http://127.0.0.1:1/").unwrap(),
        10,
        Duration::from_secs(60),
    );
    let gateway = Arc::new(SchemaGateway::start(config, &mut host).unwrap());
    let waiter = tokio::spawn({
        let gateway = Arc::clone(&gateway);
        async move { gateway.wait_settled().await }
    });

    // First probe refused; the supervisor is now in its 60s retry wait.
    tokio::time::timeout(Duration::from_secs(5), async {
        while gateway.diagnostics().connection.map(|c| c.attempts_made) != Some(1) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("first probe fails");

    gateway.shutdown().await;
    tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("waiter released by shutdown")
        .unwrap();

    let status = gateway.diagnostics().connection.unwrap();
    assert_eq!(status.state, ConnectionState::Disconnected);
    assert_eq!(status.attempts_made, 1);
}

#[test]
fn zero_retry_threshold_is_a_configuration_error() {
    let mut host = order_service(Arc::default());
    let config = GatewayConfig::remote(
        Url::parse("http://127.0.0.1:1/").unwrap(),
        0,
        Duration::from_millis(50),
    );
    assert!(matches!(
        SchemaGateway::start(config, &mut host),
        Err(sgate_gate::BootstrapError::Config(_))
    ));
}
