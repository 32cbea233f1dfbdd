mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{delete, post},
    Extension, Json, Router,
};
use eqms_service::middleware::{
    audit_trail, require_auth, AuditDescriptor, AuditHandled, AuditTrail, FieldRef,
};
use eqms_service::services::{AuditRecorder, MemoryAuditSink, TokenService};
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

use common::{init_tracing, session_token, token_service};

const THING_ID: &str = "7b9f4e57-9d25-4b8e-a1b4-3a4f4e7a2c10";

async fn create_thing() -> impl IntoResponse {
    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": THING_ID,
            "serialNumber": "TW-0042",
            "name": "Torque wrench"
        })),
    )
}

async fn list_things() -> impl IntoResponse {
    Json(serde_json::json!([]))
}

async fn delete_thing() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

async fn conflicting_thing() -> impl IntoResponse {
    (
        StatusCode::CONFLICT,
        Json(serde_json::json!({ "error": "Serial number already registered" })),
    )
}

async fn self_audited_thing() -> Response {
    let mut res = (
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": THING_ID })),
    )
        .into_response();
    res.extensions_mut().insert(AuditHandled);
    res
}

fn audited_app(tokens: TokenService, sink: Arc<MemoryAuditSink>) -> Router {
    let trail = AuditTrail::new(AuditRecorder::new(sink));

    Router::new()
        .route("/things", post(create_thing).get(list_things))
        .route_layer(Extension(AuditDescriptor::from_body(
            "thing",
            "serialNumber",
        )))
        .merge(
            Router::new()
                .route("/things/:id", delete(delete_thing))
                .route_layer(Extension(AuditDescriptor::from_path("thing", "id"))),
        )
        .merge(
            Router::new()
                .route("/conflicts", post(conflicting_thing))
                .route_layer(Extension(AuditDescriptor::from_body(
                    "thing",
                    "serialNumber",
                ))),
        )
        .route("/self-audited", post(self_audited_thing))
        .layer(from_fn_with_state(trail, audit_trail))
        .layer(from_fn_with_state(tokens, require_auth))
}

async fn send(
    app: Router,
    method: &str,
    uri: &str,
    token: &str,
) -> axum::response::Response {
    app.oneshot(
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// The audit write is fire-and-forget; poll until it lands.
async fn wait_for_entries(sink: &MemoryAuditSink, expected: usize) {
    for _ in 0..100 {
        if sink.entries().len() >= expected {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!(
        "expected {} audit entries, found {}",
        expected,
        sink.entries().len()
    );
}

#[tokio::test]
async fn get_requests_are_never_audited() {
    init_tracing();
    let tokens = token_service();
    let token = session_token(&tokens, &["ADMIN"]);
    let sink = Arc::new(MemoryAuditSink::new());
    let app = audited_app(tokens, sink.clone());

    let response = send(app, "GET", "/things", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(sink.entries().is_empty());
}

#[tokio::test]
async fn successful_create_is_audited_exactly_once() {
    init_tracing();
    let tokens = token_service();
    let token = session_token(&tokens, &["ADMIN"]);
    let sink = Arc::new(MemoryAuditSink::new());
    let app = audited_app(tokens.clone(), sink.clone());

    let response = send(app, "POST", "/things", &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // The body must reach the client unaltered
    let body = common::body_json(response).await;
    assert_eq!(body["serialNumber"], "TW-0042");

    wait_for_entries(&sink, 1).await;
    let entries = sink.entries();
    assert_eq!(entries.len(), 1);

    let entry = &entries[0];
    assert_eq!(entry.action, "create");
    assert_eq!(entry.entity_type.as_deref(), Some("thing"));
    assert_eq!(entry.entity_id, Some(Uuid::parse_str(THING_ID).unwrap()));
    assert_eq!(entry.entity_identifier.as_deref(), Some("TW-0042"));
    assert!(entry.success);
    assert_eq!(entry.status_code, 201);
    assert!(entry.actor_id.is_some());
}

#[tokio::test]
async fn delete_resolves_the_entity_from_the_path() {
    init_tracing();
    let tokens = token_service();
    let token = session_token(&tokens, &["ADMIN"]);
    let sink = Arc::new(MemoryAuditSink::new());
    let app = audited_app(tokens, sink.clone());

    let id = Uuid::new_v4();
    let response = send(app, "DELETE", &format!("/things/{}", id), &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    wait_for_entries(&sink, 1).await;
    let entries = sink.entries();
    assert_eq!(entries[0].action, "delete");
    assert_eq!(entries[0].entity_id, Some(id));
    assert!(entries[0].success);
}

#[tokio::test]
async fn failed_mutations_are_audited_with_the_error() {
    init_tracing();
    let tokens = token_service();
    let token = session_token(&tokens, &["ADMIN"]);
    let sink = Arc::new(MemoryAuditSink::new());
    let app = audited_app(tokens, sink.clone());

    let response = send(app, "POST", "/conflicts", &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    wait_for_entries(&sink, 1).await;
    let entries = sink.entries();
    assert!(!entries[0].success);
    assert_eq!(
        entries[0].error_message.as_deref(),
        Some("Serial number already registered")
    );
    assert_eq!(entries[0].status_code, 409);
}

#[tokio::test]
async fn handler_recorded_mutations_are_not_double_logged() {
    init_tracing();
    let tokens = token_service();
    let token = session_token(&tokens, &["ADMIN"]);
    let sink = Arc::new(MemoryAuditSink::new());
    let app = audited_app(tokens, sink.clone());

    let response = send(app, "POST", "/self-audited", &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(sink.entries().is_empty());
}
