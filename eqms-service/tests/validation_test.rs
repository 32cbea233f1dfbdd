mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use eqms_service::dtos::auth::LoginRequest;
use eqms_service::dtos::equipment::CreateEquipmentRequest;
use eqms_service::utils::ValidatedJson;
use tower::util::ServiceExt;

use common::{body_json, init_tracing};

async fn accept_equipment(
    ValidatedJson(_req): ValidatedJson<CreateEquipmentRequest>,
) -> impl IntoResponse {
    (StatusCode::CREATED, Json(serde_json::json!({"ok": true})))
}

async fn accept_login(ValidatedJson(_req): ValidatedJson<LoginRequest>) -> impl IntoResponse {
    StatusCode::OK
}

fn app() -> Router {
    Router::new()
        .route("/equipment", post(accept_equipment))
        .route("/login", post(accept_login))
}

async fn post_json(app: Router, uri: &str, body: &str) -> axum::response::Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn missing_location_names_the_field() {
    init_tracing();

    let response = post_json(
        app(),
        "/equipment",
        r#"{"name": "Torque wrench", "serialNumber": "TW-0042"}"#,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;

    let errors = body["errors"].as_array().expect("errors array missing");
    assert!(
        errors
            .iter()
            .any(|e| e.as_str().unwrap_or_default().contains("location")),
        "no error mentioned the location field: {:?}",
        errors
    );
}

#[tokio::test]
async fn complete_equipment_payload_is_accepted() {
    init_tracing();

    let response = post_json(
        app(),
        "/equipment",
        r#"{"name": "Torque wrench", "serialNumber": "TW-0042", "location": "Lab 3"}"#,
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn invalid_email_is_rejected_with_the_field_named() {
    init_tracing();

    let response = post_json(
        app(),
        "/login",
        r#"{"email": "not-an-email", "password": "secret"}"#,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;

    let errors = body["errors"].as_array().expect("errors array missing");
    assert!(errors
        .iter()
        .any(|e| e.as_str().unwrap_or_default().contains("email")));
}

#[tokio::test]
async fn malformed_json_is_a_400() {
    init_tracing();

    let response = post_json(app(), "/equipment", "{not json").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
