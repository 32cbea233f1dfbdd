mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use chrono::Duration;
use eqms_service::middleware::require_auth;
use tower::util::ServiceExt;

use common::{body_json, init_tracing, session_token, token_service, token_service_with_ttl};

fn protected_app(tokens: eqms_service::services::TokenService) -> Router {
    Router::new()
        .route("/protected", get(|| async { "protected" }))
        .layer(from_fn_with_state(tokens, require_auth))
}

#[tokio::test]
async fn missing_authorization_header_is_401() {
    init_tracing();
    let app = protected_app(token_service());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/protected")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Access token required");
}

#[tokio::test]
async fn non_bearer_scheme_is_401() {
    init_tracing();
    let app = protected_app(token_service());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/protected")
                .header("Authorization", "Token abcdef")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbage_token_is_403() {
    init_tracing();
    let app = protected_app(token_service());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/protected")
                .header("Authorization", "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn expired_token_is_403() {
    init_tracing();
    // Minted already expired
    let tokens = token_service_with_ttl(Duration::seconds(-1), Duration::hours(1));
    let token = session_token(&tokens, &["ADMIN"]);
    let app = protected_app(tokens);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/protected")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn valid_token_reaches_the_handler() {
    init_tracing();
    let tokens = token_service();
    let token = session_token(&tokens, &["VIEWER"]);
    let app = protected_app(tokens);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/protected")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
