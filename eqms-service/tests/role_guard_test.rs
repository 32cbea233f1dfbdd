mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use eqms_service::middleware::{authorize_roles, require_auth};
use eqms_service::services::TokenService;
use tower::util::ServiceExt;

use common::{body_json, init_tracing, session_token, token_service};

fn guarded_app(tokens: TokenService, allowed: &'static [&'static str]) -> Router {
    Router::new()
        .route("/guarded", get(|| async { "ok" }))
        .route_layer(from_fn(move |req, next| authorize_roles(req, next, allowed)))
        .layer(from_fn_with_state(tokens, require_auth))
}

async fn get_guarded(app: Router, token: &str) -> axum::response::Response {
    app.oneshot(
        Request::builder()
            .uri("/guarded")
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn viewer_is_denied_an_admin_route() {
    init_tracing();
    let tokens = token_service();
    let token = session_token(&tokens, &["VIEWER"]);
    let app = guarded_app(tokens, &["ADMIN"]);

    let response = get_guarded(app, &token).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Access denied: insufficient permissions");
}

#[tokio::test]
async fn manager_is_admitted_by_a_multi_role_allow_list() {
    init_tracing();
    let tokens = token_service();
    let token = session_token(&tokens, &["MANAGER"]);
    let app = guarded_app(tokens, &["ADMIN", "MANAGER", "AUDITOR"]);

    let response = get_guarded(app, &token).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn any_intersecting_role_is_enough() {
    init_tracing();
    let tokens = token_service();
    let token = session_token(&tokens, &["VIEWER", "AUDITOR"]);
    let app = guarded_app(tokens, &["ADMIN", "AUDITOR"]);

    let response = get_guarded(app, &token).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn role_matching_is_case_sensitive() {
    init_tracing();
    let tokens = token_service();
    let token = session_token(&tokens, &["admin"]);
    let app = guarded_app(tokens, &["ADMIN"]);

    let response = get_guarded(app, &token).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn guard_without_an_authenticated_identity_is_401() {
    init_tracing();
    // Guard mounted without the authentication layer: no claims ever
    // reach the request extensions
    let app = Router::new()
        .route("/guarded", get(|| async { "ok" }))
        .route_layer(from_fn(|req, next| authorize_roles(req, next, &["ADMIN"])));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/guarded")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
