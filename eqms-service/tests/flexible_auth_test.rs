mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use chrono::Duration;
use eqms_service::middleware::{flexible_auth, CurrentPrincipal, FlexibleAuth, Principal};
use eqms_service::services::TokenService;
use tower::util::ServiceExt;
use uuid::Uuid;

use common::{init_tracing, session_token, token_service, token_service_with_ttl};

async fn whoami(principal: CurrentPrincipal) -> &'static str {
    match principal.0 {
        Principal::User(_) => "user",
        Principal::Auditor(_) => "auditor",
    }
}

fn flexible_app(tokens: TokenService) -> Router {
    Router::new()
        .route("/whoami", get(whoami))
        .layer(from_fn_with_state(FlexibleAuth::new(tokens), flexible_auth))
}

async fn get_whoami(app: Router, authorization: Option<&str>) -> axum::response::Response {
    let mut builder = Request::builder().uri("/whoami");
    if let Some(value) = authorization {
        builder = builder.header("Authorization", value);
    }
    app.oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn bearer_scheme_routes_to_the_session_validator() {
    init_tracing();
    let tokens = token_service();
    let token = session_token(&tokens, &["VIEWER"]);
    let app = flexible_app(tokens);

    let response = get_whoami(app, Some(&format!("Bearer {}", token))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&body[..], b"user");
}

#[tokio::test]
async fn auditor_scheme_routes_to_the_auditor_validator() {
    init_tracing();
    let tokens = token_service();
    let (token, _) = tokens
        .issue_auditor("external auditor", vec![Uuid::new_v4()], None)
        .unwrap();
    let app = flexible_app(tokens);

    let response = get_whoami(app, Some(&format!("AuditorToken {}", token))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&body[..], b"auditor");
}

#[tokio::test]
async fn session_token_is_rejected_on_the_auditor_scheme() {
    init_tracing();
    let tokens = token_service();
    let token = session_token(&tokens, &["ADMIN"]);
    let app = flexible_app(tokens);

    // Valid credential, wrong scheme: the auditor validator must not
    // accept a session token
    let response = get_whoami(app, Some(&format!("AuditorToken {}", token))).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_scheme_is_401() {
    init_tracing();
    let app = flexible_app(token_service());

    let response = get_whoami(app, Some("Basic dXNlcjpwYXNz")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_header_is_401() {
    init_tracing();
    let app = flexible_app(token_service());

    let response = get_whoami(app, None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_auditor_token_is_403() {
    init_tracing();
    let tokens = token_service_with_ttl(Duration::hours(1), Duration::seconds(-1));
    let (token, _) = tokens
        .issue_auditor("external auditor", vec![Uuid::new_v4()], None)
        .unwrap();
    let app = flexible_app(tokens);

    let response = get_whoami(app, Some(&format!("AuditorToken {}", token))).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
