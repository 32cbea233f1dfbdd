//! Common test utilities for eqms-service integration tests.

use axum::body::Body;
use axum::response::Response;
use chrono::{Duration, Utc};
use eqms_service::config::TokenConfig;
use eqms_service::models::{Role, User};
use eqms_service::services::TokenService;
use http_body_util::BodyExt;
use std::sync::Once;
use uuid::Uuid;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,eqms_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Token service with the given session TTL; auditor tokens get the
/// same TTL so expiry paths are testable on both schemes.
pub fn token_service_with_ttl(session_ttl: Duration, auditor_ttl: Duration) -> TokenService {
    TokenService::new(&TokenConfig {
        jwt_secret: "integration-test-session-secret".to_string(),
        jwt_expires_in: session_ttl,
        auditor_secret: "integration-test-auditor-secret".to_string(),
        auditor_expires_in: auditor_ttl,
    })
}

pub fn token_service() -> TokenService {
    token_service_with_ttl(Duration::hours(1), Duration::hours(1))
}

pub fn sample_user() -> User {
    User {
        id: Uuid::new_v4(),
        email: "inspector@example.com".to_string(),
        first_name: "Imke".to_string(),
        last_name: "Voss".to_string(),
        department: Some("Quality".to_string()),
        active: true,
        must_change_password: false,
        password_hash: "unused".to_string(),
        last_login_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn role(name: &str) -> Role {
    Role {
        id: Uuid::new_v4(),
        name: name.to_string(),
        display_name: name.to_string(),
        is_super_user: name == "SUPERUSER",
        created_at: Utc::now(),
    }
}

/// Issue a session token for a fresh user holding the given roles.
pub fn session_token(tokens: &TokenService, role_names: &[&str]) -> String {
    let roles: Vec<Role> = role_names.iter().map(|n| role(n)).collect();
    tokens
        .issue_session(&sample_user(), &roles)
        .expect("failed to issue test token")
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body was not valid JSON")
}
