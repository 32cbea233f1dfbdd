pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Extension, Router,
};
use eqms_core::error::AppError;
use eqms_core::middleware::{
    rate_limit::ip_rate_limit_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::EqmsConfig;
use crate::middleware::{
    audit_trail, authorize_roles, flexible_auth, require_auth, AuditDescriptor, AuditTrail,
    FieldRef, FlexibleAuth,
};
use crate::services::{AuditRecorder, Database, SessionService, TokenService};

/// Roles permitted to mutate the equipment registry.
pub const EQUIPMENT_WRITERS: &[&str] = &["SUPERUSER", "ADMIN", "MANAGER"];
/// Roles permitted to administer users and roles.
pub const USER_ADMINS: &[&str] = &["SUPERUSER", "ADMIN"];
/// Roles permitted to read the audit trail.
pub const AUDIT_READERS: &[&str] = &["SUPERUSER", "ADMIN", "AUDITOR"];

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::refresh,
        handlers::auth::profile,
        handlers::auth::check_superusers,
        handlers::auth::initial_superuser,
        handlers::equipment::create_equipment,
        handlers::equipment::list_equipment,
        handlers::equipment::get_equipment,
        handlers::equipment::update_equipment,
        handlers::equipment::delete_equipment,
        handlers::users::list_users,
        handlers::users::create_user,
        handlers::users::update_user,
        handlers::users::deactivate_user,
        handlers::users::assign_role,
        handlers::users::remove_role,
        handlers::roles::list_roles,
        handlers::audit::list_audit_log,
        handlers::audit::mint_auditor_token,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::auth::LoginRequest,
            dtos::auth::SessionResponse,
            dtos::auth::SuperusersResponse,
            dtos::auth::InitialSuperuserRequest,
            dtos::auth::InitialSuperuserResponse,
            dtos::auth::MessageResponse,
            dtos::equipment::CreateEquipmentRequest,
            dtos::equipment::UpdateEquipmentRequest,
            dtos::admin::CreateUserRequest,
            dtos::admin::UpdateUserRequest,
            dtos::admin::AssignRoleRequest,
            dtos::admin::CreateAuditorTokenRequest,
            dtos::admin::AuditorTokenResponse,
            dtos::admin::AuditLogPage,
            models::UserResponse,
            models::RoleResponse,
            models::EquipmentResponse,
            models::equipment::EquipmentStatus,
            models::AuditLogResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login, refresh, and session management"),
        (name = "Equipment", description = "Equipment registry"),
        (name = "Users", description = "User and role administration"),
        (name = "Roles", description = "Role reference data"),
        (name = "Audit", description = "Audit trail and auditor access"),
        (name = "Observability", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: EqmsConfig,
    pub db: Database,
    pub tokens: TokenService,
    pub sessions: SessionService,
    pub audit: AuditRecorder,
    pub flexible: FlexibleAuth,
    pub trail: AuditTrail,
    pub login_rate_limiter: eqms_core::middleware::rate_limit::IpRateLimiter,
}

pub fn build_router(state: AppState) -> Router {
    // Login gets its own IP rate limit
    let login_route = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(
            state.login_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let mut public = Router::new()
        .route("/health", get(health_check))
        .route(
            "/auth/check-superusers",
            get(handlers::auth::check_superusers),
        )
        .route(
            "/auth/initial-superuser",
            post(handlers::auth::initial_superuser),
        )
        .merge(login_route);

    let swagger_enabled = match state.config.environment {
        config::Environment::Dev => true,
        config::Environment::Prod => state.config.swagger.enabled == config::SwaggerMode::Public,
    };

    if swagger_enabled {
        public = public
            .merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        public = public.route(
            "/.well-known/openapi.json",
            get(|| async { axum::Json(ApiDoc::openapi()) }),
        );
    }

    // Session-only routes without role restrictions
    let session_routes = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/profile", get(handlers::auth::profile))
        .route("/roles", get(handlers::roles::list_roles))
        .layer(from_fn_with_state(state.tokens.clone(), require_auth));

    // Mutating and admin routes: authenticated, role-gated per route,
    // and recorded by the audit trail
    let equipment_mutations = Router::new()
        .route("/equipment", post(handlers::equipment::create_equipment))
        .route_layer(Extension(AuditDescriptor::from_body(
            "equipment",
            "serialNumber",
        )))
        .merge(
            Router::new()
                .route(
                    "/equipment/:id",
                    put(handlers::equipment::update_equipment)
                        .delete(handlers::equipment::delete_equipment),
                )
                .route_layer(Extension(
                    AuditDescriptor::from_path("equipment", "id")
                        .with_identifier(FieldRef::ResponseField("serialNumber")),
                )),
        )
        .route_layer(from_fn(|req, next| {
            authorize_roles(req, next, EQUIPMENT_WRITERS)
        }));

    let user_admin = Router::new()
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route_layer(Extension(AuditDescriptor::from_body("user", "email")))
        .merge(
            Router::new()
                .route(
                    "/users/:id",
                    put(handlers::users::update_user).delete(handlers::users::deactivate_user),
                )
                .route("/users/:id/roles", post(handlers::users::assign_role))
                .route(
                    "/users/:id/roles/:role_id",
                    delete(handlers::users::remove_role),
                )
                .route_layer(Extension(
                    AuditDescriptor::from_path("user", "id")
                        .with_identifier(FieldRef::ResponseField("email")),
                )),
        )
        .route_layer(from_fn(|req, next| authorize_roles(req, next, USER_ADMINS)));

    let audit_routes = Router::new()
        .route("/audit-log", get(handlers::audit::list_audit_log))
        .route_layer(from_fn(|req, next| {
            authorize_roles(req, next, AUDIT_READERS)
        }))
        .merge(
            Router::new()
                .route(
                    "/auditor-tokens",
                    post(handlers::audit::mint_auditor_token),
                )
                .route_layer(Extension(
                    AuditDescriptor::named("auditor_token")
                        .with_identifier(FieldRef::ResponseField("subject")),
                ))
                .route_layer(from_fn(|req, next| {
                    authorize_roles(req, next, USER_ADMINS)
                })),
        );

    let staff_routes = Router::new()
        .merge(equipment_mutations)
        .merge(user_admin)
        .merge(audit_routes)
        .layer(from_fn_with_state(state.trail.clone(), audit_trail))
        .layer(from_fn_with_state(state.tokens.clone(), require_auth));

    // Read-only equipment surface: regular sessions or scoped auditor
    // tokens, dispatched by authorization scheme
    let flexible_routes = Router::new()
        .route("/equipment", get(handlers::equipment::list_equipment))
        .route("/equipment/:id", get(handlers::equipment::get_equipment))
        .layer(from_fn_with_state(state.flexible.clone(), flexible_auth));

    public
        .merge(session_routes)
        .merge(staff_routes)
        .merge(flexible_routes)
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .map(|o| {
                            o.parse::<axum::http::HeaderValue>().unwrap_or_else(|e| {
                                tracing::error!(
                                    "Invalid CORS origin '{}': {}. Using fallback.",
                                    o,
                                    e
                                );
                                axum::http::HeaderValue::from_static("http://localhost:3000")
                            })
                        })
                        .collect::<Vec<axum::http::HeaderValue>>(),
                )
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::PATCH,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                ]),
        )
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "Service is unhealthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<axum::Json<serde_json::Value>, AppError> {
    state.db.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Database health check failed");
        e
    })?;

    Ok(axum::Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "checks": {
            "database": "up"
        }
    })))
}
