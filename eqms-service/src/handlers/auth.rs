use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use eqms_core::error::AppError;

use crate::{
    dtos::auth::{
        InitialSuperuserRequest, InitialSuperuserResponse, LoginRequest, MessageResponse,
        SessionResponse, SuperusersResponse,
    },
    dtos::ErrorResponse,
    middleware::CurrentUser,
    models::UserResponse,
    utils::ValidatedJson,
    AppState,
};

/// Login with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = SessionResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.sessions.login(req).await?;
    Ok((StatusCode::OK, Json(res)))
}

/// Logout. Purely declarative: the token stays valid until expiry and
/// the client discards it.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
pub async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.logout(&user.0).await;
    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    ))
}

/// Re-mint a token from the identity's current state and role set
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Token refreshed", body = SessionResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Identity deactivated or removed", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
pub async fn refresh(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let res = state.sessions.refresh(&user.0).await?;
    Ok((StatusCode::OK, Json(res)))
}

/// Profile of the authenticated identity
#[utoipa::path(
    get,
    path = "/auth/profile",
    responses(
        (status = 200, description = "Profile", body = UserResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Identity deactivated or removed", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
pub async fn profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let res = state.sessions.profile(user.0.sub).await?;
    Ok(Json(res))
}

/// Whether any superuser exists yet (drives first-run setup in the SPA)
#[utoipa::path(
    get,
    path = "/auth/check-superusers",
    responses((status = 200, description = "Superuser presence", body = SuperusersResponse)),
    tag = "Authentication"
)]
pub async fn check_superusers(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let has_superusers = state.sessions.has_superusers().await?;
    Ok(Json(SuperusersResponse { has_superusers }))
}

/// Bootstrap the first superuser account
#[utoipa::path(
    post,
    path = "/auth/initial-superuser",
    request_body = InitialSuperuserRequest,
    responses(
        (status = 201, description = "Superuser created", body = InitialSuperuserResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 403, description = "A superuser already exists", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn initial_superuser(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<InitialSuperuserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = state.sessions.create_initial_superuser(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(InitialSuperuserResponse { user_id }),
    ))
}
