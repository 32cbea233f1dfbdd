use axum::{extract::State, response::IntoResponse, Json};
use eqms_core::error::AppError;

use crate::{dtos::ErrorResponse, models::RoleResponse, AppState};

/// List the role reference data
#[utoipa::path(
    get,
    path = "/roles",
    responses(
        (status = 200, description = "Roles", body = [RoleResponse]),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn list_roles(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let roles = state.db.list_roles().await?;
    let roles: Vec<RoleResponse> = roles.into_iter().map(RoleResponse::from).collect();
    Ok(Json(roles))
}
