use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use eqms_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::admin::{AssignRoleRequest, CreateUserRequest, UpdateUserRequest},
    dtos::auth::MessageResponse,
    dtos::ErrorResponse,
    middleware::{AuditHandled, CurrentUser},
    models::{Role, UserResponse},
    services::database::{NewUser, UserChanges},
    utils::{hash_password, Password, ValidatedJson},
    AppState,
};

/// List users
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "User list", body = [UserResponse]),
        (status = 403, description = "Insufficient permissions", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let users = state.db.list_users().await?;

    let mut responses = Vec::with_capacity(users.len());
    for user in users {
        let roles = state.db.active_roles_for_user(user.id).await?;
        responses.push(UserResponse::from_user(user, &roles));
    }

    Ok(Json(responses))
}

/// Create a user
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let password_hash =
        hash_password(&Password::new(req.password)).map_err(AppError::InternalError)?;

    let user = state
        .db
        .insert_user(&NewUser {
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            department: req.department,
            password_hash,
            must_change_password: true,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse::from_user(user, &[])),
    ))
}

/// Update a user's profile or active flag
#[utoipa::path(
    put,
    path = "/users/{id}",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .db
        .update_user(
            id,
            &UserChanges {
                first_name: req.first_name,
                last_name: req.last_name,
                department: req.department,
                active: req.active,
                must_change_password: req.must_change_password,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    let roles = state.db.active_roles_for_user(user.id).await?;

    Ok(Json(UserResponse::from_user(user, &roles)))
}

/// Deactivate a user. Identities are soft-deleted and never removed.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    responses(
        (status = 200, description = "User deactivated", body = MessageResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn deactivate_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.deactivate_user(id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!("User not found")));
    }

    Ok(Json(MessageResponse {
        message: "User deactivated".to_string(),
    }))
}

/// Assign a role to a user.
///
/// Superuser-flagged roles may only be granted by a caller who already
/// holds one; the check runs against the database, not the caller's
/// token.
#[utoipa::path(
    post,
    path = "/users/{id}/roles",
    request_body = AssignRoleRequest,
    responses(
        (status = 200, description = "Role assigned", body = MessageResponse),
        (status = 403, description = "Superuser role requires a superuser caller", body = ErrorResponse),
        (status = 404, description = "User or role not found", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn assign_role(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<AssignRoleRequest>,
) -> Result<Response, AppError> {
    let role = state
        .db
        .find_role_by_id(req.role_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Role not found")))?;

    guard_superuser_role(&state, &caller, &role, "assign").await?;

    let user = state
        .db
        .find_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    let old_roles = role_names(&state.db.active_roles_for_user(user.id).await?);

    state
        .db
        .assign_role(user.id, role.id, caller.0.sub, req.expires_at)
        .await?;

    let new_roles = role_names(&state.db.active_roles_for_user(user.id).await?);

    state.audit.log_update(
        Some(caller.0.sub),
        "user",
        Some(user.id),
        Some(user.email.clone()),
        Some(serde_json::json!({ "roles": old_roles })),
        Some(serde_json::json!({ "roles": new_roles })),
    );

    Ok(handled(Json(MessageResponse {
        message: format!("Role {} assigned", role.name),
    })))
}

/// Remove a role from a user. Same superuser invariant as assignment.
#[utoipa::path(
    delete,
    path = "/users/{id}/roles/{role_id}",
    params(
        ("id" = Uuid, Path, description = "User id"),
        ("role_id" = Uuid, Path, description = "Role id")
    ),
    responses(
        (status = 200, description = "Role removed", body = MessageResponse),
        (status = 403, description = "Superuser role requires a superuser caller", body = ErrorResponse),
        (status = 404, description = "User, role, or assignment not found", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn remove_role(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path((id, role_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, AppError> {
    let role = state
        .db
        .find_role_by_id(role_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Role not found")))?;

    guard_superuser_role(&state, &caller, &role, "remove").await?;

    let user = state
        .db
        .find_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    let old_roles = role_names(&state.db.active_roles_for_user(user.id).await?);

    if !state.db.remove_role(user.id, role.id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Role assignment not found"
        )));
    }

    let new_roles = role_names(&state.db.active_roles_for_user(user.id).await?);

    state.audit.log_update(
        Some(caller.0.sub),
        "user",
        Some(user.id),
        Some(user.email.clone()),
        Some(serde_json::json!({ "roles": old_roles })),
        Some(serde_json::json!({ "roles": new_roles })),
    );

    Ok(handled(Json(MessageResponse {
        message: format!("Role {} removed", role.name),
    })))
}

async fn guard_superuser_role(
    state: &AppState,
    caller: &CurrentUser,
    role: &Role,
    verb: &str,
) -> Result<(), AppError> {
    if role.is_super_user && !state.db.user_has_superuser_role(caller.0.sub).await? {
        tracing::warn!(
            caller_id = %caller.0.sub,
            role = %role.name,
            "Non-superuser attempted to manage a superuser role"
        );
        return Err(AppError::Forbidden(format!(
            "Only a superuser may {} a superuser role",
            verb
        )));
    }
    Ok(())
}

fn role_names(roles: &[Role]) -> Vec<String> {
    roles.iter().map(|r| r.name.clone()).collect()
}

/// Wrap a body and mark the response as already audited so the trail
/// middleware does not record it a second time.
fn handled(body: impl IntoResponse) -> Response {
    let mut res = body.into_response();
    res.extensions_mut().insert(AuditHandled);
    res
}
