use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use eqms_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::equipment::{CreateEquipmentRequest, UpdateEquipmentRequest},
    dtos::ErrorResponse,
    middleware::{CurrentPrincipal, CurrentUser, Principal},
    models::{EquipmentResponse, EquipmentStatus},
    services::database::{EquipmentChanges, NewEquipment},
    utils::ValidatedJson,
    AppState,
};

/// Register a piece of equipment
#[utoipa::path(
    post,
    path = "/equipment",
    request_body = CreateEquipmentRequest,
    responses(
        (status = 201, description = "Equipment created", body = EquipmentResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = ErrorResponse),
        (status = 409, description = "Serial number already registered", body = ErrorResponse)
    ),
    tag = "Equipment",
    security(("bearer_auth" = []))
)]
pub async fn create_equipment(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<CreateEquipmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Validation has already rejected absent required fields
    let (Some(name), Some(serial_number), Some(location)) =
        (req.name, req.serial_number, req.location)
    else {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Missing required fields"
        )));
    };

    let equipment = state
        .db
        .insert_equipment(&NewEquipment {
            name,
            serial_number,
            location,
            department: req.department,
            status: EquipmentStatus::InService.as_str().to_string(),
            created_by: Some(user.0.sub),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(EquipmentResponse::from(equipment)),
    ))
}

/// List equipment. Auditor tokens see only the equipment in their scope.
#[utoipa::path(
    get,
    path = "/equipment",
    responses(
        (status = 200, description = "Equipment list", body = [EquipmentResponse]),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Equipment"
)]
pub async fn list_equipment(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
) -> Result<impl IntoResponse, AppError> {
    let equipment = match &principal.0 {
        Principal::User(_) => state.db.list_equipment().await?,
        Principal::Auditor(claims) => state.db.list_equipment_by_ids(&claims.scope).await?,
    };

    let equipment: Vec<EquipmentResponse> =
        equipment.into_iter().map(EquipmentResponse::from).collect();

    Ok(Json(equipment))
}

/// Fetch one piece of equipment
#[utoipa::path(
    get,
    path = "/equipment/{id}",
    responses(
        (status = 200, description = "Equipment", body = EquipmentResponse),
        (status = 403, description = "Outside auditor scope", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "Equipment"
)]
pub async fn get_equipment(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    // Scope is checked before the lookup so an out-of-scope auditor
    // cannot probe which ids exist
    if !principal.0.may_read_equipment(id) {
        return Err(AppError::Forbidden(
            "Access denied: resource outside auditor scope".to_string(),
        ));
    }

    let equipment = state
        .db
        .find_equipment_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Equipment not found")))?;

    Ok(Json(EquipmentResponse::from(equipment)))
}

/// Update a piece of equipment
#[utoipa::path(
    put,
    path = "/equipment/{id}",
    request_body = UpdateEquipmentRequest,
    responses(
        (status = 200, description = "Equipment updated", body = EquipmentResponse),
        (status = 403, description = "Insufficient permissions", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "Equipment",
    security(("bearer_auth" = []))
)]
pub async fn update_equipment(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateEquipmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let equipment = state
        .db
        .update_equipment(
            id,
            &EquipmentChanges {
                name: req.name,
                location: req.location,
                department: req.department,
                status: req.status.map(|s| s.as_str().to_string()),
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Equipment not found")))?;

    Ok(Json(EquipmentResponse::from(equipment)))
}

/// Remove a piece of equipment from the registry
#[utoipa::path(
    delete,
    path = "/equipment/{id}",
    responses(
        (status = 204, description = "Equipment deleted"),
        (status = 403, description = "Insufficient permissions", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "Equipment",
    security(("bearer_auth" = []))
)]
pub async fn delete_equipment(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.delete_equipment(id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!("Equipment not found")));
    }

    Ok(StatusCode::NO_CONTENT)
}
