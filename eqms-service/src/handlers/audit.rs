//! Audit log query endpoint and auditor token issuance.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use eqms_core::error::AppError;

use crate::{
    dtos::admin::{AuditLogPage, AuditLogQuery, AuditorTokenResponse, CreateAuditorTokenRequest},
    dtos::ErrorResponse,
    models::AuditLogResponse,
    services::database::AuditLogFilter,
    utils::ValidatedJson,
    AppState,
};

/// Query the append-only audit trail with filters and pagination
#[utoipa::path(
    get,
    path = "/audit-log",
    responses(
        (status = 200, description = "Audit log page", body = AuditLogPage),
        (status = 403, description = "Insufficient permissions", body = ErrorResponse)
    ),
    tag = "Audit",
    security(("bearer_auth" = []))
)]
pub async fn list_audit_log(
    State(state): State<AppState>,
    Query(query): Query<AuditLogQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query.limit.clamp(1, 1000);
    let offset = query.offset.max(0);

    let (entries, total) = state
        .db
        .query_audit_logs(&AuditLogFilter {
            actor_id: query.actor_id,
            action: query.action,
            entity_type: query.entity_type,
            entity_id: query.entity_id,
            from_utc: query.from_utc,
            to_utc: query.to_utc,
            limit,
            offset,
        })
        .await?;

    let entries: Vec<AuditLogResponse> =
        entries.into_iter().map(AuditLogResponse::from).collect();

    Ok(Json(AuditLogPage {
        entries,
        total,
        limit,
        offset,
    }))
}

/// Mint a time-boxed, read-only auditor token scoped to specific
/// equipment ids. Nothing is persisted; validity is cryptographic.
#[utoipa::path(
    post,
    path = "/auditor-tokens",
    request_body = CreateAuditorTokenRequest,
    responses(
        (status = 201, description = "Auditor token issued", body = AuditorTokenResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = ErrorResponse)
    ),
    tag = "Audit",
    security(("bearer_auth" = []))
)]
pub async fn mint_auditor_token(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateAuditorTokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ttl = req.expires_in_hours.map(chrono::Duration::hours);

    let (token, expires_at) = state
        .tokens
        .issue_auditor(&req.subject, req.equipment_ids, ttl)
        .map_err(AppError::InternalError)?;

    tracing::info!(subject = %req.subject, expires_at = %expires_at, "Auditor token issued");

    Ok((
        StatusCode::CREATED,
        Json(AuditorTokenResponse {
            token,
            subject: req.subject,
            expires_at,
        }),
    ))
}
