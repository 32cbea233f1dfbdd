//! Audit log model - append-only compliance trail.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Persisted audit log entry. Rows are never mutated or deleted through
/// the API.
#[derive(Debug, Clone, FromRow)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub action_category: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub entity_identifier: Option<String>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub success: bool,
    pub error_message: Option<String>,
    pub status_code: i32,
}

/// A record waiting to be written by the audit sink.
#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub action_category: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub entity_identifier: Option<String>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub success: bool,
    pub error_message: Option<String>,
    pub status_code: i32,
}

impl NewAuditLog {
    /// Entry for a mutation against a business entity.
    #[allow(clippy::too_many_arguments)]
    pub fn mutation(
        actor_id: Option<Uuid>,
        action: &str,
        action_category: &str,
        entity_type: &str,
        entity_id: Option<Uuid>,
        entity_identifier: Option<String>,
        success: bool,
        error_message: Option<String>,
        status_code: i32,
    ) -> Self {
        Self {
            actor_id,
            action: action.to_string(),
            action_category: action_category.to_string(),
            entity_type: Some(entity_type.to_string()),
            entity_id,
            entity_identifier,
            old_values: None,
            new_values: None,
            success,
            error_message,
            status_code,
        }
    }

    /// Entry for an authentication event (login, logout, refresh).
    pub fn auth_event(
        actor_id: Option<Uuid>,
        action: &str,
        identifier: Option<String>,
        success: bool,
        error_message: Option<String>,
        status_code: i32,
    ) -> Self {
        Self {
            actor_id,
            action: action.to_string(),
            action_category: "auth".to_string(),
            entity_type: Some("user".to_string()),
            entity_id: actor_id,
            entity_identifier: identifier,
            old_values: None,
            new_values: None,
            success,
            error_message,
            status_code,
        }
    }

    pub fn with_values(
        mut self,
        old_values: Option<serde_json::Value>,
        new_values: Option<serde_json::Value>,
    ) -> Self {
        self.old_values = old_values;
        self.new_values = new_values;
        self
    }
}

/// Audit log entry as returned by the query endpoint.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogResponse {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub actor_id: Option<Uuid>,
    #[schema(example = "update")]
    pub action: String,
    #[schema(example = "equipment")]
    pub action_category: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub entity_identifier: Option<String>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub success: bool,
    pub error_message: Option<String>,
    pub status_code: i32,
}

impl From<AuditLogEntry> for AuditLogResponse {
    fn from(e: AuditLogEntry) -> Self {
        Self {
            id: e.id,
            timestamp: e.timestamp,
            actor_id: e.actor_id,
            action: e.action,
            action_category: e.action_category,
            entity_type: e.entity_type,
            entity_id: e.entity_id,
            entity_identifier: e.entity_identifier,
            old_values: e.old_values,
            new_values: e.new_values,
            success: e.success,
            error_message: e.error_message,
            status_code: e.status_code,
        }
    }
}
