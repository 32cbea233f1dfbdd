//! Role model - static reference data plus user assignments.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Role entity. Seeded reference data; `is_super_user` marks roles that
/// only another superuser may assign or remove.
#[derive(Debug, Clone, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub is_super_user: bool,
    pub created_at: DateTime<Utc>,
}

/// User-role assignment. Removal deactivates the row rather than
/// deleting it, preserving assignment history.
#[derive(Debug, Clone, FromRow)]
pub struct UserRole {
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub assigned_by: Option<Uuid>,
    pub assigned_at: DateTime<Utc>,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Role response for the API.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleResponse {
    pub id: Uuid,
    #[schema(example = "ADMIN")]
    pub name: String,
    pub display_name: String,
    pub is_super_user: bool,
}

impl From<Role> for RoleResponse {
    fn from(r: Role) -> Self {
        Self {
            id: r.id,
            name: r.name,
            display_name: r.display_name,
            is_super_user: r.is_super_user,
        }
    }
}
