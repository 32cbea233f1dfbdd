//! User model - registered identities.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Role;

/// User entity. Deactivation is a soft delete (`active = false`); rows
/// are never removed through the API.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub department: Option<String>,
    pub active: bool,
    pub must_change_password: bool,
    pub password_hash: String,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User response for the API. The password hash is excluded
/// unconditionally.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    #[schema(example = "user@example.com")]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub department: Option<String>,
    pub active: bool,
    pub must_change_password: bool,
    pub roles: Vec<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    /// Sanitized view of a user together with their active role names.
    pub fn from_user(user: User, roles: &[Role]) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            department: user.department,
            active: user.active,
            must_change_password: user.must_change_password,
            roles: roles.iter().map(|r| r.name.clone()).collect(),
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}
