//! Equipment model - the registry's protected resource.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Equipment lifecycle states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    InService,
    UnderMaintenance,
    Retired,
}

impl EquipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentStatus::InService => "in_service",
            EquipmentStatus::UnderMaintenance => "under_maintenance",
            EquipmentStatus::Retired => "retired",
        }
    }
}

/// Equipment entity.
#[derive(Debug, Clone, FromRow)]
pub struct Equipment {
    pub id: Uuid,
    pub name: String,
    pub serial_number: String,
    pub location: String,
    pub department: Option<String>,
    pub status: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Equipment response for the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentResponse {
    pub id: Uuid,
    #[schema(example = "Torque wrench")]
    pub name: String,
    #[schema(example = "TW-0042")]
    pub serial_number: String,
    #[schema(example = "Lab 3, cabinet B")]
    pub location: String,
    pub department: Option<String>,
    #[schema(example = "in_service")]
    pub status: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Equipment> for EquipmentResponse {
    fn from(e: Equipment) -> Self {
        Self {
            id: e.id,
            name: e.name,
            serial_number: e.serial_number,
            location: e.location,
            department: e.department,
            status: e.status,
            created_by: e.created_by,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}
