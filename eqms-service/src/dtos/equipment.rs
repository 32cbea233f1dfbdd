use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

/// Required fields are `Option` so that an absent field surfaces as a
/// named validation error rather than a deserialization failure.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEquipmentRequest {
    #[validate(required(message = "name is required"))]
    #[schema(example = "Torque wrench")]
    pub name: Option<String>,

    #[validate(required(message = "serialNumber is required"))]
    #[schema(example = "TW-0042")]
    pub serial_number: Option<String>,

    #[validate(required(message = "location is required"))]
    #[schema(example = "Lab 3, cabinet B")]
    pub location: Option<String>,

    pub department: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEquipmentRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,

    #[validate(length(min = 1, message = "location must not be empty"))]
    pub location: Option<String>,

    pub department: Option<String>,

    pub status: Option<crate::models::EquipmentStatus>,
}
