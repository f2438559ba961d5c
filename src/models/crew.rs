// src/models/crew.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub company_id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    // Driver, funeral director, ...
    pub position: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    pub company_id: String,
    #[serde(alias = "licensePlate")]
    pub plate_number: String,
    #[serde(rename = "type")]
    pub vehicle_type: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub last_inspection: Option<String>,
}

/// Who the company sends to the checkpoint, shown next to a verdict so the
/// operator can compare it with the people and hearse at the door.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Crew {
    pub employee: Option<Employee>,
    pub vehicle: Option<Vehicle>,
}
