// src/models/case.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "case_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Active,
    Pending,
    Closed,
}

// A deceased-person case handled by a funeral company
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: String,
    pub company_id: String,
    pub deceased_name: String,
    // Kept as the text the company entered (YYYY-MM-DD in practice)
    pub date: String,
    #[serde(default)]
    pub location: String,
    pub status: CaseStatus,
    #[serde(default)]
    pub permits: Vec<String>,
}
