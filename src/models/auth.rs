// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// ---
// Roles and capabilities
// ---

/// Closed set of platform roles. Adding a role forces every capability
/// `match` below to be revisited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum Role {
    GlobalAdmin,
    Validator {
        // Checkpoint the validator works at (e.g. a hospital morgue)
        location: Option<String>,
    },
    FuneralCompanyAdmin {
        company_id: String,
    },
}

/// What a role is allowed to do on the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ManageCompanies,
    IssueTokens,
    ValidatePickups,
    ViewValidationHistory,
}

impl Capability {
    pub fn slug(self) -> &'static str {
        match self {
            Capability::ManageCompanies => "companies:manage",
            Capability::IssueTokens => "tokens:issue",
            Capability::ValidatePickups => "pickups:validate",
            Capability::ViewValidationHistory => "validations:read",
        }
    }
}

impl Role {
    pub fn can(&self, capability: Capability) -> bool {
        match (self, capability) {
            (Role::GlobalAdmin, Capability::ManageCompanies) => true,
            (Role::GlobalAdmin, Capability::ViewValidationHistory) => true,
            (Role::GlobalAdmin, Capability::IssueTokens | Capability::ValidatePickups) => false,

            (Role::Validator { .. }, Capability::ValidatePickups) => true,
            (Role::Validator { .. }, Capability::ViewValidationHistory) => true,
            (Role::Validator { .. }, Capability::ManageCompanies | Capability::IssueTokens) => false,

            (Role::FuneralCompanyAdmin { .. }, Capability::IssueTokens) => true,
            (
                Role::FuneralCompanyAdmin { .. },
                Capability::ManageCompanies
                | Capability::ValidatePickups
                | Capability::ViewValidationHistory,
            ) => false,
        }
    }

    /// The company a funeral-company admin acts for.
    pub fn company_id(&self) -> Option<&str> {
        match self {
            Role::FuneralCompanyAdmin { company_id } => Some(company_id),
            Role::GlobalAdmin | Role::Validator { .. } => None,
        }
    }

    pub fn kind(&self) -> RoleKind {
        match self {
            Role::GlobalAdmin => RoleKind::GlobalAdmin,
            Role::Validator { .. } => RoleKind::Validator,
            Role::FuneralCompanyAdmin { .. } => RoleKind::FuneralCompanyAdmin,
        }
    }
}

// Maps the `user_role` enum in Postgres
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleKind {
    GlobalAdmin,
    Validator,
    FuneralCompanyAdmin,
}

// ---
// Users
// ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,

    #[serde(skip_serializing)]
    pub password_hash: String,

    #[serde(flatten)]
    pub role: Role,

    pub created_at: DateTime<Utc>,
}

// Flat row as stored in the `users` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: RoleKind,
    pub company_id: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = match row.role {
            RoleKind::GlobalAdmin => Role::GlobalAdmin,
            RoleKind::Validator => Role::Validator { location: row.location },
            RoleKind::FuneralCompanyAdmin => Role::FuneralCompanyAdmin {
                company_id: row.company_id.ok_or_else(|| {
                    anyhow::anyhow!("user {} is a company admin without company_id", row.id)
                })?,
            },
        };

        Ok(User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
        })
    }
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate)]
pub struct LoginUserPayload {
    #[validate(email(message = "invalid_email"))]
    pub email: String,
    #[validate(length(min = 1, message = "required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

// Claims carried inside the session JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // User id
    pub exp: usize, // Expiration time
    pub iat: usize, // Issued at
}
