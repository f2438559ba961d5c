// src/db.rs
//
// Storage seams. Services only see these traits; the backend behind them is
// either the bundled fixtures (memory) or Postgres.

use async_trait::async_trait;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::{
    auth::User,
    case::Case,
    company::{AuthorizationStatus, Company},
    crew::Crew,
    validation::ValidationDecision,
};

pub mod fixtures;
pub mod memory;
pub mod case_repo;
pub mod company_repo;
pub mod crew_repo;
pub mod decision_repo;
pub mod user_repo;

pub use case_repo::CaseRepository;
pub use company_repo::CompanyRepository;
pub use crew_repo::CrewRepository;
pub use decision_repo::DecisionRepository;
pub use fixtures::Fixtures;
pub use memory::MemoryStore;
pub use user_repo::UserRepository;

/// Authoritative company records. Status is read from here at decision time,
/// never from a token.
#[async_trait]
pub trait CompanyRegistry: Send + Sync {
    async fn get(&self, company_id: &str) -> Result<Option<Company>, AppError>;
    async fn list(&self) -> Result<Vec<Company>, AppError>;
    /// Registers the company together with its administrator login. Neither
    /// is kept if the other is refused.
    async fn create(&self, company: Company, admin: User) -> Result<Company, AppError>;
    async fn set_status(
        &self,
        company_id: &str,
        status: AuthorizationStatus,
    ) -> Result<Company, AppError>;
}

#[async_trait]
pub trait CaseRegistry: Send + Sync {
    async fn get(&self, case_id: &str) -> Result<Option<Case>, AppError>;
    async fn list_for_company(&self, company_id: &str) -> Result<Vec<Case>, AppError>;
}

/// Staff and vehicles on file for a company. Display only; never part of a
/// validation outcome.
#[async_trait]
pub trait CrewRegistry: Send + Sync {
    /// First employee and first vehicle on file for the company.
    async fn crew_for(&self, company_id: &str) -> Result<Crew, AppError>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
}

/// Append-only history of validation outcomes.
#[async_trait]
pub trait DecisionLog: Send + Sync {
    /// Appends. Never replaces an earlier entry, even one with the same case and timestamp.
    async fn record(&self, decision: ValidationDecision) -> Result<(), AppError>;
    /// Every decision for the case, newest first.
    async fn list_for(&self, case_id: &str) -> Result<Vec<ValidationDecision>, AppError>;
    /// Latest decisions across all cases, newest first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<ValidationDecision>, AppError>;
}
