//! In-memory backend seeded from the fixtures bundled under `data/`.
//!
//! Used for local development, demos on a checkpoint laptop without a
//! database, and tests. Nothing survives a restart.
//!
//! Every collection sits behind its own `tokio::sync::RwLock`. The decision
//! log is a plain `Vec` that is only ever pushed to, so insertion order is
//! the order decisions were recorded in.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CaseRegistry, CompanyRegistry, CrewRegistry, DecisionLog, Fixtures, UserDirectory};
use crate::common::error::AppError;
use crate::models::{
    auth::User,
    case::Case,
    company::{AuthorizationStatus, Company},
    crew::{Crew, Employee, Vehicle},
    validation::ValidationDecision,
};

#[derive(Clone, Default)]
pub struct MemoryStore {
    companies: Arc<RwLock<HashMap<String, Company>>>,
    cases: Arc<RwLock<HashMap<String, Case>>>,
    // Keyed by lowercased email
    users: Arc<RwLock<HashMap<String, User>>>,
    employees: Arc<RwLock<Vec<Employee>>>,
    vehicles: Arc<RwLock<Vec<Vehicle>>>,
    decisions: Arc<RwLock<Vec<ValidationDecision>>>,
}

impl MemoryStore {
    pub fn new(companies: Vec<Company>, cases: Vec<Case>, users: Vec<User>) -> Self {
        Self {
            companies: Arc::new(RwLock::new(
                companies.into_iter().map(|c| (c.id.clone(), c)).collect(),
            )),
            cases: Arc::new(RwLock::new(
                cases.into_iter().map(|c| (c.id.clone(), c)).collect(),
            )),
            users: Arc::new(RwLock::new(
                users
                    .into_iter()
                    .map(|u| (u.email.to_lowercase(), u))
                    .collect(),
            )),
            ..Self::default()
        }
    }

    /// Staff and vehicles, kept in the order given.
    pub fn with_crew(self, employees: Vec<Employee>, vehicles: Vec<Vehicle>) -> Self {
        Self {
            employees: Arc::new(RwLock::new(employees)),
            vehicles: Arc::new(RwLock::new(vehicles)),
            ..self
        }
    }

    /// Loads the bundled fixtures. All demo logins share `demo_password`.
    pub fn seeded(demo_password: &str, bcrypt_cost: u32) -> anyhow::Result<Self> {
        let fixtures = Fixtures::load(demo_password, bcrypt_cost)?;

        tracing::info!(
            "Memory store seeded: {} companies, {} cases, {} users",
            fixtures.companies.len(),
            fixtures.cases.len(),
            fixtures.users.len()
        );

        Ok(Self::new(fixtures.companies, fixtures.cases, fixtures.users)
            .with_crew(fixtures.employees, fixtures.vehicles))
    }
}

#[async_trait]
impl CompanyRegistry for MemoryStore {
    async fn get(&self, company_id: &str) -> Result<Option<Company>, AppError> {
        Ok(self.companies.read().await.get(company_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Company>, AppError> {
        let mut companies: Vec<Company> = self.companies.read().await.values().cloned().collect();
        companies.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(companies)
    }

    async fn create(&self, company: Company, admin: User) -> Result<Company, AppError> {
        // Lock order: companies, then users
        let mut companies = self.companies.write().await;
        let mut users = self.users.write().await;

        if companies.contains_key(&company.id) {
            return Err(AppError::CompanyAlreadyExists(company.id));
        }
        let email_taken = companies
            .values()
            .any(|c| c.email.eq_ignore_ascii_case(&company.email))
            || users.contains_key(&admin.email.to_lowercase());
        if email_taken {
            return Err(AppError::CompanyAlreadyExists(company.email));
        }

        users.insert(admin.email.to_lowercase(), admin);
        companies.insert(company.id.clone(), company.clone());
        Ok(company)
    }

    async fn set_status(
        &self,
        company_id: &str,
        status: AuthorizationStatus,
    ) -> Result<Company, AppError> {
        let mut companies = self.companies.write().await;
        let company = companies
            .get_mut(company_id)
            .ok_or_else(|| AppError::CompanyNotFound(company_id.to_string()))?;
        company.status = status;
        Ok(company.clone())
    }
}

#[async_trait]
impl CaseRegistry for MemoryStore {
    async fn get(&self, case_id: &str) -> Result<Option<Case>, AppError> {
        Ok(self.cases.read().await.get(case_id).cloned())
    }

    async fn list_for_company(&self, company_id: &str) -> Result<Vec<Case>, AppError> {
        let mut cases: Vec<Case> = self
            .cases
            .read()
            .await
            .values()
            .filter(|c| c.company_id == company_id)
            .cloned()
            .collect();
        cases.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(cases)
    }
}

#[async_trait]
impl CrewRegistry for MemoryStore {
    async fn crew_for(&self, company_id: &str) -> Result<Crew, AppError> {
        let employee = self
            .employees
            .read()
            .await
            .iter()
            .find(|e| e.company_id == company_id)
            .cloned();
        let vehicle = self
            .vehicles
            .read()
            .await
            .iter()
            .find(|v| v.company_id == company_id)
            .cloned();
        Ok(Crew { employee, vehicle })
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(&email.to_lowercase()).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.values().find(|u| u.id == id).cloned())
    }
}

#[async_trait]
impl DecisionLog for MemoryStore {
    async fn record(&self, decision: ValidationDecision) -> Result<(), AppError> {
        self.decisions.write().await.push(decision);
        Ok(())
    }

    async fn list_for(&self, case_id: &str) -> Result<Vec<ValidationDecision>, AppError> {
        Ok(self
            .decisions
            .read()
            .await
            .iter()
            .rev()
            .filter(|d| d.case_id.as_deref() == Some(case_id))
            .cloned()
            .collect())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ValidationDecision>, AppError> {
        Ok(self
            .decisions
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::Role;
    use crate::models::validation::{Outcome, RejectReason};
    use chrono::Utc;

    fn admin_of(company: &Company) -> User {
        User {
            id: Uuid::new_v4(),
            email: company.email.clone(),
            password_hash: "hash".into(),
            role: Role::FuneralCompanyAdmin { company_id: company.id.clone() },
            created_at: Utc::now(),
        }
    }

    fn decision(case_id: &str, at: chrono::DateTime<Utc>, outcome: Outcome) -> ValidationDecision {
        ValidationDecision {
            id: Uuid::new_v4(),
            case_id: Some(case_id.to_string()),
            company_id: Some("CO-1".to_string()),
            decided_at: at,
            outcome,
            reason: (outcome == Outcome::Rejected).then_some(RejectReason::CompanySuspended),
            decided_by: "validator@spital-central.ro".to_string(),
        }
    }

    #[tokio::test]
    async fn fixtures_seed_companies_cases_and_logins() {
        let store = MemoryStore::seeded("grozademo!", 4).expect("seed");

        let co1 = CompanyRegistry::get(&store, "CO-1").await.unwrap().expect("CO-1");
        assert!(co1.is_authorized());
        let co3 = CompanyRegistry::get(&store, "CO-3").await.unwrap().expect("CO-3");
        assert_eq!(co3.status, AuthorizationStatus::Suspended);

        let cases = store.list_for_company("CO-1").await.unwrap();
        assert_eq!(cases.len(), 2);

        let admin = store
            .find_by_email("contact@funeralservices.ro")
            .await
            .unwrap()
            .expect("company admin");
        assert_eq!(admin.role.company_id(), Some("CO-1"));
        assert!(bcrypt::verify("grozademo!", &admin.password_hash).unwrap());

        let validator = store
            .find_by_email("VALIDATOR@spital-central.ro")
            .await
            .unwrap()
            .expect("validator");
        assert!(matches!(validator.role, Role::Validator { location: Some(_) }));
        assert_eq!(store.find_by_id(validator.id).await.unwrap().unwrap().email, validator.email);
    }

    #[tokio::test]
    async fn same_case_and_timestamp_are_both_kept() {
        let store = MemoryStore::default();
        let at = Utc::now();

        store.record(decision("CASE-1", at, Outcome::Approved)).await.unwrap();
        store.record(decision("CASE-1", at, Outcome::Rejected)).await.unwrap();
        store.record(decision("CASE-2", at, Outcome::Approved)).await.unwrap();

        let history = store.list_for("CASE-1").await.unwrap();
        assert_eq!(history.len(), 2);
        // Newest first
        assert_eq!(history[0].outcome, Outcome::Rejected);
        assert_eq!(history[1].outcome, Outcome::Approved);

        let recent = store.list_recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].case_id.as_deref(), Some("CASE-2"));
    }

    #[tokio::test]
    async fn duplicate_company_is_refused_and_status_changes() {
        let store = MemoryStore::seeded("grozademo!", 4).expect("seed");
        let mut copy = CompanyRegistry::get(&store, "CO-2").await.unwrap().unwrap();
        copy.id = "CO-99".into();

        let admin = admin_of(&copy);
        let err = store.create(copy, admin).await.expect_err("duplicate email");
        assert!(matches!(err, AppError::CompanyAlreadyExists(_)));

        let updated = store
            .set_status("CO-3", AuthorizationStatus::Authorized)
            .await
            .unwrap();
        assert!(updated.is_authorized());

        let err = store
            .set_status("CO-404", AuthorizationStatus::Authorized)
            .await
            .expect_err("missing");
        assert!(matches!(err, AppError::CompanyNotFound(_)));
    }

    #[tokio::test]
    async fn new_company_brings_its_admin_login() {
        let store = MemoryStore::seeded("grozademo!", 4).expect("seed");
        let mut company = CompanyRegistry::get(&store, "CO-2").await.unwrap().unwrap();
        company.id = "CO-9".into();
        company.email = "Office@Lumina.ro".into();

        store.create(company.clone(), admin_of(&company)).await.unwrap();
        let admin = store.find_by_email("office@lumina.ro").await.unwrap().expect("admin");
        assert_eq!(admin.role.company_id(), Some("CO-9"));

        // A staff login already owns this email: neither record is kept
        company.id = "CO-10".into();
        company.email = "validator@spital-central.ro".into();
        let err = store
            .create(company.clone(), admin_of(&company))
            .await
            .expect_err("email taken by a login");
        assert!(matches!(err, AppError::CompanyAlreadyExists(_)));
        assert!(CompanyRegistry::get(&store, "CO-10").await.unwrap().is_none());
        let validator = store
            .find_by_email("validator@spital-central.ro")
            .await
            .unwrap()
            .expect("validator");
        assert!(matches!(validator.role, Role::Validator { .. }));
    }

    #[tokio::test]
    async fn crew_is_the_first_on_file_for_the_company() {
        let store = MemoryStore::seeded("grozademo!", 4).expect("seed");

        let crew = store.crew_for("CO-1").await.unwrap();
        assert_eq!(crew.employee.map(|e| e.id).as_deref(), Some("EMP-1"));
        assert_eq!(crew.vehicle.map(|v| v.plate_number).as_deref(), Some("B-101-FSL"));

        assert_eq!(store.crew_for("CO-404").await.unwrap(), Crew::default());
    }
}
