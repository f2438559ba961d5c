//! Demo data bundled under `data/`, shared by both backends.
//!
//! The memory store is built from it directly. Postgres gets it once, into
//! an empty database, when `GROZA_SEED_DEMO` is on.

use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::{CaseRepository, CompanyRepository, CrewRepository, UserRepository};
use crate::models::{
    auth::{Role, User},
    case::Case,
    company::Company,
    crew::{Employee, Vehicle},
};

const COMPANIES_JSON: &str = include_str!("../../data/companies.json");
const CASES_JSON: &str = include_str!("../../data/cases.json");
const USERS_JSON: &str = include_str!("../../data/users.json");
const EMPLOYEES_JSON: &str = include_str!("../../data/employees.json");
const VEHICLES_JSON: &str = include_str!("../../data/vehicles.json");

// Fixture shape for staff logins; company admins are derived from companies
#[derive(Debug, Deserialize)]
struct SeedUser {
    email: String,
    #[serde(flatten)]
    role: Role,
}

pub struct Fixtures {
    pub companies: Vec<Company>,
    pub cases: Vec<Case>,
    pub users: Vec<User>,
    pub employees: Vec<Employee>,
    pub vehicles: Vec<Vehicle>,
}

impl Fixtures {
    /// Parses the bundled files. Every demo login, one admin per company
    /// included, shares `demo_password`.
    pub fn load(demo_password: &str, bcrypt_cost: u32) -> anyhow::Result<Self> {
        let companies: Vec<Company> = serde_json::from_str(COMPANIES_JSON)?;
        let cases: Vec<Case> = serde_json::from_str(CASES_JSON)?;
        let staff: Vec<SeedUser> = serde_json::from_str(USERS_JSON)?;
        let employees: Vec<Employee> = serde_json::from_str(EMPLOYEES_JSON)?;
        let vehicles: Vec<Vehicle> = serde_json::from_str(VEHICLES_JSON)?;

        let password_hash = bcrypt::hash(demo_password, bcrypt_cost)?;
        let now = Utc::now();

        let company_admins = companies.iter().map(|company| SeedUser {
            email: company.email.clone(),
            role: Role::FuneralCompanyAdmin { company_id: company.id.clone() },
        });

        let users = staff
            .into_iter()
            .chain(company_admins)
            .map(|seed| User {
                id: Uuid::new_v4(),
                email: seed.email,
                password_hash: password_hash.clone(),
                role: seed.role,
                created_at: now,
            })
            .collect();

        Ok(Self { companies, cases, users, employees, vehicles })
    }

    /// Inserts everything in one transaction, but only into a database
    /// without companies. Returns whether anything was written.
    pub async fn seed_postgres(&self, pool: &PgPool) -> anyhow::Result<bool> {
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM companies")
            .fetch_one(pool)
            .await?;
        if existing > 0 {
            return Ok(false);
        }

        let companies = CompanyRepository::new(pool.clone());
        let cases = CaseRepository::new(pool.clone());
        let users = UserRepository::new(pool.clone());
        let crews = CrewRepository::new(pool.clone());

        let mut tx = pool.begin().await?;
        for company in &self.companies {
            companies.insert(&mut *tx, company).await?;
        }
        for case in &self.cases {
            cases.insert(&mut *tx, case).await?;
        }
        for user in &self.users {
            users.insert(&mut *tx, user).await?;
        }
        for employee in &self.employees {
            crews.insert_employee(&mut *tx, employee).await?;
        }
        for vehicle in &self.vehicles {
            crews.insert_vehicle(&mut *tx, vehicle).await?;
        }
        tx.commit().await?;

        tracing::info!(
            "Postgres seeded with demo data: {} companies, {} cases, {} users",
            self.companies.len(),
            self.cases.len(),
            self.users.len()
        );
        Ok(true)
    }
}
