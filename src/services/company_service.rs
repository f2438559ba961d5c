// src/services/company_service.rs

use bcrypt::hash;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CompanyRegistry,
    models::{
        auth::{Role, User},
        company::{AuthorizationStatus, Company, CreateCompanyPayload},
    },
};

#[derive(Clone)]
pub struct CompanyService {
    companies: Arc<dyn CompanyRegistry>,
    // Handed to every new company admin, like the demo logins
    initial_password: String,
    bcrypt_cost: u32,
}

impl CompanyService {
    pub fn new(companies: Arc<dyn CompanyRegistry>, initial_password: String, bcrypt_cost: u32) -> Self {
        Self { companies, initial_password, bcrypt_cost }
    }

    pub async fn list(&self) -> Result<Vec<Company>, AppError> {
        self.companies.list().await
    }

    pub async fn get(&self, company_id: &str) -> Result<Company, AppError> {
        self.companies
            .get(company_id)
            .await?
            .ok_or_else(|| AppError::CompanyNotFound(company_id.to_string()))
    }

    /// Registers a company. It starts suspended until an administrator
    /// authorizes it.
    ///
    /// The company's email becomes the login of its FUNERAL_COMPANY_ADMIN,
    /// created in the same step with the initial password.
    pub async fn register(&self, payload: CreateCompanyPayload) -> Result<Company, AppError> {
        let company = payload.into_company();

        let password = self.initial_password.clone();
        let cost = self.bcrypt_cost;
        let password_hash = tokio::task::spawn_blocking(move || hash(&password, cost))
            .await
            .map_err(|e| anyhow::anyhow!("Password hashing task failed: {}", e))??;

        let admin = User {
            id: Uuid::new_v4(),
            email: company.email.clone(),
            password_hash,
            role: Role::FuneralCompanyAdmin { company_id: company.id.clone() },
            created_at: Utc::now(),
        };

        let company = self.companies.create(company, admin).await?;
        tracing::info!(
            "Company {} ({}) registered, admin login {}",
            company.id,
            company.name,
            company.email
        );
        Ok(company)
    }

    /// Takes effect for every validation that reads the registry afterwards,
    /// including tokens printed long before.
    pub async fn set_status(
        &self,
        company_id: &str,
        status: AuthorizationStatus,
    ) -> Result<Company, AppError> {
        let company = self.companies.set_status(company_id, status).await?;
        tracing::info!("Company {} is now {:?}", company.id, company.status);
        Ok(company)
    }
}
