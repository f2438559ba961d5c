// src/db/company_repo.rs

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres};

use super::{CompanyRegistry, UserRepository};
use crate::common::error::AppError;
use crate::models::{
    auth::User,
    company::{AuthorizationStatus, Company},
};

const COMPANY_COLUMNS: &str = r#"
    id, name, cui, location, address, phone, email, status, processing_location
"#;

#[derive(Clone)]
pub struct CompanyRepository {
    pool: PgPool,
    users: UserRepository,
}

impl CompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { users: UserRepository::new(pool.clone()), pool }
    }

    pub async fn insert<'e, E>(&self, executor: E, company: &Company) -> Result<Company, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Company>(&format!(
            r#"
            INSERT INTO companies (
                id, name, cui, location, address, phone, email, status, processing_location
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {COMPANY_COLUMNS}
            "#
        ))
        .bind(&company.id)
        .bind(&company.name)
        .bind(&company.cui)
        .bind(&company.location)
        .bind(&company.address)
        .bind(&company.phone)
        .bind(&company.email)
        .bind(company.status)
        .bind(&company.processing_location)
        .fetch_one(executor)
        .await
    }
}

// Email uniqueness is enforced on lower(email), in both tables
fn conflicting_key(constraint: Option<&str>, company: &Company) -> String {
    match constraint {
        Some("companies_email_lower_key" | "users_email_lower_key") => company.email.clone(),
        _ => company.id.clone(),
    }
}

fn map_conflict(e: sqlx::Error, company: &Company) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::CompanyAlreadyExists(conflicting_key(db_err.constraint(), company));
        }
    }
    e.into()
}

#[async_trait]
impl CompanyRegistry for CompanyRepository {
    async fn get(&self, company_id: &str) -> Result<Option<Company>, AppError> {
        let company = sqlx::query_as::<_, Company>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM companies WHERE id = $1"
        ))
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(company)
    }

    async fn list(&self) -> Result<Vec<Company>, AppError> {
        let companies = sqlx::query_as::<_, Company>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM companies ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(companies)
    }

    async fn create(&self, company: Company, admin: User) -> Result<Company, AppError> {
        // Company and its admin login land together or not at all
        let mut tx = self.pool.begin().await?;

        let created = self
            .insert(&mut *tx, &company)
            .await
            .map_err(|e| map_conflict(e, &company))?;
        self.users
            .insert(&mut *tx, &admin)
            .await
            .map_err(|e| map_conflict(e, &company))?;

        tx.commit().await?;
        Ok(created)
    }

    async fn set_status(
        &self,
        company_id: &str,
        status: AuthorizationStatus,
    ) -> Result<Company, AppError> {
        sqlx::query_as::<_, Company>(&format!(
            r#"
            UPDATE companies SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {COMPANY_COLUMNS}
            "#
        ))
        .bind(company_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::CompanyNotFound(company_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_constraints_report_the_email() {
        let company = Company {
            id: "CO-9".into(),
            name: "Servicii Funerare Lumina".into(),
            cui: "RO998877".into(),
            location: "Iasi".into(),
            address: String::new(),
            phone: String::new(),
            email: "office@lumina.ro".into(),
            status: AuthorizationStatus::Suspended,
            processing_location: None,
        };

        assert_eq!(conflicting_key(Some("companies_email_lower_key"), &company), "office@lumina.ro");
        assert_eq!(conflicting_key(Some("users_email_lower_key"), &company), "office@lumina.ro");
        assert_eq!(conflicting_key(Some("companies_pkey"), &company), "CO-9");
        assert_eq!(conflicting_key(None, &company), "CO-9");
    }
}
