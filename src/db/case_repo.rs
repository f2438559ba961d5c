// src/db/case_repo.rs

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres};

use super::CaseRegistry;
use crate::common::error::AppError;
use crate::models::case::Case;

#[derive(Clone)]
pub struct CaseRepository {
    pool: PgPool,
}

impl CaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert<'e, E>(&self, executor: E, case: &Case) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO cases (id, company_id, deceased_name, date, location, status, permits)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&case.id)
        .bind(&case.company_id)
        .bind(&case.deceased_name)
        .bind(&case.date)
        .bind(&case.location)
        .bind(case.status)
        .bind(&case.permits)
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CaseRegistry for CaseRepository {
    async fn get(&self, case_id: &str) -> Result<Option<Case>, AppError> {
        let case = sqlx::query_as::<_, Case>(
            r#"
            SELECT id, company_id, deceased_name, date, location, status, permits
            FROM cases
            WHERE id = $1
            "#,
        )
        .bind(case_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(case)
    }

    async fn list_for_company(&self, company_id: &str) -> Result<Vec<Case>, AppError> {
        let cases = sqlx::query_as::<_, Case>(
            r#"
            SELECT id, company_id, deceased_name, date, location, status, permits
            FROM cases
            WHERE company_id = $1
            ORDER BY id
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(cases)
    }
}
