// src/db/crew_repo.rs

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres};

use super::CrewRegistry;
use crate::common::error::AppError;
use crate::models::crew::{Crew, Employee, Vehicle};

#[derive(Clone)]
pub struct CrewRepository {
    pool: PgPool,
}

impl CrewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_employee<'e, E>(&self, executor: E, employee: &Employee) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO employees (id, company_id, name, email, phone, position)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&employee.id)
        .bind(&employee.company_id)
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(&employee.phone)
        .bind(&employee.position)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn insert_vehicle<'e, E>(&self, executor: E, vehicle: &Vehicle) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO vehicles (id, company_id, plate_number, vehicle_type, model, last_inspection)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&vehicle.id)
        .bind(&vehicle.company_id)
        .bind(&vehicle.plate_number)
        .bind(&vehicle.vehicle_type)
        .bind(&vehicle.model)
        .bind(&vehicle.last_inspection)
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CrewRegistry for CrewRepository {
    async fn crew_for(&self, company_id: &str) -> Result<Crew, AppError> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, company_id, name, email, phone, position
            FROM employees
            WHERE company_id = $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT id, company_id, plate_number, vehicle_type, model, last_inspection
            FROM vehicles
            WHERE company_id = $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(Crew { employee, vehicle })
    }
}
