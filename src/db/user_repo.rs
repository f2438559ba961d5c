// src/db/user_repo.rs

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use super::UserDirectory;
use crate::{
    common::error::AppError,
    models::auth::{Role, User, UserRow},
};

// Responsible for every interaction with the `users` table
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Takes an executor so the insert can join the caller's transaction.
    pub async fn insert<'e, E>(&self, executor: E, user: &User) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let location = match &user.role {
            Role::Validator { location } => location.as_deref(),
            Role::GlobalAdmin | Role::FuneralCompanyAdmin { .. } => None,
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, role, company_id, location, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.kind())
        .bind(user.role.company_id())
        .bind(location)
        .bind(user.created_at)
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, role, company_id, location, created_at
            FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose().map_err(AppError::from)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, role, company_id, location, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose().map_err(AppError::from)
    }
}
