// src/db/decision_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use super::DecisionLog;
use crate::common::error::AppError;
use crate::models::validation::ValidationDecision;

// `validation_decisions` has no UPDATE or DELETE path anywhere in the code.
// `seq` breaks ties between decisions recorded within the same instant.
#[derive(Clone)]
pub struct DecisionRepository {
    pool: PgPool,
}

impl DecisionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DecisionLog for DecisionRepository {
    async fn record(&self, decision: ValidationDecision) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO validation_decisions (
                id, case_id, company_id, decided_at, outcome, reason, decided_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(decision.id)
        .bind(&decision.case_id)
        .bind(&decision.company_id)
        .bind(decision.decided_at)
        .bind(decision.outcome)
        .bind(decision.reason)
        .bind(&decision.decided_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for(&self, case_id: &str) -> Result<Vec<ValidationDecision>, AppError> {
        let decisions = sqlx::query_as::<_, ValidationDecision>(
            r#"
            SELECT id, case_id, company_id, decided_at, outcome, reason, decided_by
            FROM validation_decisions
            WHERE case_id = $1
            ORDER BY decided_at DESC, seq DESC
            "#,
        )
        .bind(case_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(decisions)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ValidationDecision>, AppError> {
        let decisions = sqlx::query_as::<_, ValidationDecision>(
            r#"
            SELECT id, case_id, company_id, decided_at, outcome, reason, decided_by
            FROM validation_decisions
            ORDER BY decided_at DESC, seq DESC
            LIMIT $1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        Ok(decisions)
    }
}
