use serde::Serialize;
use sqlx::PgPool;

use crate::errors::AppError;

/// Audit event describing an action taken by an actor on a target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEvent {
    pub actor: String,
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    pub details: serde_json::Value,
}

pub async fn create(pool: &PgPool, event: &AuditEvent) -> Result<i64, AppError> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO audit_entries (actor, action, target_type, target_id, details) \
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(&event.actor)
    .bind(&event.action)
    .bind(&event.target_type)
    .bind(&event.target_id)
    .bind(&event.details)
    .fetch_one(pool)
    .await?;
    Ok(id)
}
