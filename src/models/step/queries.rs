use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor, PgPool};

use super::types::*;
use crate::errors::AppError;

const SELECT_STEP: &str = "SELECT step_id, step_name, description, step_status_id, step_order, \
                           created_by, created_date, updated_by, updated_date FROM steps";

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

/// All steps in catalog order.
pub async fn find_all(pool: &PgPool) -> Result<Vec<Step>, AppError> {
    let steps = sqlx::query_as::<_, Step>(&format!("{SELECT_STEP} ORDER BY step_order, step_id"))
        .fetch_all(pool)
        .await?;
    Ok(steps)
}

pub async fn find_by_id(pool: &PgPool, step_id: i64) -> Result<Option<Step>, AppError> {
    let step = sqlx::query_as::<_, Step>(&format!("{SELECT_STEP} WHERE step_id = $1"))
        .bind(step_id)
        .fetch_optional(pool)
        .await?;
    Ok(step)
}

pub async fn find_by_name(pool: &PgPool, step_name: &str) -> Result<Option<Step>, AppError> {
    let step = sqlx::query_as::<_, Step>(&format!("{SELECT_STEP} WHERE step_name = $1"))
        .bind(step_name.trim())
        .fetch_optional(pool)
        .await?;
    Ok(step)
}

/// Insert a step. A missing `step_order` places it after the current last step.
pub async fn create<'e, E: PgExecutor<'e>>(
    executor: E,
    input: &CreateStep,
    actor: &str,
) -> Result<Step, AppError> {
    let name = input.step_name.trim();
    let result = sqlx::query_as::<_, Step>(
        "INSERT INTO steps (step_name, description, step_status_id, step_order, created_by) \
         VALUES ($1, $2, $3, COALESCE($4, (SELECT COALESCE(MAX(step_order), 0) + 1 FROM steps)), $5) \
         RETURNING step_id, step_name, description, step_status_id, step_order, \
                   created_by, created_date, updated_by, updated_date",
    )
    .bind(name)
    .bind(&input.description)
    .bind(input.status_id())
    .bind(input.step_order)
    .bind(actor)
    .fetch_one(executor)
    .await;

    match result {
        Ok(step) => Ok(step),
        Err(e) if is_unique_violation(&e) => Err(AppError::DuplicateStepName(name.to_string())),
        Err(e) => Err(AppError::Db(e)),
    }
}

/// Apply a partial update. Returns `None` when the step does not exist.
pub async fn update(
    pool: &PgPool,
    step_id: i64,
    changes: &StepChanges,
    actor: &str,
) -> Result<Option<Step>, AppError> {
    let name = changes.step_name.as_deref().map(str::trim);
    let result = sqlx::query_as::<_, Step>(
        "UPDATE steps SET \
             step_name = COALESCE($1, step_name), \
             description = COALESCE($2, description), \
             step_status_id = COALESCE($3, step_status_id), \
             step_order = COALESCE($4, step_order), \
             updated_by = $5, \
             updated_date = NOW() \
         WHERE step_id = $6 \
         RETURNING step_id, step_name, description, step_status_id, step_order, \
                   created_by, created_date, updated_by, updated_date",
    )
    .bind(name)
    .bind(changes.description.as_deref())
    .bind(changes.step_status_id)
    .bind(changes.step_order)
    .bind(actor)
    .bind(step_id)
    .fetch_optional(pool)
    .await;

    match result {
        Ok(step) => Ok(step),
        Err(e) if is_unique_violation(&e) => {
            Err(AppError::DuplicateStepName(name.unwrap_or_default().to_string()))
        }
        Err(e) => Err(AppError::Db(e)),
    }
}

/// Delete a step. Returns false when nothing was deleted.
pub async fn delete(pool: &PgPool, step_id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM steps WHERE step_id = $1")
        .bind(step_id)
        .execute(pool)
        .await;

    match result {
        Ok(done) => Ok(done.rows_affected() > 0),
        Err(e) if is_foreign_key_violation(&e) => {
            let associated_workflow_count = associated_workflow_count(pool, step_id).await?;
            Err(AppError::StepInUse { step_id, associated_workflow_count })
        }
        Err(e) => Err(AppError::Db(e)),
    }
}

/// Number of workflows that include the step.
pub async fn associated_workflow_count(pool: &PgPool, step_id: i64) -> Result<i64, AppError> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(DISTINCT workflow_id) FROM workflow_steps WHERE step_id = $1",
    )
    .bind(step_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// All workflows with their ordered step ids.
pub async fn find_all_workflows(pool: &PgPool) -> Result<Vec<Workflow>, AppError> {
    let headers: Vec<(i64, String, String, DateTime<Utc>)> = sqlx::query_as(
        "SELECT workflow_id, name, created_by, created_date FROM workflows ORDER BY workflow_id",
    )
    .fetch_all(pool)
    .await?;

    let members: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT workflow_id, step_id FROM workflow_steps ORDER BY workflow_id, position",
    )
    .fetch_all(pool)
    .await?;

    let workflows = headers
        .into_iter()
        .map(|(workflow_id, name, created_by, created_date)| Workflow {
            workflow_id,
            name,
            steps: members
                .iter()
                .filter(|(wid, _)| *wid == workflow_id)
                .map(|(_, step_id)| *step_id)
                .collect(),
            created_by,
            created_date,
        })
        .collect();

    Ok(workflows)
}

/// Insert a workflow and its ordered steps in one transaction.
pub async fn create_workflow(
    pool: &PgPool,
    input: &CreateWorkflow,
    actor: &str,
) -> Result<Workflow, AppError> {
    let mut tx = pool.begin().await?;
    let workflow = insert_workflow(&mut tx, input, actor).await?;
    tx.commit().await?;
    Ok(workflow)
}

/// Insert a workflow and its ordered steps on an open connection, usually
/// inside the caller's transaction.
pub async fn insert_workflow(
    conn: &mut PgConnection,
    input: &CreateWorkflow,
    actor: &str,
) -> Result<Workflow, AppError> {
    let name = input.name.trim();

    let inserted: Result<(i64, DateTime<Utc>), _> = sqlx::query_as(
        "INSERT INTO workflows (name, created_by) VALUES ($1, $2) RETURNING workflow_id, created_date",
    )
    .bind(name)
    .bind(actor)
    .fetch_one(&mut *conn)
    .await;

    let (workflow_id, created_date) = match inserted {
        Ok(row) => row,
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::Conflict(format!("Workflow name '{name}' already exists")));
        }
        Err(e) => return Err(AppError::Db(e)),
    };

    for (position, step_id) in input.steps.iter().enumerate() {
        let result = sqlx::query(
            "INSERT INTO workflow_steps (workflow_id, step_id, position) VALUES ($1, $2, $3)",
        )
        .bind(workflow_id)
        .bind(step_id)
        .bind(position as i32)
        .execute(&mut *conn)
        .await;

        match result {
            Ok(_) => {}
            Err(e) if is_foreign_key_violation(&e) => return Err(AppError::StepNotFound(*step_id)),
            Err(e) => return Err(AppError::Db(e)),
        }
    }

    Ok(Workflow {
        workflow_id,
        name: name.to_string(),
        steps: input.steps.clone(),
        created_by: actor.to_string(),
        created_date,
    })
}

pub async fn delete_workflow(pool: &PgPool, workflow_id: i64) -> Result<bool, AppError> {
    let done = sqlx::query("DELETE FROM workflows WHERE workflow_id = $1")
        .bind(workflow_id)
        .execute(pool)
        .await?;
    Ok(done.rows_affected() > 0)
}
