use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};

use super::types::*;
use crate::errors::AppError;

/// Table layout for one kind of work item. Alerts are keyed by text ids,
/// cases by integer ids; step history stores both keys as text.
pub trait WorkItemTable: Send + Sync + 'static {
    type Id: EntityId + for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres>;
    const KIND: EntityKind;
    const TABLE: &'static str;
    const ID_COLUMN: &'static str;
}

pub struct AlertTable;

impl WorkItemTable for AlertTable {
    type Id = String;
    const KIND: EntityKind = EntityKind::Alert;
    const TABLE: &'static str = "alerts";
    const ID_COLUMN: &'static str = "alert_id";
}

pub struct CaseTable;

impl WorkItemTable for CaseTable {
    type Id = i64;
    const KIND: EntityKind = EntityKind::Case;
    const TABLE: &'static str = "cases";
    const ID_COLUMN: &'static str = "case_id";
}

const ROW_COLUMNS: &str = "title, current_step_id, created_by, created_date, updated_by, updated_date";

#[derive(sqlx::FromRow)]
struct Row {
    title: String,
    current_step_id: i64,
    created_by: String,
    created_date: DateTime<Utc>,
    updated_by: Option<String>,
    updated_date: Option<DateTime<Utc>>,
}

impl Row {
    fn into_item<Id>(self, id: Id) -> WorkItem<Id> {
        WorkItem {
            id,
            title: self.title,
            current_step_id: self.current_step_id,
            created_by: self.created_by,
            created_date: self.created_date,
            updated_by: self.updated_by,
            updated_date: self.updated_date,
        }
    }
}

pub async fn find_by_id<T: WorkItemTable>(
    pool: &PgPool,
    id: &T::Id,
) -> Result<Option<WorkItem<T::Id>>, AppError> {
    let sql = format!(
        "SELECT {ROW_COLUMNS} FROM {} WHERE {} = $1",
        T::TABLE,
        T::ID_COLUMN
    );
    let row = sqlx::query_as::<_, Row>(&sql)
        .bind(id.clone())
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.into_item(id.clone())))
}

pub async fn create<T: WorkItemTable>(
    pool: &PgPool,
    input: &NewWorkItem<T::Id>,
    actor: &str,
) -> Result<WorkItem<T::Id>, AppError> {
    let sql = format!(
        "INSERT INTO {} ({}, title, current_step_id, created_by) VALUES ($1, $2, $3, $4) \
         RETURNING {ROW_COLUMNS}",
        T::TABLE,
        T::ID_COLUMN
    );
    let result = sqlx::query_as::<_, Row>(&sql)
        .bind(input.id.clone())
        .bind(input.title.trim())
        .bind(input.step_id)
        .bind(actor)
        .fetch_one(pool)
        .await;

    match result {
        Ok(row) => Ok(row.into_item(input.id.clone())),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(AppError::Conflict(
            format!("{} {} already exists", T::KIND, input.id),
        )),
        Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
            Err(AppError::StepNotFound(input.step_id))
        }
        Err(e) => Err(AppError::Db(e)),
    }
}

/// Move the item to the new step and append the history record in one
/// transaction. The update only applies while the item still sits on
/// `change.from_step_id`.
pub async fn apply_step_change<T: WorkItemTable>(
    pool: &PgPool,
    change: &StepChange<T::Id>,
) -> Result<WorkItem<T::Id>, AppError> {
    let mut tx = pool.begin().await?;

    let sql = format!(
        "UPDATE {} SET current_step_id = $1, updated_by = $2, updated_date = NOW() \
         WHERE {} = $3 AND current_step_id = $4 \
         RETURNING {ROW_COLUMNS}",
        T::TABLE,
        T::ID_COLUMN
    );
    let updated = sqlx::query_as::<_, Row>(&sql)
        .bind(change.to_step_id)
        .bind(&change.actor)
        .bind(change.id.clone())
        .bind(change.from_step_id)
        .fetch_optional(&mut *tx)
        .await?;

    let Some(row) = updated else {
        return Err(AppError::Conflict(format!(
            "{} {} is no longer on step {}",
            T::KIND,
            change.id,
            change.from_step_id
        )));
    };

    sqlx::query(
        "INSERT INTO step_history (entity_kind, entity_key, from_step_id, to_step_id, reason, actor) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(T::KIND.as_str())
    .bind(change.id.to_string())
    .bind(change.from_step_id)
    .bind(change.to_step_id)
    .bind(change.reason.as_deref())
    .bind(&change.actor)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row.into_item(change.id.clone()))
}

/// Step history for one item, oldest first.
pub async fn find_history<T: WorkItemTable>(
    pool: &PgPool,
    id: &T::Id,
) -> Result<Vec<StepHistoryEntry<T::Id>>, AppError> {
    let rows: Vec<(i64, i64, i64, Option<String>, String, DateTime<Utc>)> = sqlx::query_as(
        "SELECT history_id, from_step_id, to_step_id, reason, actor, changed_at \
         FROM step_history WHERE entity_kind = $1 AND entity_key = $2 ORDER BY history_id",
    )
    .bind(T::KIND.as_str())
    .bind(id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(history_id, from_step_id, to_step_id, reason, actor, changed_at)| StepHistoryEntry {
            history_id,
            entity_id: id.clone(),
            from_step_id,
            to_step_id,
            reason,
            actor,
            changed_at,
        })
        .collect())
}

/// Number of items currently sitting on the step.
pub async fn count_on_step<T: WorkItemTable>(pool: &PgPool, step_id: i64) -> Result<i64, AppError> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE current_step_id = $1", T::TABLE);
    let (count,): (i64,) = sqlx::query_as(&sql).bind(step_id).fetch_one(pool).await?;
    Ok(count)
}
