use async_trait::async_trait;
use sqlx::PgPool;
use std::marker::PhantomData;

use super::store::{AuditSink, StepRepository, UserRepository, WorkItemStore};
use crate::errors::AppError;
use crate::models::audit::{self, AuditEvent};
use crate::models::step::{self, CreateStep, CreateWorkflow, Step, StepChanges, Workflow};
use crate::models::user::{self, User};
use crate::models::work_item::{
    self, EntityKind, NewWorkItem, StepChange, StepHistoryEntry, WorkItem, WorkItemTable,
};

#[derive(Clone)]
pub struct PgStepRepository {
    pool: PgPool,
}

impl PgStepRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StepRepository for PgStepRepository {
    async fn list_steps(&self) -> Result<Vec<Step>, AppError> {
        step::find_all(&self.pool).await
    }

    async fn find_step(&self, step_id: i64) -> Result<Option<Step>, AppError> {
        step::find_by_id(&self.pool, step_id).await
    }

    async fn find_step_by_name(&self, step_name: &str) -> Result<Option<Step>, AppError> {
        step::find_by_name(&self.pool, step_name).await
    }

    async fn create_step(&self, input: &CreateStep, actor: &str) -> Result<Step, AppError> {
        step::create(&self.pool, input, actor).await
    }

    async fn update_step(
        &self,
        step_id: i64,
        changes: &StepChanges,
        actor: &str,
    ) -> Result<Option<Step>, AppError> {
        step::update(&self.pool, step_id, changes, actor).await
    }

    async fn delete_step(&self, step_id: i64) -> Result<bool, AppError> {
        step::delete(&self.pool, step_id).await
    }

    async fn associated_workflow_count(&self, step_id: i64) -> Result<i64, AppError> {
        step::associated_workflow_count(&self.pool, step_id).await
    }

    async fn list_workflows(&self) -> Result<Vec<Workflow>, AppError> {
        step::find_all_workflows(&self.pool).await
    }

    async fn create_workflow(&self, input: &CreateWorkflow, actor: &str) -> Result<Workflow, AppError> {
        step::create_workflow(&self.pool, input, actor).await
    }

    async fn delete_workflow(&self, workflow_id: i64) -> Result<bool, AppError> {
        step::delete_workflow(&self.pool, workflow_id).await
    }
}

/// Work item store backed by the table described by `T`.
pub struct PgWorkItemStore<T: WorkItemTable> {
    pool: PgPool,
    table: PhantomData<T>,
}

impl<T: WorkItemTable> PgWorkItemStore<T> {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, table: PhantomData }
    }
}

#[async_trait]
impl<T: WorkItemTable> WorkItemStore<T::Id> for PgWorkItemStore<T> {
    fn kind(&self) -> EntityKind {
        T::KIND
    }

    async fn find(&self, id: &T::Id) -> Result<Option<WorkItem<T::Id>>, AppError> {
        work_item::find_by_id::<T>(&self.pool, id).await
    }

    async fn create(&self, input: &NewWorkItem<T::Id>, actor: &str) -> Result<WorkItem<T::Id>, AppError> {
        work_item::create::<T>(&self.pool, input, actor).await
    }

    async fn apply_step_change(&self, change: &StepChange<T::Id>) -> Result<WorkItem<T::Id>, AppError> {
        work_item::apply_step_change::<T>(&self.pool, change).await
    }

    async fn history(&self, id: &T::Id) -> Result<Vec<StepHistoryEntry<T::Id>>, AppError> {
        work_item::find_history::<T>(&self.pool, id).await
    }

    async fn count_on_step(&self, step_id: i64) -> Result<i64, AppError> {
        work_item::count_on_step::<T>(&self.pool, step_id).await
    }
}

#[derive(Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), AppError> {
        audit::create(&self.pool, event).await.map(|_| ())
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        user::find_by_username(&self.pool, username).await
    }
}
