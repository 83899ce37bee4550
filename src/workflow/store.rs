//! Persistence seams for the workflow. The Postgres implementations live in
//! [`super::postgres`].

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::audit::AuditEvent;
use crate::models::step::{CreateStep, CreateWorkflow, Step, StepChanges, Workflow};
use crate::models::user::User;
use crate::models::work_item::{EntityId, EntityKind, NewWorkItem, StepChange, StepHistoryEntry, WorkItem};

/// Steps and workflows: the reference data the step catalog is built from.
#[async_trait]
pub trait StepRepository: Send + Sync {
    /// All steps in catalog order.
    async fn list_steps(&self) -> Result<Vec<Step>, AppError>;

    async fn find_step(&self, step_id: i64) -> Result<Option<Step>, AppError>;

    async fn find_step_by_name(&self, step_name: &str) -> Result<Option<Step>, AppError>;

    /// Fails with `DuplicateStepName` when the name is taken.
    async fn create_step(&self, input: &CreateStep, actor: &str) -> Result<Step, AppError>;

    /// Returns `None` when the step does not exist.
    async fn update_step(
        &self,
        step_id: i64,
        changes: &StepChanges,
        actor: &str,
    ) -> Result<Option<Step>, AppError>;

    /// Returns false when the step does not exist. Fails with `StepInUse`
    /// while a workflow references it.
    async fn delete_step(&self, step_id: i64) -> Result<bool, AppError>;

    async fn associated_workflow_count(&self, step_id: i64) -> Result<i64, AppError>;

    async fn list_workflows(&self) -> Result<Vec<Workflow>, AppError>;

    async fn create_workflow(&self, input: &CreateWorkflow, actor: &str) -> Result<Workflow, AppError>;

    async fn delete_workflow(&self, workflow_id: i64) -> Result<bool, AppError>;
}

/// Alerts or cases, keyed by `Id`.
#[async_trait]
pub trait WorkItemStore<Id: EntityId>: Send + Sync {
    fn kind(&self) -> EntityKind;

    async fn find(&self, id: &Id) -> Result<Option<WorkItem<Id>>, AppError>;

    async fn create(&self, input: &NewWorkItem<Id>, actor: &str) -> Result<WorkItem<Id>, AppError>;

    /// Atomically move the item to `change.to_step_id` and append the history
    /// entry. Either both happen or neither does.
    async fn apply_step_change(&self, change: &StepChange<Id>) -> Result<WorkItem<Id>, AppError>;

    async fn history(&self, id: &Id) -> Result<Vec<StepHistoryEntry<Id>>, AppError>;

    async fn count_on_step(&self, step_id: i64) -> Result<i64, AppError>;
}

/// Destination for audit events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: &AuditEvent) -> Result<(), AppError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
}
