//! In-memory stores.
//!
//! Same contracts as the Postgres stores: unique step names, delete
//! restrictions, atomic step change plus history append. Each store can be
//! told to fail specific operations to exercise error paths.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use caseflow::errors::AppError;
use caseflow::models::audit::AuditEvent;
use caseflow::models::step::{CreateStep, CreateWorkflow, Step, StepChanges, Workflow};
use caseflow::models::user::User;
use caseflow::models::work_item::{EntityId, EntityKind, NewWorkItem, StepChange, StepHistoryEntry, WorkItem};
use caseflow::workflow::{AuditSink, StepRepository, UserRepository, WorkItemStore};

fn simulated_failure(what: &str) -> AppError {
    AppError::Db(sqlx::Error::Protocol(format!("simulated {what} failure")))
}

fn apply_changes(changes: &StepChanges, step: &mut Step) {
    if let Some(name) = &changes.step_name {
        step.step_name = name.trim().to_string();
    }
    if let Some(description) = &changes.description {
        step.description = description.clone();
    }
    if let Some(status) = changes.step_status_id {
        step.step_status_id = status;
    }
    if let Some(order) = changes.step_order {
        step.step_order = order;
    }
}

#[derive(Debug, Default)]
struct StepState {
    steps: BTreeMap<i64, Step>,
    workflows: BTreeMap<i64, Workflow>,
    next_step_id: i64,
    next_workflow_id: i64,
}

#[derive(Debug, Default)]
pub struct MemoryStepRepository {
    state: RwLock<StepState>,
}

impl MemoryStepRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a step with a fixed id, replacing any step with the same id.
    pub async fn insert_step(&self, step: Step) {
        let mut state = self.state.write().await;
        state.next_step_id = state.next_step_id.max(step.step_id);
        state.steps.insert(step.step_id, step);
    }
}

#[async_trait]
impl StepRepository for MemoryStepRepository {
    async fn list_steps(&self) -> Result<Vec<Step>, AppError> {
        let state = self.state.read().await;
        let mut steps: Vec<Step> = state.steps.values().cloned().collect();
        steps.sort_by_key(|s| (s.step_order, s.step_id));
        Ok(steps)
    }

    async fn find_step(&self, step_id: i64) -> Result<Option<Step>, AppError> {
        Ok(self.state.read().await.steps.get(&step_id).cloned())
    }

    async fn find_step_by_name(&self, step_name: &str) -> Result<Option<Step>, AppError> {
        let name = step_name.trim();
        Ok(self
            .state
            .read()
            .await
            .steps
            .values()
            .find(|s| s.step_name == name)
            .cloned())
    }

    async fn create_step(&self, input: &CreateStep, actor: &str) -> Result<Step, AppError> {
        let mut state = self.state.write().await;
        let name = input.step_name.trim();
        if state.steps.values().any(|s| s.step_name == name) {
            return Err(AppError::DuplicateStepName(name.to_string()));
        }

        state.next_step_id += 1;
        let step_order = input.step_order.unwrap_or_else(|| {
            state.steps.values().map(|s| s.step_order).max().unwrap_or(0) + 1
        });
        let step = Step {
            step_id: state.next_step_id,
            step_name: name.to_string(),
            description: input.description.clone(),
            step_status_id: input.status_id(),
            step_order,
            created_by: actor.to_string(),
            created_date: Utc::now(),
            updated_by: None,
            updated_date: None,
        };
        state.steps.insert(step.step_id, step.clone());
        Ok(step)
    }

    async fn update_step(
        &self,
        step_id: i64,
        changes: &StepChanges,
        actor: &str,
    ) -> Result<Option<Step>, AppError> {
        let mut state = self.state.write().await;
        if let Some(name) = changes.step_name.as_deref().map(str::trim) {
            if state.steps.values().any(|s| s.step_name == name && s.step_id != step_id) {
                return Err(AppError::DuplicateStepName(name.to_string()));
            }
        }

        let Some(step) = state.steps.get_mut(&step_id) else {
            return Ok(None);
        };
        apply_changes(changes, step);
        step.updated_by = Some(actor.to_string());
        step.updated_date = Some(Utc::now());
        Ok(Some(step.clone()))
    }

    async fn delete_step(&self, step_id: i64) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        let associated_workflow_count = state
            .workflows
            .values()
            .filter(|w| w.steps.contains(&step_id))
            .count() as i64;
        if associated_workflow_count > 0 {
            return Err(AppError::StepInUse { step_id, associated_workflow_count });
        }
        Ok(state.steps.remove(&step_id).is_some())
    }

    async fn associated_workflow_count(&self, step_id: i64) -> Result<i64, AppError> {
        let state = self.state.read().await;
        Ok(state
            .workflows
            .values()
            .filter(|w| w.steps.contains(&step_id))
            .count() as i64)
    }

    async fn list_workflows(&self) -> Result<Vec<Workflow>, AppError> {
        Ok(self.state.read().await.workflows.values().cloned().collect())
    }

    async fn create_workflow(&self, input: &CreateWorkflow, actor: &str) -> Result<Workflow, AppError> {
        let mut state = self.state.write().await;
        let name = input.name.trim();
        if state.workflows.values().any(|w| w.name == name) {
            return Err(AppError::Conflict(format!("Workflow name '{name}' already exists")));
        }
        if let Some(missing) = input.steps.iter().find(|id| !state.steps.contains_key(*id)) {
            return Err(AppError::StepNotFound(*missing));
        }

        state.next_workflow_id += 1;
        let workflow = Workflow {
            workflow_id: state.next_workflow_id,
            name: name.to_string(),
            steps: input.steps.clone(),
            created_by: actor.to_string(),
            created_date: Utc::now(),
        };
        state.workflows.insert(workflow.workflow_id, workflow.clone());
        Ok(workflow)
    }

    async fn delete_workflow(&self, workflow_id: i64) -> Result<bool, AppError> {
        Ok(self.state.write().await.workflows.remove(&workflow_id).is_some())
    }
}

#[derive(Debug)]
struct WorkItemState<Id> {
    items: BTreeMap<Id, WorkItem<Id>>,
    history: Vec<StepHistoryEntry<Id>>,
}

#[derive(Debug)]
pub struct MemoryWorkItemStore<Id> {
    kind: EntityKind,
    state: RwLock<WorkItemState<Id>>,
    failing: RwLock<HashSet<Id>>,
}

impl<Id: EntityId> MemoryWorkItemStore<Id> {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            state: RwLock::new(WorkItemState {
                items: BTreeMap::new(),
                history: Vec::new(),
            }),
            failing: RwLock::new(HashSet::new()),
        }
    }

    /// Make every step change for `id` fail with a persistence error.
    pub async fn fail_step_changes_for(&self, id: Id) {
        self.failing.write().await.insert(id);
    }

    /// History entries for every item, in append order.
    pub async fn all_history(&self) -> Vec<StepHistoryEntry<Id>> {
        self.state.read().await.history.clone()
    }
}

#[async_trait]
impl<Id: EntityId> WorkItemStore<Id> for MemoryWorkItemStore<Id> {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    async fn find(&self, id: &Id) -> Result<Option<WorkItem<Id>>, AppError> {
        Ok(self.state.read().await.items.get(id).cloned())
    }

    async fn create(&self, input: &NewWorkItem<Id>, actor: &str) -> Result<WorkItem<Id>, AppError> {
        let mut state = self.state.write().await;
        if state.items.contains_key(&input.id) {
            return Err(AppError::Conflict(format!("{} {} already exists", self.kind, input.id)));
        }
        let item = WorkItem {
            id: input.id.clone(),
            title: input.title.trim().to_string(),
            current_step_id: input.step_id,
            created_by: actor.to_string(),
            created_date: Utc::now(),
            updated_by: None,
            updated_date: None,
        };
        state.items.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    async fn apply_step_change(&self, change: &StepChange<Id>) -> Result<WorkItem<Id>, AppError> {
        if self.failing.read().await.contains(&change.id) {
            return Err(simulated_failure("step change"));
        }

        let mut state = self.state.write().await;
        let history_id = state.history.len() as i64 + 1;
        let now = Utc::now();

        let item = match state.items.get_mut(&change.id) {
            Some(item) if item.current_step_id == change.from_step_id => item,
            _ => {
                return Err(AppError::Conflict(format!(
                    "{} {} is no longer on step {}",
                    self.kind, change.id, change.from_step_id
                )));
            }
        };
        item.current_step_id = change.to_step_id;
        item.updated_by = Some(change.actor.clone());
        item.updated_date = Some(now);
        let updated = item.clone();

        state.history.push(StepHistoryEntry {
            history_id,
            entity_id: change.id.clone(),
            from_step_id: change.from_step_id,
            to_step_id: change.to_step_id,
            reason: change.reason.clone(),
            actor: change.actor.clone(),
            changed_at: now,
        });

        Ok(updated)
    }

    async fn history(&self, id: &Id) -> Result<Vec<StepHistoryEntry<Id>>, AppError> {
        Ok(self
            .state
            .read()
            .await
            .history
            .iter()
            .filter(|h| &h.entity_id == id)
            .cloned()
            .collect())
    }

    async fn count_on_step(&self, step_id: i64) -> Result<i64, AppError> {
        Ok(self
            .state
            .read()
            .await
            .items
            .values()
            .filter(|i| i.current_step_id == step_id)
            .count() as i64)
    }
}

#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: RwLock<Vec<AuditEvent>>,
    fail: AtomicBool,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(simulated_failure("audit"));
        }
        self.events.write().await.push(event.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, username: &str, password_hash: &str, permissions: &str) {
        let mut users = self.users.write().await;
        let user_id = users.len() as i64 + 1;
        users.insert(
            username.to_string(),
            User {
                user_id,
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                permissions: permissions.to_string(),
            },
        );
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(username).cloned())
    }
}
