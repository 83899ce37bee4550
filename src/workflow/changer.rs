use super::catalog::StepCatalog;
use super::store::{AuditSink, WorkItemStore};
use crate::audit;
use crate::errors::AppError;
use crate::models::work_item::{EntityId, StepChange, WorkItem};

/// Moves one alert or case to a target step.
pub struct StepChanger<'a, Id: EntityId> {
    store: &'a dyn WorkItemStore<Id>,
    catalog: &'a StepCatalog,
    audit: &'a dyn AuditSink,
}

impl<'a, Id: EntityId> StepChanger<'a, Id> {
    pub fn new(
        store: &'a dyn WorkItemStore<Id>,
        catalog: &'a StepCatalog,
        audit: &'a dyn AuditSink,
    ) -> Self {
        Self { store, catalog, audit }
    }

    /// Change the item's step.
    ///
    /// Fails with `EntityNotFound` for an unknown item, `StepNotFound` for an
    /// unknown target and, unless `skip_validation` is set, `InvalidTransition`
    /// when the target is neither a next nor a back step of the current one.
    /// The step update and its history entry are written together or not at all.
    pub async fn change_step(
        &self,
        id: &Id,
        step_id: i64,
        reason: Option<&str>,
        skip_validation: bool,
        actor: &str,
    ) -> Result<WorkItem<Id>, AppError> {
        let item = self
            .store
            .find(id)
            .await?
            .ok_or_else(|| AppError::EntityNotFound {
                kind: self.store.kind(),
                id: id.to_string(),
            })?;

        if !self.catalog.contains(step_id) {
            return Err(AppError::StepNotFound(step_id));
        }

        if !skip_validation {
            let transitions = self.catalog.transitions(item.current_step_id)?;
            if !transitions.contains(step_id) {
                return Err(AppError::InvalidTransition {
                    step_id,
                    allowed: transitions.allowed_ids(),
                });
            }
        }

        let change = StepChange {
            id: id.clone(),
            from_step_id: item.current_step_id,
            to_step_id: step_id,
            reason: reason.map(str::trim).filter(|r| !r.is_empty()).map(String::from),
            actor: actor.to_string(),
        };

        let updated = self.store.apply_step_change(&change).await?;

        audit::log(self.audit, audit::step_changed(self.store.kind(), &change)).await;

        Ok(updated)
    }
}
