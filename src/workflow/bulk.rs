use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::catalog::StepCatalog;
use super::changer::StepChanger;
use super::store::{AuditSink, StepRepository, WorkItemStore};
use crate::config::BulkSettings;
use crate::errors::AppError;
use crate::models::work_item::EntityId;

const CANCELLED_MESSAGE: &str = "Cancelled before processing";

/// Move a batch of alerts (`Id = String`) or cases (`Id = i64`) to one step.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkStepChangeRequest<Id> {
    pub entity_ids: Option<Vec<Id>>,
    pub step_id: Option<i64>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub skip_validation: bool,
}

impl<Id: EntityId> BulkStepChangeRequest<Id> {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        match &self.entity_ids {
            None => errors.push("entityIds is required".to_string()),
            Some(ids) if ids.is_empty() => errors.push("entityIds must not be empty".to_string()),
            Some(_) => {}
        }
        if self.step_id.is_none() {
            errors.push("stepId is required".to_string());
        }
        errors
    }

    /// Requested ids with duplicates removed, first occurrence kept.
    pub fn distinct_ids(&self) -> Vec<Id> {
        let mut seen = HashSet::new();
        self.entity_ids
            .iter()
            .flatten()
            .filter(|id| seen.insert((*id).clone()))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkStepChangeResponse<Id: Ord> {
    pub total_requested: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub successful_ids: Vec<Id>,
    pub failed_items: BTreeMap<Id, String>,
    pub validation_errors: Vec<String>,
}

impl<Id: Ord> BulkStepChangeResponse<Id> {
    /// Request-level rejection: nothing was processed.
    pub fn rejected(validation_errors: Vec<String>) -> Self {
        Self {
            total_requested: 0,
            success_count: 0,
            failure_count: 0,
            successful_ids: Vec::new(),
            failed_items: BTreeMap::new(),
            validation_errors,
        }
    }

    pub fn is_rejected(&self) -> bool {
        !self.validation_errors.is_empty()
    }
}

/// Accumulates per-item outcomes, in the order they are recorded.
#[derive(Debug)]
pub struct BulkOutcome<Id: Ord> {
    total_requested: usize,
    successful_ids: Vec<Id>,
    failed_items: BTreeMap<Id, String>,
}

impl<Id: Ord> BulkOutcome<Id> {
    pub fn new(total_requested: usize) -> Self {
        Self {
            total_requested,
            successful_ids: Vec::new(),
            failed_items: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, id: Id, outcome: Result<(), String>) {
        match outcome {
            Ok(()) => self.successful_ids.push(id),
            Err(message) => {
                self.failed_items.insert(id, message);
            }
        }
    }

    pub fn into_response(self) -> BulkStepChangeResponse<Id> {
        BulkStepChangeResponse {
            total_requested: self.total_requested,
            success_count: self.successful_ids.len(),
            failure_count: self.failed_items.len(),
            successful_ids: self.successful_ids,
            failed_items: self.failed_items,
            validation_errors: Vec::new(),
        }
    }
}

/// Applies one target step to many items. A failing item is recorded and the
/// batch carries on; successful items are never rolled back.
pub struct BulkStepChanger<'a, Id: EntityId> {
    store: &'a dyn WorkItemStore<Id>,
    steps: &'a dyn StepRepository,
    audit: &'a dyn AuditSink,
    settings: &'a BulkSettings,
}

impl<'a, Id: EntityId> BulkStepChanger<'a, Id> {
    pub fn new(
        store: &'a dyn WorkItemStore<Id>,
        steps: &'a dyn StepRepository,
        audit: &'a dyn AuditSink,
        settings: &'a BulkSettings,
    ) -> Self {
        Self { store, steps, audit, settings }
    }

    /// Run the batch. Only a failure to load the step catalog is returned as
    /// an error; everything item-related ends up in the response.
    ///
    /// Once `cancel` fires or the configured timeout passes, no further items
    /// are started. Items already running complete, and the ones never started
    /// are reported as failed.
    pub async fn run(
        &self,
        request: &BulkStepChangeRequest<Id>,
        actor: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<BulkStepChangeResponse<Id>, AppError> {
        let errors = request.validate();
        if !errors.is_empty() {
            return Ok(BulkStepChangeResponse::rejected(errors));
        }
        let Some(step_id) = request.step_id else {
            return Ok(BulkStepChangeResponse::rejected(vec!["stepId is required".to_string()]));
        };

        let ids = request.distinct_ids();
        let catalog = StepCatalog::load(self.steps).await?;
        let changer = StepChanger::new(self.store, &catalog, self.audit);
        let changer = &changer;

        let kind = self.store.kind();
        let reason = request.reason.as_deref();
        let skip_validation = request.skip_validation;
        let deadline = self.settings.timeout.map(|t| Instant::now() + t);

        let mut outcome = BulkOutcome::new(ids.len());

        let results: Vec<(Id, Result<(), String>)> = stream::iter(ids)
            .map(|id| async move {
                let stopped = cancel.is_some_and(|c| c.is_cancelled())
                    || deadline.is_some_and(|d| Instant::now() >= d);
                if stopped {
                    return (id, Err(CANCELLED_MESSAGE.to_string()));
                }

                let result = changer
                    .change_step(&id, step_id, reason, skip_validation, actor)
                    .await
                    .map(|_| ())
                    .map_err(|e| {
                        log::warn!("Bulk step change: {kind} {id} -> step {step_id} failed: {e}");
                        e.client_message()
                    });
                (id, result)
            })
            .buffered(self.settings.concurrency.max(1))
            .collect()
            .await;

        for (id, result) in results {
            outcome.record(id, result);
        }

        let response = outcome.into_response();
        log::info!(
            "Bulk step change by {actor}: {kind} -> step {step_id}, {} requested, {} succeeded, {} failed",
            response.total_requested,
            response.success_count,
            response.failure_count
        );
        Ok(response)
    }
}
