//! Step and workflow administration.

use super::catalog::StepCatalog;
use super::store::{StepRepository, WorkItemStore};
use crate::errors::AppError;
use crate::models::step::{
    CreateStep, CreateWorkflow, Step, StepChanges, StepDetail, StepStatus, StepTransitionResult,
    Workflow,
};

pub async fn detail(repo: &dyn StepRepository, step: Step) -> Result<StepDetail, AppError> {
    let associated_workflow_count = repo.associated_workflow_count(step.step_id).await?;
    let step_status = StepStatus::from_id(step.step_status_id)
        .map(StepStatus::name)
        .unwrap_or("UNKNOWN");
    Ok(StepDetail {
        step,
        step_status,
        associated_workflow_count,
    })
}

pub async fn get(repo: &dyn StepRepository, step_id: i64) -> Result<StepDetail, AppError> {
    let step = repo
        .find_step(step_id)
        .await?
        .ok_or(AppError::StepNotFound(step_id))?;
    detail(repo, step).await
}

pub async fn create(
    repo: &dyn StepRepository,
    input: &CreateStep,
    actor: &str,
) -> Result<Step, AppError> {
    let errors = input.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    if repo.find_step_by_name(&input.step_name).await?.is_some() {
        return Err(AppError::DuplicateStepName(input.step_name.trim().to_string()));
    }
    let step = repo.create_step(input, actor).await?;
    log::info!("Step {} '{}' created by {}", step.step_id, step.step_name, actor);
    Ok(step)
}

/// Apply a partial update. Used for both full replacement and patch.
pub async fn update(
    repo: &dyn StepRepository,
    step_id: i64,
    changes: &StepChanges,
    actor: &str,
) -> Result<Step, AppError> {
    let errors = changes.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    if let Some(name) = &changes.step_name {
        if let Some(existing) = repo.find_step_by_name(name).await? {
            if existing.step_id != step_id {
                return Err(AppError::DuplicateStepName(name.trim().to_string()));
            }
        }
    }
    repo.update_step(step_id, changes, actor)
        .await?
        .ok_or(AppError::StepNotFound(step_id))
}

/// Delete a step that no workflow references and no alert or case sits on.
pub async fn delete(
    repo: &dyn StepRepository,
    alerts: &dyn WorkItemStore<String>,
    cases: &dyn WorkItemStore<i64>,
    step_id: i64,
) -> Result<(), AppError> {
    if repo.find_step(step_id).await?.is_none() {
        return Err(AppError::StepNotFound(step_id));
    }

    let associated_workflow_count = repo.associated_workflow_count(step_id).await?;
    if associated_workflow_count > 0 {
        return Err(AppError::StepInUse { step_id, associated_workflow_count });
    }

    let occupied = alerts.count_on_step(step_id).await? + cases.count_on_step(step_id).await?;
    if occupied > 0 {
        return Err(AppError::Conflict(format!(
            "Step {step_id} is the current step of {occupied} alert(s) or case(s)"
        )));
    }

    if !repo.delete_step(step_id).await? {
        return Err(AppError::StepNotFound(step_id));
    }
    Ok(())
}

pub async fn transitions(
    repo: &dyn StepRepository,
    step_id: i64,
) -> Result<StepTransitionResult, AppError> {
    StepCatalog::load(repo).await?.transitions(step_id)
}

pub async fn create_workflow(
    repo: &dyn StepRepository,
    input: &CreateWorkflow,
    actor: &str,
) -> Result<Workflow, AppError> {
    let errors = input.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    for step_id in &input.steps {
        if repo.find_step(*step_id).await?.is_none() {
            return Err(AppError::StepNotFound(*step_id));
        }
    }
    let workflow = repo.create_workflow(input, actor).await?;
    log::info!(
        "Workflow {} '{}' created by {} with {} step(s)",
        workflow.workflow_id,
        workflow.name,
        actor,
        workflow.steps.len()
    );
    Ok(workflow)
}
