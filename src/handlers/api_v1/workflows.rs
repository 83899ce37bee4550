use actix_session::Session;
use actix_web::{web, HttpResponse};

use crate::auth::permissions;
use crate::auth::session::require_permission;
use crate::errors::AppError;
use crate::models::step::CreateWorkflow;
use crate::state::AppState;
use crate::workflow::steps;

/// GET /api/v1/workflows
pub async fn list(
    state: web::Data<AppState>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, permissions::STEP_VIEW)?;

    let workflows = state.steps.list_workflows().await?;
    Ok(HttpResponse::Ok().json(workflows))
}

/// POST /api/v1/workflows
pub async fn create(
    state: web::Data<AppState>,
    session: Session,
    body: web::Json<CreateWorkflow>,
) -> Result<HttpResponse, AppError> {
    let actor = require_permission(&session, permissions::STEP_MANAGE)?;

    let workflow = steps::create_workflow(state.steps.as_ref(), &body, &actor).await?;
    Ok(HttpResponse::Created().json(workflow))
}

/// DELETE /api/v1/workflows/{id}
pub async fn delete(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let actor = require_permission(&session, permissions::STEP_MANAGE)?;
    let workflow_id = path.into_inner();

    if !state.steps.delete_workflow(workflow_id).await? {
        return Err(AppError::NotFound);
    }
    log::info!("Workflow {workflow_id} deleted by {actor}");

    Ok(HttpResponse::NoContent().finish())
}
