//! Alert and case endpoints. Every handler is generic over [`WorkItemKind`]
//! and registered once per kind in [`super::configure`].

use actix_session::Session;
use actix_web::{web, HttpResponse};

use super::types::ChangeStepRequest;
use crate::auth::session::require_permission;
use crate::errors::AppError;
use crate::models::work_item::NewWorkItem;
use crate::state::{AppState, WorkItemKind};
use crate::workflow::{BulkStepChangeRequest, BulkStepChanger, StepCatalog, StepChanger};

const MAX_TITLE_LEN: usize = 500;

fn validate_new<K: WorkItemKind>(input: &NewWorkItem<K::Id>) -> Vec<String> {
    let mut errors = Vec::new();
    if input.id.to_string().trim().is_empty() {
        errors.push(format!("{} id is required", K::KIND));
    }
    if input.title.len() > MAX_TITLE_LEN {
        errors.push(format!("title must be at most {MAX_TITLE_LEN} characters"));
    }
    errors
}

/// POST /api/v1/{alerts|cases}
pub async fn create<K: WorkItemKind>(
    state: web::Data<AppState>,
    session: Session,
    body: web::Json<NewWorkItem<K::Id>>,
) -> Result<HttpResponse, AppError> {
    let actor = require_permission(&session, K::EDIT_PERMISSION)?;

    let errors = validate_new::<K>(&body);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    if state.steps.find_step(body.step_id).await?.is_none() {
        return Err(AppError::StepNotFound(body.step_id));
    }

    let item = K::store(&state).create(&body, &actor).await?;
    log::info!("{} {} created on step {} by {}", K::KIND, item.id, item.current_step_id, actor);
    Ok(HttpResponse::Created().json(item))
}

/// GET /api/v1/{alerts|cases}/{id}
pub async fn read<K: WorkItemKind>(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<K::Id>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, K::VIEW_PERMISSION)?;

    let id = path.into_inner();
    let item = K::store(&state)
        .find(&id)
        .await?
        .ok_or_else(|| AppError::EntityNotFound { kind: K::KIND, id: id.to_string() })?;
    Ok(HttpResponse::Ok().json(item))
}

/// GET /api/v1/{alerts|cases}/{id}/history - Step transitions, oldest first
pub async fn history<K: WorkItemKind>(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<K::Id>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, K::VIEW_PERMISSION)?;

    let id = path.into_inner();
    let store = K::store(&state);
    if store.find(&id).await?.is_none() {
        return Err(AppError::EntityNotFound { kind: K::KIND, id: id.to_string() });
    }
    let entries = store.history(&id).await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// POST /api/v1/{alerts|cases}/{id}/step - Move one item to another step
pub async fn change_step<K: WorkItemKind>(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<K::Id>,
    body: web::Json<ChangeStepRequest>,
) -> Result<HttpResponse, AppError> {
    let actor = require_permission(&session, K::CHANGE_STEP_PERMISSION)?;

    let id = path.into_inner();
    let catalog = StepCatalog::load(state.steps.as_ref()).await?;
    let changer = StepChanger::new(K::store(&state), &catalog, state.audit.as_ref());
    let item = changer
        .change_step(
            &id,
            body.step_id,
            body.reason.as_deref(),
            body.skip_validation,
            &actor,
        )
        .await?;

    Ok(HttpResponse::Ok().json(item))
}

/// POST /api/v1/{alerts|cases}/bulk-step-change
///
/// 200 with per-item results once the batch ran, 400 with the same response
/// shape when the request itself is invalid.
pub async fn bulk_step_change<K: WorkItemKind>(
    state: web::Data<AppState>,
    session: Session,
    body: web::Json<BulkStepChangeRequest<K::Id>>,
) -> Result<HttpResponse, AppError> {
    let actor = require_permission(&session, K::CHANGE_STEP_PERMISSION)?;

    let changer = BulkStepChanger::new(
        K::store(&state),
        state.steps.as_ref(),
        state.audit.as_ref(),
        &state.bulk,
    );
    let response = changer.run(&body, &actor, Some(&state.shutdown)).await?;

    if response.is_rejected() {
        return Ok(HttpResponse::BadRequest().json(response));
    }
    Ok(HttpResponse::Ok().json(response))
}
