use actix_session::Session;
use actix_web::{web, HttpResponse};
use std::collections::HashMap;

use super::types::{PageParams, PaginatedResponse};
use crate::auth::permissions;
use crate::auth::session::require_permission;
use crate::errors::AppError;
use crate::models::step::{CreateStep, StepChanges, UpdateStep};
use crate::state::AppState;
use crate::workflow::steps;

/// GET /api/v1/steps - List steps in catalog order with pagination
/// Query params: page (default 1), per_page (default 25)
pub async fn list(
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, permissions::STEP_VIEW)?;

    let params = PageParams::from_query(&query);
    let all_steps = state.steps.list_steps().await?;
    let total = all_steps.len() as i64;

    let mut items = Vec::new();
    for step in params.slice(all_steps) {
        items.push(steps::detail(state.steps.as_ref(), step).await?);
    }

    Ok(HttpResponse::Ok().json(PaginatedResponse {
        items,
        page: params.page,
        per_page: params.per_page,
        total,
    }))
}

/// GET /api/v1/steps/{id}
pub async fn read(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, permissions::STEP_VIEW)?;

    let detail = steps::get(state.steps.as_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// POST /api/v1/steps
pub async fn create(
    state: web::Data<AppState>,
    session: Session,
    body: web::Json<CreateStep>,
) -> Result<HttpResponse, AppError> {
    let actor = require_permission(&session, permissions::STEP_MANAGE)?;

    let step = steps::create(state.steps.as_ref(), &body, &actor).await?;
    let detail = steps::detail(state.steps.as_ref(), step).await?;
    Ok(HttpResponse::Created().json(detail))
}

/// PUT /api/v1/steps/{id} - Replace all mutable fields
pub async fn update(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<UpdateStep>,
) -> Result<HttpResponse, AppError> {
    let actor = require_permission(&session, permissions::STEP_MANAGE)?;

    let changes = StepChanges::from(body.into_inner());
    let step = steps::update(state.steps.as_ref(), path.into_inner(), &changes, &actor).await?;
    let detail = steps::detail(state.steps.as_ref(), step).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// PATCH /api/v1/steps/{id} - Update only the provided fields
pub async fn patch(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<StepChanges>,
) -> Result<HttpResponse, AppError> {
    let actor = require_permission(&session, permissions::STEP_MANAGE)?;

    let step = steps::update(state.steps.as_ref(), path.into_inner(), &body, &actor).await?;
    let detail = steps::detail(state.steps.as_ref(), step).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// DELETE /api/v1/steps/{id}
pub async fn delete(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let actor = require_permission(&session, permissions::STEP_MANAGE)?;
    let step_id = path.into_inner();

    steps::delete(
        state.steps.as_ref(),
        state.alerts.as_ref(),
        state.cases.as_ref(),
        step_id,
    )
    .await?;
    log::info!("Step {step_id} deleted by {actor}");

    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/v1/steps/{id}/transitions - Next and back steps reachable from the step
pub async fn transitions(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, permissions::STEP_VIEW)?;

    let result = steps::transitions(state.steps.as_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(result))
}
