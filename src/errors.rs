use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use std::fmt;

use crate::workflow::EntityKind;

#[derive(Debug)]
pub enum AppError {
    Db(sqlx::Error),
    Hash(String),
    Session(String),
    Unauthorized,
    PermissionDenied(String),
    NotFound,
    Validation(Vec<String>),
    EntityNotFound { kind: EntityKind, id: String },
    StepNotFound(i64),
    InvalidTransition { step_id: i64, allowed: Vec<i64> },
    DuplicateStepName(String),
    StepInUse { step_id: i64, associated_workflow_count: i64 },
    Conflict(String),
}

impl AppError {
    /// Message safe to hand back to API clients. Driver errors are reduced to a
    /// generic persistence failure; everything else uses `Display`.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Db(_) => "Persistence failure while applying the change".to_string(),
            AppError::Hash(_) | AppError::Session(_) => "Internal error".to_string(),
            _ => self.to_string(),
        }
    }
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Hash(e) => write!(f, "Hash error: {e}"),
            AppError::Session(e) => write!(f, "Session error: {e}"),
            AppError::Unauthorized => write!(f, "Authentication required"),
            AppError::PermissionDenied(code) => write!(f, "Permission denied: {code}"),
            AppError::NotFound => write!(f, "Not found"),
            AppError::Validation(errors) => write!(f, "Validation failed: {}", errors.join("; ")),
            AppError::EntityNotFound { kind, id } => write!(f, "{kind} {id} not found"),
            AppError::StepNotFound(step_id) => write!(f, "Step {step_id} not found"),
            AppError::InvalidTransition { step_id, allowed } => {
                if allowed.is_empty() {
                    write!(f, "Invalid transition to step {step_id}: no transitions allowed from the current step")
                } else {
                    write!(f, "Invalid transition to step {step_id}: allowed steps are [{}]", join_ids(allowed))
                }
            }
            AppError::DuplicateStepName(name) => write!(f, "Step name '{name}' already exists"),
            AppError::StepInUse { step_id, associated_workflow_count } => write!(
                f,
                "Step {step_id} is still referenced by {associated_workflow_count} workflow(s)"
            ),
            AppError::Conflict(msg) => write!(f, "Conflict: {msg}"),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::NotFound | AppError::EntityNotFound { .. } | AppError::StepNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::DuplicateStepName(_) | AppError::StepInUse { .. } | AppError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            AppError::Db(_) | AppError::Hash(_) | AppError::Session(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            AppError::Validation(errors) => serde_json::json!({
                "error": "Validation failed",
                "details": errors,
            }),
            AppError::InvalidTransition { step_id, allowed } => serde_json::json!({
                "error": self.to_string(),
                "stepId": step_id,
                "allowedStepIds": allowed,
            }),
            AppError::StepInUse { step_id, associated_workflow_count } => serde_json::json!({
                "error": self.to_string(),
                "stepId": step_id,
                "associatedWorkflowCount": associated_workflow_count,
            }),
            _ if status.is_server_error() => {
                log::error!("{self}");
                serde_json::json!({ "error": "Internal Server Error" })
            }
            _ => serde_json::json!({ "error": self.to_string() }),
        };
        HttpResponse::build(status).json(body)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Db(e)
    }
}
