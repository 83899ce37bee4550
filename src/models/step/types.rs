use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MAX_STEP_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 1000;

/// Fixed status catalog for steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepStatus {
    Active,
    Inactive,
}

impl StepStatus {
    pub const ALL: [StepStatus; 2] = [StepStatus::Active, StepStatus::Inactive];

    pub fn id(self) -> i64 {
        match self {
            StepStatus::Active => 1,
            StepStatus::Inactive => 2,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            StepStatus::Active => "ACTIVE",
            StepStatus::Inactive => "INACTIVE",
        }
    }
}

/// A named stage in an alert or case workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub step_id: i64,
    pub step_name: String,
    pub description: String,
    pub step_status_id: i64,
    pub step_order: i64,
    pub created_by: String,
    pub created_date: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_date: Option<DateTime<Utc>>,
}

impl Step {
    pub fn is_active(&self) -> bool {
        self.step_status_id == StepStatus::Active.id()
    }

    pub fn info(&self) -> StepInfo {
        StepInfo {
            label: self.step_name.clone(),
            step_id: self.step_id,
        }
    }
}

/// Reduced projection of a step used in transition results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInfo {
    pub label: String,
    pub step_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTransitionResult {
    pub next_steps: Vec<StepInfo>,
    pub back_steps: Vec<StepInfo>,
}

impl StepTransitionResult {
    pub fn contains(&self, step_id: i64) -> bool {
        self.next_steps
            .iter()
            .chain(self.back_steps.iter())
            .any(|s| s.step_id == step_id)
    }

    /// Step ids in `next_steps` followed by `back_steps`.
    pub fn allowed_ids(&self) -> Vec<i64> {
        self.next_steps
            .iter()
            .chain(self.back_steps.iter())
            .map(|s| s.step_id)
            .collect()
    }
}

/// Step as returned by the admin API, with the number of workflows using it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDetail {
    #[serde(flatten)]
    pub step: Step,
    pub step_status: &'static str,
    pub associated_workflow_count: i64,
}

/// Create-step request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStep {
    pub step_name: String,
    #[serde(default)]
    pub description: String,
    pub step_status_id: Option<i64>,
    /// Appended after the last step when absent.
    pub step_order: Option<i64>,
}

impl CreateStep {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        validate_name(&self.step_name, &mut errors);
        validate_description(&self.description, &mut errors);
        if let Some(status) = self.step_status_id {
            validate_status(status, &mut errors);
        }
        errors
    }

    pub fn status_id(&self) -> i64 {
        self.step_status_id.unwrap_or(StepStatus::Active.id())
    }
}

/// Full replacement body for `PUT /steps/{id}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStep {
    pub step_name: String,
    #[serde(default)]
    pub description: String,
    pub step_status_id: i64,
    pub step_order: i64,
}

impl From<UpdateStep> for StepChanges {
    fn from(u: UpdateStep) -> Self {
        StepChanges {
            step_name: Some(u.step_name),
            description: Some(u.description),
            step_status_id: Some(u.step_status_id),
            step_order: Some(u.step_order),
        }
    }
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepChanges {
    pub step_name: Option<String>,
    pub description: Option<String>,
    pub step_status_id: Option<i64>,
    pub step_order: Option<i64>,
}

impl StepChanges {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.is_empty() {
            errors.push("At least one field must be provided".to_string());
        }
        if let Some(name) = &self.step_name {
            validate_name(name, &mut errors);
        }
        if let Some(description) = &self.description {
            validate_description(description, &mut errors);
        }
        if let Some(status) = self.step_status_id {
            validate_status(status, &mut errors);
        }
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.step_name.is_none()
            && self.description.is_none()
            && self.step_status_id.is_none()
            && self.step_order.is_none()
    }
}

/// An ordered sequence of steps. Adjacent entries define the allowed
/// forward and backward transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub workflow_id: i64,
    pub name: String,
    pub steps: Vec<i64>,
    pub created_by: String,
    pub created_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkflow {
    pub name: String,
    pub steps: Vec<i64>,
}

impl CreateWorkflow {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("Workflow name is required".to_string());
        }
        if self.steps.is_empty() {
            errors.push("A workflow needs at least one step".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for step_id in &self.steps {
            if !seen.insert(*step_id) {
                errors.push(format!("Step {step_id} appears more than once"));
            }
        }
        errors
    }
}

fn validate_name(name: &str, errors: &mut Vec<String>) {
    if name.trim().is_empty() {
        errors.push("Step name is required".to_string());
    } else if name.trim().len() > MAX_STEP_NAME_LEN {
        errors.push(format!("Step name must be {MAX_STEP_NAME_LEN} characters or less"));
    }
}

fn validate_description(description: &str, errors: &mut Vec<String>) {
    if description.len() > MAX_DESCRIPTION_LEN {
        errors.push(format!("Description must be {MAX_DESCRIPTION_LEN} characters or less"));
    }
}

fn validate_status(status: i64, errors: &mut Vec<String>) {
    if StepStatus::from_id(status).is_none() {
        errors.push(format!("Unknown step status id {status}"));
    }
}
