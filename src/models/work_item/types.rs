use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display};
use std::hash::Hash;

/// Which kind of work item an identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Alert,
    Case,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Alert => "alert",
            EntityKind::Case => "case",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Alert => write!(f, "Alert"),
            EntityKind::Case => write!(f, "Case"),
        }
    }
}

/// Identifier of an alert (`String`) or case (`i64`).
pub trait EntityId:
    Clone + Eq + Ord + Hash + Debug + Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl EntityId for String {}
impl EntityId for i64 {}

/// An alert or case as far as the workflow is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem<Id> {
    pub id: Id,
    pub title: String,
    pub current_step_id: i64,
    pub created_by: String,
    pub created_date: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkItem<Id> {
    pub id: Id,
    #[serde(default)]
    pub title: String,
    pub step_id: i64,
}

/// A validated step change ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepChange<Id> {
    pub id: Id,
    pub from_step_id: i64,
    pub to_step_id: i64,
    pub reason: Option<String>,
    pub actor: String,
}

/// Append-only record of one step transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepHistoryEntry<Id> {
    pub history_id: i64,
    pub entity_id: Id,
    pub from_step_id: i64,
    pub to_step_id: i64,
    pub reason: Option<String>,
    pub actor: String,
    pub changed_at: DateTime<Utc>,
}
