use sqlx::PgPool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::auth::permissions;
use crate::config::BulkSettings;
use crate::models::work_item::{AlertTable, CaseTable, EntityId, EntityKind};
use crate::workflow::postgres::{PgAuditSink, PgStepRepository, PgUserRepository, PgWorkItemStore};
use crate::workflow::{AuditSink, StepRepository, UserRepository, WorkItemStore};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub steps: Arc<dyn StepRepository>,
    pub alerts: Arc<dyn WorkItemStore<String>>,
    pub cases: Arc<dyn WorkItemStore<i64>>,
    pub users: Arc<dyn UserRepository>,
    pub audit: Arc<dyn AuditSink>,
    pub bulk: BulkSettings,
    /// Cancelled on shutdown; running bulk changes stop starting new items.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn postgres(pool: PgPool, bulk: BulkSettings) -> Self {
        Self {
            steps: Arc::new(PgStepRepository::new(pool.clone())),
            alerts: Arc::new(PgWorkItemStore::<AlertTable>::new(pool.clone())),
            cases: Arc::new(PgWorkItemStore::<CaseTable>::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool.clone())),
            audit: Arc::new(PgAuditSink::new(pool)),
            bulk,
            shutdown: CancellationToken::new(),
        }
    }
}

/// Selects the alert or case side of the state for the generic work item
/// handlers.
pub trait WorkItemKind: 'static {
    type Id: EntityId;
    const KIND: EntityKind;
    const VIEW_PERMISSION: &'static str;
    const EDIT_PERMISSION: &'static str;
    const CHANGE_STEP_PERMISSION: &'static str;

    fn store(state: &AppState) -> &dyn WorkItemStore<Self::Id>;
}

pub struct Alerts;

impl WorkItemKind for Alerts {
    type Id = String;
    const KIND: EntityKind = EntityKind::Alert;
    const VIEW_PERMISSION: &'static str = permissions::ALERT_VIEW;
    const EDIT_PERMISSION: &'static str = permissions::ALERT_EDIT;
    const CHANGE_STEP_PERMISSION: &'static str = permissions::ALERT_CHANGE_STEP;

    fn store(state: &AppState) -> &dyn WorkItemStore<String> {
        state.alerts.as_ref()
    }
}

pub struct Cases;

impl WorkItemKind for Cases {
    type Id = i64;
    const KIND: EntityKind = EntityKind::Case;
    const VIEW_PERMISSION: &'static str = permissions::CASE_VIEW;
    const EDIT_PERMISSION: &'static str = permissions::CASE_EDIT;
    const CHANGE_STEP_PERMISSION: &'static str = permissions::CASE_CHANGE_STEP;

    fn store(state: &AppState) -> &dyn WorkItemStore<i64> {
        state.cases.as_ref()
    }
}
