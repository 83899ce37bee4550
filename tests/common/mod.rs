//! Shared test infrastructure.
//!
//! # Test Database Setup
//! - `Fixture::new()` - in-memory stores with the seed below
//! - `setup_test_db()` - empty migrated Postgres schema, only when
//!   `DATABASE_URL` is set
//!
//! The in-memory fixture is seeded with a small step catalog:
//!
//! | id | name          | order | status   |
//! |----|---------------|-------|----------|
//! | 1  | New           | 1     | active   |
//! | 2  | Triage        | 2     | active   |
//! | 3  | Investigation | 3     | active   |
//! | 4  | Escalated     | 4     | active   |
//! | 5  | Resolved      | 5     | active   |
//! | 6  | Closed        | 6     | active   |
//! | 7  | Archived      | 7     | active   |
//! | 8  | Retired       | 8     | inactive |
//!
//! Workflows: Standard `1 → 2 → 3 → 5 → 6`, Escalation `3 → 4 → 5`,
//! Archive `6 → 7 → 8`. Alerts A1..A5 and cases 101, 102 start on step 1.

#![allow(dead_code, unused_macros)]

pub mod memory;

use chrono::Utc;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;

use caseflow::auth::{password, permissions};
use caseflow::config::BulkSettings;
use caseflow::models::step::{CreateWorkflow, Step, StepStatus};
use caseflow::models::work_item::NewWorkItem;
use caseflow::state::AppState;
use caseflow::workflow::{EntityKind, StepRepository, WorkItemStore};

pub use memory::{MemoryAuditSink, MemoryStepRepository, MemoryUserRepository, MemoryWorkItemStore};

// ============================================================================
// TEST CONSTANTS
// ============================================================================

pub const ADMIN_USER: &str = "admin";
pub const VIEWER_USER: &str = "viewer";
pub const TEST_PASS: &str = "Password1!";

pub const NEW: i64 = 1;
pub const TRIAGE: i64 = 2;
pub const INVESTIGATION: i64 = 3;
pub const ESCALATED: i64 = 4;
pub const RESOLVED: i64 = 5;
pub const CLOSED: i64 = 6;
pub const ARCHIVED: i64 = 7;
pub const RETIRED: i64 = 8;

pub const ALERT_IDS: [&str; 5] = ["A1", "A2", "A3", "A4", "A5"];
pub const CASE_IDS: [i64; 2] = [101, 102];

// ============================================================================
// FIXTURE
// ============================================================================

pub struct Fixture {
    pub steps: Arc<MemoryStepRepository>,
    pub alerts: Arc<MemoryWorkItemStore<String>>,
    pub cases: Arc<MemoryWorkItemStore<i64>>,
    pub audit: Arc<MemoryAuditSink>,
    pub users: Arc<MemoryUserRepository>,
    pub bulk: BulkSettings,
}

pub fn step(step_id: i64, name: &str, status: StepStatus) -> Step {
    Step {
        step_id,
        step_name: name.to_string(),
        description: format!("{name} step"),
        step_status_id: status.id(),
        step_order: step_id,
        created_by: "seed".to_string(),
        created_date: Utc::now(),
        updated_by: None,
        updated_date: None,
    }
}

/// Argon2 is slow in debug builds, so the test password is hashed once.
fn test_password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| password::hash_password(TEST_PASS).expect("hash test password"))
}

impl Fixture {
    /// Catalog, workflows, items and users as described in the module docs.
    pub async fn new() -> Self {
        Self::with_bulk(BulkSettings::default()).await
    }

    pub async fn with_bulk(bulk: BulkSettings) -> Self {
        let fixture = Fixture {
            steps: Arc::new(MemoryStepRepository::new()),
            alerts: Arc::new(MemoryWorkItemStore::new(EntityKind::Alert)),
            cases: Arc::new(MemoryWorkItemStore::new(EntityKind::Case)),
            audit: Arc::new(MemoryAuditSink::new()),
            users: Arc::new(MemoryUserRepository::new()),
            bulk,
        };
        fixture.seed().await;
        fixture
    }

    async fn seed(&self) {
        let names = [
            (NEW, "New"),
            (TRIAGE, "Triage"),
            (INVESTIGATION, "Investigation"),
            (ESCALATED, "Escalated"),
            (RESOLVED, "Resolved"),
            (CLOSED, "Closed"),
            (ARCHIVED, "Archived"),
        ];
        for (id, name) in names {
            self.steps.insert_step(step(id, name, StepStatus::Active)).await;
        }
        self.steps
            .insert_step(step(RETIRED, "Retired", StepStatus::Inactive))
            .await;

        let workflows: [(&str, &[i64]); 3] = [
            ("Standard", &[NEW, TRIAGE, INVESTIGATION, RESOLVED, CLOSED]),
            ("Escalation", &[INVESTIGATION, ESCALATED, RESOLVED]),
            ("Archive", &[CLOSED, ARCHIVED, RETIRED]),
        ];
        for (name, steps) in workflows {
            let input = CreateWorkflow {
                name: name.to_string(),
                steps: steps.to_vec(),
            };
            self.steps
                .create_workflow(&input, "seed")
                .await
                .expect("seed workflow");
        }

        for id in ALERT_IDS {
            self.alerts
                .create(
                    &NewWorkItem {
                        id: id.to_string(),
                        title: format!("Alert {id}"),
                        step_id: NEW,
                    },
                    "seed",
                )
                .await
                .expect("seed alert");
        }
        for id in CASE_IDS {
            self.cases
                .create(
                    &NewWorkItem {
                        id,
                        title: format!("Case {id}"),
                        step_id: NEW,
                    },
                    "seed",
                )
                .await
                .expect("seed case");
        }

        self.users
            .add(ADMIN_USER, test_password_hash(), &permissions::ALL.join(","))
            .await;
        self.users
            .add(
                VIEWER_USER,
                test_password_hash(),
                &[permissions::STEP_VIEW, permissions::ALERT_VIEW, permissions::CASE_VIEW].join(","),
            )
            .await;
    }

    pub fn state(&self) -> AppState {
        AppState {
            steps: self.steps.clone(),
            alerts: self.alerts.clone(),
            cases: self.cases.clone(),
            users: self.users.clone(),
            audit: self.audit.clone(),
            bulk: self.bulk.clone(),
            shutdown: CancellationToken::new(),
        }
    }

    pub async fn alert_step(&self, id: &str) -> i64 {
        self.alerts
            .find(&id.to_string())
            .await
            .expect("find alert")
            .expect("alert exists")
            .current_step_id
    }

    pub async fn case_step(&self, id: i64) -> i64 {
        self.cases
            .find(&id)
            .await
            .expect("find case")
            .expect("case exists")
            .current_step_id
    }
}

// ============================================================================
// DATABASE SETUP
// ============================================================================

/// A migrated Postgres schema private to one test.
pub struct TestDb {
    pool: PgPool,
    schema: String,
}

impl TestDb {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Drop the schema and close the pool.
    pub async fn teardown(self) {
        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema))
            .execute(&self.pool)
            .await
            .expect("Failed to drop test schema");
        self.pool.close().await;
    }
}

/// Setup a test database against `DATABASE_URL`.
///
/// Each call creates a fresh schema, points every pooled connection's
/// `search_path` at it and runs the migrations, so tests can run in parallel
/// on one database. Returns `None` when `DATABASE_URL` is not set; callers
/// then skip.
pub async fn setup_test_db() -> Option<TestDb> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres test");
        return None;
    };

    static NEXT_SCHEMA: AtomicU32 = AtomicU32::new(0);
    let schema = format!(
        "caseflow_test_{}_{}",
        std::process::id(),
        NEXT_SCHEMA.fetch_add(1, Ordering::SeqCst)
    );

    let admin = PgPool::connect(&url).await.expect("Failed to connect to DATABASE_URL");
    sqlx::query(&format!("CREATE SCHEMA {schema}"))
        .execute(&admin)
        .await
        .expect("Failed to create test schema");
    admin.close().await;

    let search_path = schema.clone();
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .after_connect(move |conn, _meta| {
            let sql = format!("SET search_path TO {search_path}");
            Box::pin(async move {
                sqlx::query(&sql).execute(conn).await?;
                Ok(())
            })
        })
        .connect(&url)
        .await
        .expect("Failed to open test pool");

    caseflow::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    Some(TestDb { pool, schema })
}

// ============================================================================
// HTTP HELPERS
// ============================================================================

/// Build the API service with session middleware over the fixture's stores.
macro_rules! test_app {
    ($fixture:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(
                    actix_session::SessionMiddleware::builder(
                        actix_session::storage::CookieSessionStore::default(),
                        actix_web::cookie::Key::from(&[7u8; 64]),
                    )
                    .cookie_secure(false)
                    .build(),
                )
                .app_data(actix_web::web::Data::new($fixture.state()))
                .app_data(actix_web::web::Data::new(
                    caseflow::auth::rate_limit::RateLimiter::default(),
                ))
                .service(
                    actix_web::web::scope("/api/v1")
                        .configure(caseflow::handlers::api_v1::configure),
                ),
        )
        .await
    };
}

/// Log in through `POST /api/v1/session` and return the session cookie.
macro_rules! login {
    ($app:expr, $username:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/api/v1/session")
            .set_json(serde_json::json!({
                "username": $username,
                "password": $crate::common::TEST_PASS,
            }))
            .to_request();
        let resp = actix_web::test::call_service(&$app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK, "login failed");
        resp.response()
            .cookies()
            .next()
            .expect("session cookie")
            .into_owned()
    }};
}
