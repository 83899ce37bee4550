use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::auth::permissions;
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::step::{self, CreateStep, CreateWorkflow};
use crate::models::user;

const SEED_ACTOR: &str = "system";

/// Catalog installed on an empty database, in display order.
const SEED_STEPS: &[(&str, &str)] = &[
    ("New", "Freshly raised, not yet looked at"),
    ("Triage", "Being assessed for relevance and severity"),
    ("Investigation", "Under active investigation"),
    ("Escalated", "Handed to a senior analyst"),
    ("Closed", "Resolved or dismissed"),
];

/// Seed workflows as ordered step names.
const SEED_WORKFLOWS: &[(&str, &[&str])] = &[
    ("Standard", &["New", "Triage", "Investigation", "Closed"]),
    ("Escalation", &["Investigation", "Escalated", "Closed"]),
];

pub async fn init_pool(config: &AppConfig) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    log::info!("Connected to database (max {} connections)", config.max_connections);
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::Db(sqlx::Error::Migrate(Box::new(e))))?;
    log::info!("Database migrations complete");
    Ok(())
}

/// Install the default steps and workflows, but only when no step exists yet.
/// Steps and workflows go in together or not at all.
pub async fn seed_catalog(pool: &PgPool) -> Result<(), AppError> {
    if !step::find_all(pool).await?.is_empty() {
        log::info!("Step catalog already present, skipping seed");
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    let mut ids = Vec::with_capacity(SEED_STEPS.len());
    for (position, (name, description)) in SEED_STEPS.iter().enumerate() {
        let input = CreateStep {
            step_name: name.to_string(),
            description: description.to_string(),
            step_status_id: None,
            step_order: Some(position as i64 + 1),
        };
        let created = step::create(&mut *tx, &input, SEED_ACTOR).await?;
        ids.push((*name, created.step_id));
    }

    for (name, step_names) in SEED_WORKFLOWS {
        let steps = step_names
            .iter()
            .filter_map(|n| ids.iter().find(|(id_name, _)| id_name == n).map(|(_, id)| *id))
            .collect();
        let input = CreateWorkflow { name: name.to_string(), steps };
        step::insert_workflow(&mut tx, &input, SEED_ACTOR).await?;
    }
    tx.commit().await?;

    log::info!(
        "Seeded {} steps and {} workflows",
        SEED_STEPS.len(),
        SEED_WORKFLOWS.len()
    );
    Ok(())
}

/// Create the admin user, or reset its password, with every permission.
pub async fn seed_admin(pool: &PgPool, password_hash: &str) -> Result<(), AppError> {
    user::upsert(pool, "admin", password_hash, &permissions::ALL.join(",")).await?;
    log::info!("Admin user ready");
    Ok(())
}
