use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use budtender_agent::{HttpLlmClient, TurnEngine};
use budtender_core::config::{AppConfig, ConfigError, LoadOptions};
use budtender_db::repositories::{SqlCatalogRepository, SqlContextStore};
use budtender_db::{connect_with_settings, migrations, DbPool};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub engine: Arc<TurnEngine>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client construction failed: {0}")]
    LlmClient(#[source] anyhow::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let llm = Arc::new(HttpLlmClient::new(&config.llm).map_err(BootstrapError::LlmClient)?);
    let engine = Arc::new(TurnEngine::new(
        Arc::new(SqlContextStore::new(db_pool.clone())),
        Arc::new(SqlCatalogRepository::new(db_pool.clone())),
        llm,
        Duration::from_secs(config.llm.timeout_secs),
    ));
    info!(
        event_name = "system.bootstrap.engine_ready",
        model = %config.llm.model,
        "turn engine constructed"
    );

    Ok(Application { config, db_pool, engine })
}
