use sqlx::PgPool;
use std::sync::Arc;

use roster_app::{
    app_bus::AppBus,
    config::Config,
    jobs::{chunking::ThresholdChunkPolicy, executor::BatchExecutor, supervisor::JobSupervisor},
};
use roster_db::{
    bootstrap_protected_collection, establish_connection_pool, uow::PostgresUnitOfWorkProvider,
};
use roster_types::{Result, errors::ApplicationError};
use roster_web::{AppState, WebRouter};

mod logs;
use logs::setup_logging;

#[tokio::main]
#[cfg(not(tarpaulin_include))]
async fn main() -> Result<(), ApplicationError> {
    let _log_guard = setup_logging();
    let (config, app_bus, supervisor) = setup_app().await?;
    let state = AppState::new(app_bus, supervisor.clone());

    // Also resumes jobs left behind by a previous run, on its first tick.
    let _recovery = supervisor.run();
    WebRouter::serve(state, config.http_port).await
}

async fn setup_app() -> Result<(Arc<Config>, Arc<AppBus>, Arc<JobSupervisor>), ApplicationError> {
    let config = Arc::new(Config::from_env());
    let db_pool = establish_connection_pool().await?;

    sqlx::migrate!("../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| ApplicationError::Unknown(e.to_string()))?;

    setup_protected_collection(&db_pool, &config).await?;

    let uow_provider = Arc::new(PostgresUnitOfWorkProvider::new(db_pool));
    let app_bus = Arc::new(AppBus::new(config.clone(), uow_provider.clone()));
    let executor = Arc::new(BatchExecutor::new(
        uow_provider,
        Arc::new(ThresholdChunkPolicy::from_config(&config)),
        config.clone(),
    ));
    tracing::info!(worker_id = %executor.worker_id(), "Batch executor ready");
    let supervisor = Arc::new(JobSupervisor::new(app_bus.clone(), executor));

    Ok((config, app_bus, supervisor))
}

async fn setup_protected_collection(pool: &PgPool, config: &Config) -> Result<(), ApplicationError> {
    match bootstrap_protected_collection(pool, &config.protected_collection).await {
        Ok(true) => tracing::info!(
            "Protected collection '{}' created.",
            config.protected_collection
        ),
        Ok(false) => tracing::info!(
            "Protected collection '{}' already present.",
            config.protected_collection
        ),
        Err(e) => {
            tracing::error!("Error while creating the protected collection: {e}");
            return Err(e);
        }
    }

    Ok(())
}
