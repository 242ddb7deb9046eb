use std::{any::type_name, sync::Arc};
use tracing::debug;

use roster_types::{Result, errors::ApplicationError};

use crate::{
    config::Config,
    cqrs::{Command, CommandHandler, Query, QueryHandler},
    uow::UnitOfWorkProvider,
};

/// Runs commands and queries, each in its own unit of work.
///
/// Handlers hold the logic; the bus owns transaction boundaries. Batch
/// execution bypasses it, since a job spans many transactions.
pub struct AppBus {
    config: Arc<Config>,
    uow_provider: Arc<dyn UnitOfWorkProvider>,
}

impl AppBus {
    pub fn new(config: Arc<Config>, uow_provider: Arc<dyn UnitOfWorkProvider>) -> Self {
        Self {
            config,
            uow_provider,
        }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Commits when the handler succeeds, rolls back otherwise.
    pub async fn execute<C, H>(&self, cmd: C, handler: H) -> Result<(), ApplicationError>
    where
        C: Command,
        H: CommandHandler<C>,
    {
        let uow = self.uow_provider.begin().await?;

        match handler.handle(cmd, &uow, &self.config).await {
            Ok(()) => uow.commit().await,
            Err(e) => {
                debug!(command = type_name::<C>(), "Command rejected: {e}");
                uow.rollback().await?;
                Err(e)
            }
        }
    }

    /// Reads are always rolled back.
    pub async fn query<Q, H>(&self, query: Q, handler: H) -> Result<Q::Output, ApplicationError>
    where
        Q: Query,
        H: QueryHandler<Q>,
    {
        let uow = self.uow_provider.begin().await?;
        let result = handler.handle(query, &uow, &self.config).await;
        uow.rollback().await?;

        result
    }
}
