use async_trait::async_trait;
use std::sync::Arc;

use roster_types::errors::ApplicationError;

use crate::{config::Config, uow::UnitOfWork};

pub mod commands;
pub mod queries;

/// Writes. Executed by the `AppBus` inside a transaction that commits only
/// when the handler succeeds.
pub trait Command: Send + Sync {}

#[async_trait]
pub trait CommandHandler<C: Command> {
    /// Never commits nor rolls back `uow` itself.
    async fn handle(
        &self,
        cmd: C,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        config: &Arc<Config>,
    ) -> Result<(), ApplicationError>;
}

/// Reads. Their transaction is always rolled back.
pub trait Query: Send + Sync {
    type Output: Send + Sync;
}

#[async_trait]
pub trait QueryHandler<Q: Query> {
    async fn handle(
        &self,
        query: Q,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        config: &Arc<Config>,
    ) -> Result<Q::Output, ApplicationError>;
}
