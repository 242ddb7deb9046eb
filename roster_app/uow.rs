use std::sync::Arc;

use roster_types::errors::ApplicationError;

use crate::repository::*;

/// Repositories bound to one transaction.
///
/// Repositories handed out here must be dropped before `commit`, which
/// consumes the unit of work.
#[async_trait::async_trait]
pub trait UnitOfWork<'a>: Send + Sync {
    fn collections(&self) -> Arc<dyn CollectionRepository + 'a>;
    fn memberships(&self) -> Arc<dyn MembershipRepository + 'a>;
    fn jobs(&self) -> Arc<dyn JobRepository + 'a>;

    async fn commit(self: Box<Self>) -> Result<(), ApplicationError>;
    async fn rollback(self: Box<Self>) -> Result<(), ApplicationError>;
}

#[async_trait::async_trait]
pub trait UnitOfWorkProvider: Send + Sync {
    /// Opens a new transaction.
    async fn begin<'p>(&'p self) -> Result<Box<dyn UnitOfWork<'p> + 'p>, ApplicationError>;
}
