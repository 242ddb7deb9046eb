use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;

use roster_app::{
    repository::*,
    uow::{UnitOfWork, UnitOfWorkProvider},
};
use roster_types::errors::{ApplicationError, DbError};

use crate::repository::*;

#[derive(Debug, Clone)]
pub struct PostgresUnitOfWorkProvider {
    pool: PgPool,
}

impl PostgresUnitOfWorkProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UnitOfWorkProvider for PostgresUnitOfWorkProvider {
    async fn begin<'p>(&'p self) -> Result<Box<dyn UnitOfWork<'p> + 'p>, ApplicationError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        let tx_arc = Arc::new(Mutex::new(tx));

        Ok(Box::new(PostgresUnitOfWork { tx: tx_arc }))
    }
}

/// Repositories handed out by this unit of work share its transaction, so
/// they must all be dropped before `commit`.
#[derive(Debug, Clone)]
pub struct PostgresUnitOfWork<'a> {
    tx: Arc<Mutex<Transaction<'a, Postgres>>>,
}

#[async_trait::async_trait]
impl<'a> UnitOfWork<'a> for PostgresUnitOfWork<'a> {
    fn collections(&self) -> Arc<dyn CollectionRepository + 'a> {
        Arc::new(PostgresCollectionRepository::new(self.tx.clone()))
    }

    fn memberships(&self) -> Arc<dyn MembershipRepository + 'a> {
        Arc::new(PostgresMembershipRepository::new(self.tx.clone()))
    }

    fn jobs(&self) -> Arc<dyn JobRepository + 'a> {
        Arc::new(PostgresJobRepository::new(self.tx.clone()))
    }

    async fn commit(self: Box<Self>) -> Result<(), ApplicationError> {
        let tx = Arc::try_unwrap(self.tx).map_err(|_| {
            ApplicationError::Db(DbError::Transaction(
                "commit while a repository still holds the transaction".to_string(),
            ))
        })?;

        tx.into_inner()
            .commit()
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))
    }

    async fn rollback(self: Box<Self>) -> Result<(), ApplicationError> {
        // A shared transaction rolls back when its last owner drops it.
        match Arc::try_unwrap(self.tx) {
            Ok(tx) => tx
                .into_inner()
                .rollback()
                .await
                .map_err(|e| ApplicationError::Db(DbError::Database(e))),
            Err(_) => Ok(()),
        }
    }
}
