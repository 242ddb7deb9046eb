use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use roster_app::repository::CollectionRepository;
use roster_types::{
    Result,
    collection::Collection,
    errors::{ApplicationError, DbError},
};

use crate::models as db_models;

/// Implements CollectionRepository and operates on transactions.
#[derive(Clone)]
pub struct PostgresCollectionRepository<'a> {
    tx: Arc<Mutex<Transaction<'a, Postgres>>>,
}

impl<'a> PostgresCollectionRepository<'a> {
    pub fn new(tx: Arc<Mutex<Transaction<'a, Postgres>>>) -> Self {
        Self { tx }
    }
}

#[async_trait::async_trait]
impl<'a> CollectionRepository for PostgresCollectionRepository<'a> {
    async fn create(&self, collection: &Collection) -> Result<(), ApplicationError> {
        let mut tx_guard = self.tx.lock().await;

        sqlx::query("INSERT INTO collections (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(collection.id)
            .bind(&collection.name)
            .bind(collection.created_at)
            .execute(&mut *tx_guard.as_mut())
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Collection, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;

        let collection = sqlx::query_as::<_, db_models::Collection>(
            "SELECT id, name, created_at FROM collections WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *tx_guard.as_mut())
        .await
        .map_err(|e| ApplicationError::Db(DbError::Database(e)))?
        .ok_or(ApplicationError::Db(DbError::CollectionNotFound(id)))?;

        Ok(collection.into())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Collection>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;

        let collection = sqlx::query_as::<_, db_models::Collection>(
            "SELECT id, name, created_at FROM collections WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&mut *tx_guard.as_mut())
        .await
        .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        Ok(collection.map(Into::into))
    }

    async fn list(&self) -> Result<Vec<Collection>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;

        let collections = sqlx::query_as::<_, db_models::Collection>(
            "SELECT id, name, created_at FROM collections ORDER BY created_at, name",
        )
        .fetch_all(&mut *tx_guard.as_mut())
        .await
        .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        Ok(collections.into_iter().map(Into::into).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<(), ApplicationError> {
        let mut tx_guard = self.tx.lock().await;

        sqlx::query("DELETE FROM collections WHERE id = $1")
            .bind(id)
            .execute(&mut *tx_guard.as_mut())
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        Ok(())
    }
}

/// Creates the protected collection unless it exists already.
pub async fn bootstrap_protected_collection(
    pool: &PgPool,
    name: &str,
) -> Result<bool, ApplicationError> {
    let result = sqlx::query(
        "INSERT INTO collections (id, name) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .execute(pool)
    .await
    .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

    Ok(result.rows_affected() > 0)
}
