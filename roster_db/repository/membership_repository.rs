use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use roster_app::repository::MembershipRepository;
use roster_types::{
    Result,
    company::Company,
    errors::{ApplicationError, DbError},
};

use crate::models as db_models;

/// Implements MembershipRepository and operates on transactions.
#[derive(Clone)]
pub struct PostgresMembershipRepository<'a> {
    tx: Arc<Mutex<Transaction<'a, Postgres>>>,
}

impl<'a> PostgresMembershipRepository<'a> {
    pub fn new(tx: Arc<Mutex<Transaction<'a, Postgres>>>) -> Self {
        Self { tx }
    }
}

// `$3` is the collection whose members are flagged as liked; NULL flags none.
const COMPANY_COLUMNS: &str = r#"
    c.id,
    c.company_name,
    EXISTS (
        SELECT 1 FROM collection_memberships l
        WHERE l.collection_id = $3::uuid AND l.company_id = c.id
    ) AS liked
"#;

#[async_trait::async_trait]
impl<'a> MembershipRepository for PostgresMembershipRepository<'a> {
    async fn add(&self, collection_id: Uuid, company_id: i32) -> Result<bool, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;

        let result = sqlx::query(
            r#"
            INSERT INTO collection_memberships (collection_id, company_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(collection_id)
        .bind(company_id)
        .execute(&mut *tx_guard.as_mut())
        .await
        .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, collection_id: Uuid, company_id: i32) -> Result<bool, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;

        let result = sqlx::query(
            "DELETE FROM collection_memberships WHERE collection_id = $1 AND company_id = $2",
        )
        .bind(collection_id)
        .bind(company_id)
        .execute(&mut *tx_guard.as_mut())
        .await
        .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_many(
        &self,
        collection_id: Uuid,
        company_ids: &[i32],
    ) -> Result<u64, ApplicationError> {
        if company_ids.is_empty() {
            return Ok(0);
        }
        let mut tx_guard = self.tx.lock().await;

        let result = sqlx::query(
            r#"
            INSERT INTO collection_memberships (collection_id, company_id)
            SELECT DISTINCT $1::uuid, t.company_id FROM UNNEST($2::int[]) AS t(company_id)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(collection_id)
        .bind(company_ids)
        .execute(&mut *tx_guard.as_mut())
        .await
        .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        Ok(result.rows_affected())
    }

    async fn remove_many(
        &self,
        collection_id: Uuid,
        company_ids: &[i32],
    ) -> Result<u64, ApplicationError> {
        if company_ids.is_empty() {
            return Ok(0);
        }
        let mut tx_guard = self.tx.lock().await;

        let result = sqlx::query(
            "DELETE FROM collection_memberships WHERE collection_id = $1 AND company_id = ANY($2)",
        )
        .bind(collection_id)
        .bind(company_ids)
        .execute(&mut *tx_guard.as_mut())
        .await
        .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        Ok(result.rows_affected())
    }

    async fn delete_by_collection(&self, collection_id: Uuid) -> Result<u64, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;

        let result = sqlx::query("DELETE FROM collection_memberships WHERE collection_id = $1")
            .bind(collection_id)
            .execute(&mut *tx_guard.as_mut())
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        Ok(result.rows_affected())
    }

    async fn count(&self, collection_id: Uuid) -> Result<i64, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;

        sqlx::query_scalar("SELECT COUNT(*) FROM collection_memberships WHERE collection_id = $1")
            .bind(collection_id)
            .fetch_one(&mut *tx_guard.as_mut())
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))
    }

    async fn list_after(
        &self,
        collection_id: Uuid,
        after: Option<i32>,
        limit: i64,
        liked_collection: Option<Uuid>,
    ) -> Result<Vec<Company>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;

        let sql = format!(
            r#"
            SELECT {COMPANY_COLUMNS}
            FROM collection_memberships m
            JOIN companies c ON c.id = m.company_id
            WHERE m.collection_id = $1
              AND ($2::int IS NULL OR c.id > $2)
            ORDER BY c.id
            LIMIT $4
            "#
        );
        let companies = sqlx::query_as::<_, db_models::Company>(&sql)
            .bind(collection_id)
            .bind(after)
            .bind(liked_collection)
            .bind(limit)
            .fetch_all(&mut *tx_guard.as_mut())
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        Ok(companies.into_iter().map(Into::into).collect())
    }

    async fn list_page(
        &self,
        collection_id: Uuid,
        offset: i64,
        limit: i64,
        liked_collection: Option<Uuid>,
    ) -> Result<Vec<Company>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;

        let sql = format!(
            r#"
            SELECT {COMPANY_COLUMNS}
            FROM collection_memberships m
            JOIN companies c ON c.id = m.company_id
            WHERE m.collection_id = $1
            ORDER BY c.id
            OFFSET $2
            LIMIT $4
            "#
        );
        let companies = sqlx::query_as::<_, db_models::Company>(&sql)
            .bind(collection_id)
            .bind(offset)
            .bind(liked_collection)
            .bind(limit)
            .fetch_all(&mut *tx_guard.as_mut())
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        Ok(companies.into_iter().map(Into::into).collect())
    }

    async fn list_company_ids(&self, collection_id: Uuid) -> Result<Vec<i32>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;

        sqlx::query_scalar(
            "SELECT company_id FROM collection_memberships WHERE collection_id = $1 ORDER BY company_id",
        )
        .bind(collection_id)
        .fetch_all(&mut *tx_guard.as_mut())
        .await
        .map_err(|e| ApplicationError::Db(DbError::Database(e)))
    }
}
