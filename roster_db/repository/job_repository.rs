use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use roster_app::{
    jobs::{BatchJob, JobLease, JobStatus},
    repository::JobRepository,
};
use roster_types::{
    Result,
    errors::{ApplicationError, DbError},
};

use crate::{mapping::job_columns, models as db_models};

const JOB_COLUMNS: &str = r#"
    id, job_type, source_collection_id, target_collection_id, company_ids, status,
    total_count, processed_count, cancel_requested, error_message,
    lease_owner, lease_expires_at, created_at, updated_at
"#;

/// Implements JobRepository and operates on transactions.
///
/// Lease expiry is computed and compared with the database clock only.
#[derive(Clone)]
pub struct PostgresJobRepository<'a> {
    tx: Arc<Mutex<Transaction<'a, Postgres>>>,
}

impl<'a> PostgresJobRepository<'a> {
    pub fn new(tx: Arc<Mutex<Transaction<'a, Postgres>>>) -> Self {
        Self { tx }
    }
}

fn lease_secs(lease: &JobLease) -> f64 {
    lease.ttl.as_secs_f64()
}

#[async_trait::async_trait]
impl<'a> JobRepository for PostgresJobRepository<'a> {
    async fn create(&self, job: &BatchJob) -> Result<(), ApplicationError> {
        let (job_type, source_collection_id, target_collection_id) = job_columns(&job.kind);
        let status: db_models::BatchJobStatus = job.status.into();
        let mut tx_guard = self.tx.lock().await;

        sqlx::query(
            r#"
            INSERT INTO batch_jobs (
                id, job_type, source_collection_id, target_collection_id, company_ids,
                status, total_count, processed_count, cancel_requested, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(job.id)
        .bind(job_type)
        .bind(source_collection_id)
        .bind(target_collection_id)
        .bind(&job.company_ids)
        .bind(status)
        .bind(job.total_count)
        .bind(job.processed_count)
        .bind(job.cancel_requested)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&mut *tx_guard.as_mut())
        .await
        .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<BatchJob, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;

        let sql = format!("SELECT {JOB_COLUMNS} FROM batch_jobs WHERE id = $1");
        let job = sqlx::query_as::<_, db_models::BatchJob>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx_guard.as_mut())
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))?
            .ok_or(ApplicationError::Db(DbError::JobNotFound(id)))?;

        job.try_into()
    }

    async fn get_for_update(&self, id: Uuid) -> Result<BatchJob, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;

        let sql = format!("SELECT {JOB_COLUMNS} FROM batch_jobs WHERE id = $1 FOR UPDATE");
        let job = sqlx::query_as::<_, db_models::BatchJob>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx_guard.as_mut())
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))?
            .ok_or(ApplicationError::Db(DbError::JobNotFound(id)))?;

        job.try_into()
    }

    async fn mark_in_progress(
        &self,
        job_id: Uuid,
        lease: &JobLease,
    ) -> Result<Option<BatchJob>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;

        let sql = format!(
            r#"
            UPDATE batch_jobs
            SET status = 'InProgress',
                lease_owner = $2,
                lease_expires_at = NOW() + make_interval(secs => $3),
                updated_at = NOW()
            WHERE id = $1
              AND status IN ('Pending', 'InProgress')
              AND (lease_owner IS NULL OR lease_owner = $2 OR lease_expires_at < NOW())
            RETURNING {JOB_COLUMNS}
            "#
        );
        let job = sqlx::query_as::<_, db_models::BatchJob>(&sql)
            .bind(job_id)
            .bind(lease.owner)
            .bind(lease_secs(lease))
            .fetch_optional(&mut *tx_guard.as_mut())
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        job.map(BatchJob::try_from).transpose()
    }

    async fn advance_progress(
        &self,
        job_id: Uuid,
        lease: &JobLease,
        from: i32,
        processed_count: i32,
    ) -> Result<(), ApplicationError> {
        let mut tx_guard = self.tx.lock().await;

        let result = sqlx::query(
            r#"
            UPDATE batch_jobs
            SET processed_count = $4,
                lease_expires_at = NOW() + make_interval(secs => $5),
                updated_at = NOW()
            WHERE id = $1
              AND status = 'InProgress'
              AND lease_owner = $2
              AND processed_count = $3
              AND $3 <= $4
              AND $4 <= total_count
            "#,
        )
        .bind(job_id)
        .bind(lease.owner)
        .bind(from)
        .bind(processed_count)
        .bind(lease_secs(lease))
        .execute(&mut *tx_guard.as_mut())
        .await
        .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        if result.rows_affected() == 0 {
            warn!(%job_id, from, processed_count, "Checkpoint rejected");
            return Err(ApplicationError::Db(DbError::CheckpointRejected {
                job_id,
                processed_count,
            }));
        }
        Ok(())
    }

    async fn mark_terminal(
        &self,
        job_id: Uuid,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<bool, ApplicationError> {
        let status: db_models::BatchJobStatus = status.into();
        let mut tx_guard = self.tx.lock().await;

        let result = sqlx::query(
            r#"
            UPDATE batch_jobs
            SET status = $2,
                error_message = $3,
                lease_owner = NULL,
                lease_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status IN ('Pending', 'InProgress')
            "#,
        )
        .bind(job_id)
        .bind(status)
        .bind(error_message)
        .execute(&mut *tx_guard.as_mut())
        .await
        .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn request_cancel(&self, job_id: Uuid) -> Result<bool, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;

        let flagged: Option<bool> = sqlx::query_scalar(
            r#"
            WITH flagged AS (
                UPDATE batch_jobs
                SET cancel_requested = TRUE, updated_at = NOW()
                WHERE id = $1 AND status IN ('Pending', 'InProgress')
                RETURNING id
            )
            SELECT EXISTS (SELECT 1 FROM flagged)
            FROM batch_jobs WHERE id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&mut *tx_guard.as_mut())
        .await
        .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        flagged.ok_or(ApplicationError::Db(DbError::JobNotFound(job_id)))
    }

    async fn list_resumable(
        &self,
        limit: i64,
        stale_before: DateTime<Utc>,
    ) -> Result<Vec<BatchJob>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;

        let sql = format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM batch_jobs
            WHERE status IN ('Pending', 'InProgress')
              AND ((lease_owner IS NULL AND created_at < $2) OR lease_expires_at < NOW())
            ORDER BY created_at
            LIMIT $1
            "#
        );
        let jobs = sqlx::query_as::<_, db_models::BatchJob>(&sql)
            .bind(limit)
            .bind(stale_before)
            .fetch_all(&mut *tx_guard.as_mut())
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        jobs.into_iter().map(BatchJob::try_from).collect()
    }

    async fn delete_by_collection(&self, collection_id: Uuid) -> Result<u64, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;

        let result = sqlx::query(
            "DELETE FROM batch_jobs WHERE source_collection_id = $1 OR target_collection_id = $1",
        )
        .bind(collection_id)
        .execute(&mut *tx_guard.as_mut())
        .await
        .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        Ok(result.rows_affected())
    }
}
