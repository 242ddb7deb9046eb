use chrono::{DateTime, Utc};
use uuid::Uuid;

use roster_types::errors::ApplicationError;

use crate::jobs::{BatchJob, JobLease, JobStatus};

#[async_trait::async_trait]
pub trait JobRepository: Send + Sync {
    /// Creates a new job on the db.
    async fn create(&self, job: &BatchJob) -> Result<(), ApplicationError>;

    /// Find a job by id.
    async fn get_by_id(&self, id: Uuid) -> Result<BatchJob, ApplicationError>;

    /// Like `get_by_id`, also locking the row until the transaction ends.
    /// Chunks take this lock before touching memberships, the same order
    /// collection deletion uses.
    async fn get_for_update(&self, id: Uuid) -> Result<BatchJob, ApplicationError>;

    /// Claims the job for `lease.owner`, setting its status to "InProgress".
    /// Only succeeds for non terminal jobs that aren't leased, are already
    /// leased by the same owner, or whose lease has expired.
    /// This prevents several executors running the same job.
    async fn mark_in_progress(
        &self,
        job_id: Uuid,
        lease: &JobLease,
    ) -> Result<Option<BatchJob>, ApplicationError>;

    /// Moves the checkpoint from `from` to `processed_count` and renews the
    /// lease. Fails with `DbError::CheckpointRejected` when the lease isn't
    /// held anymore, the stored checkpoint isn't `from`, or the count would go
    /// backwards or past the total.
    async fn advance_progress(
        &self,
        job_id: Uuid,
        lease: &JobLease,
        from: i32,
        processed_count: i32,
    ) -> Result<(), ApplicationError>;

    /// Moves a job to a terminal status. Returns false if it was terminal already.
    async fn mark_terminal(
        &self,
        job_id: Uuid,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<bool, ApplicationError>;

    /// Flags the job for cancellation. Returns false if it was terminal already.
    async fn request_cancel(&self, job_id: Uuid) -> Result<bool, ApplicationError>;

    /// Non terminal jobs nobody is working on: expired leases, or never
    /// leased and created before `stale_before`.
    async fn list_resumable(
        &self,
        limit: i64,
        stale_before: DateTime<Utc>,
    ) -> Result<Vec<BatchJob>, ApplicationError>;

    /// Deletes jobs using the collection either as source or target.
    async fn delete_by_collection(&self, collection_id: Uuid) -> Result<u64, ApplicationError>;
}
