use thiserror::Error;
use uuid::Uuid;

/// Errors for db stuff.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Collection with ID {0} not found")]
    CollectionNotFound(Uuid),

    #[error("Job with ID {0} not found")]
    JobNotFound(Uuid),

    #[error("Checkpoint {processed_count} rejected for job {job_id}")]
    CheckpointRejected { job_id: Uuid, processed_count: i32 },

    #[error("Job with ID {0} has an inconsistent record: {1}")]
    CorruptJob(Uuid, String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
