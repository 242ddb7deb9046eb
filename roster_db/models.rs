use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(sqlx::Type, Debug, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "batch_job_type", rename_all = "PascalCase")]
pub enum BatchJobType {
    Add,
    Delete,
}

#[derive(sqlx::Type, Debug, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "batch_job_status", rename_all = "PascalCase")]
pub enum BatchJobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, FromRow)]
pub struct Collection {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A company as seen from a collection listing.
#[derive(Debug, Clone, FromRow)]
pub struct Company {
    pub id: i32,
    pub company_name: String,
    pub liked: bool,
}

/// DELETE jobs store their collection in `target_collection_id`.
#[derive(Debug, Clone, FromRow)]
pub struct BatchJob {
    pub id: Uuid,
    pub job_type: BatchJobType,
    pub source_collection_id: Option<Uuid>,
    pub target_collection_id: Uuid,
    pub company_ids: Vec<i32>,
    pub status: BatchJobStatus,
    pub total_count: i32,
    pub processed_count: i32,
    pub cancel_requested: bool,
    pub error_message: Option<String>,
    pub lease_owner: Option<Uuid>,
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
