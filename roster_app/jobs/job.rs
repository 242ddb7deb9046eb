use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Durable record of one batch ADD or DELETE operation.
///
/// `company_ids` is the work list, fixed at creation. `processed_count` is the
/// checkpoint: every id before that index has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    pub id: Uuid,
    pub kind: JobKind,
    pub company_ids: Vec<i32>,
    pub status: JobStatus,
    pub total_count: i32,
    pub processed_count: i32,
    pub cancel_requested: bool,
    pub error_message: Option<String>,
    pub lease_owner: Option<Uuid>,
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BatchJob {
    pub fn new(id: Uuid, kind: JobKind, company_ids: Vec<i32>) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind,
            total_count: company_ids.len() as i32,
            company_ids,
            status: JobStatus::Pending,
            processed_count: 0,
            cancel_requested: false,
            error_message: None,
            lease_owner: None,
            lease_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn job_type(&self) -> JobType {
        self.kind.job_type()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Ids not yet covered by the checkpoint.
    pub fn remaining(&self) -> &[i32] {
        let from = (self.processed_count.max(0) as usize).min(self.company_ids.len());
        &self.company_ids[from..]
    }

    /// Whether some executor other than `owner` holds a live lease at `now`.
    pub fn is_leased_by_other(&self, owner: Uuid, now: DateTime<Utc>) -> bool {
        match (self.lease_owner, self.lease_expires_at) {
            (Some(current), Some(expires_at)) => current != owner && expires_at > now,
            (Some(current), None) => current != owner,
            _ => false,
        }
    }
}

/// What a job does, and to which collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Add {
        source_collection_id: Uuid,
        target_collection_id: Uuid,
    },
    Delete {
        collection_id: Uuid,
    },
}

impl JobKind {
    pub fn job_type(&self) -> JobType {
        match self {
            JobKind::Add { .. } => JobType::Add,
            JobKind::Delete { .. } => JobType::Delete,
        }
    }

    /// The collection whose memberships change.
    pub fn affected_collection(&self) -> Uuid {
        match *self {
            JobKind::Add {
                target_collection_id,
                ..
            } => target_collection_id,
            JobKind::Delete { collection_id } => collection_id,
        }
    }

    pub fn references(&self, collection_id: Uuid) -> bool {
        match *self {
            JobKind::Add {
                source_collection_id,
                target_collection_id,
            } => source_collection_id == collection_id || target_collection_id == collection_id,
            JobKind::Delete {
                collection_id: own,
            } => own == collection_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    Add,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Terminal statuses are absorbing.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// Ownership claim of an executor over a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobLease {
    pub owner: Uuid,
    pub ttl: Duration,
}

impl JobLease {
    pub fn new(owner: Uuid, ttl: Duration) -> Self {
        Self { owner, ttl }
    }

    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::days(1));
        now + ttl
    }
}
