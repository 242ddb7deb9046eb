use roster_app::jobs::{BatchJob, JobKind, JobStatus, JobType};
use roster_types::{
    collection::Collection,
    company::Company,
    errors::{ApplicationError, DbError},
};

use crate::models as db_models;

impl From<db_models::Collection> for Collection {
    fn from(collection: db_models::Collection) -> Self {
        Collection {
            id: collection.id,
            name: collection.name,
            created_at: collection.created_at,
        }
    }
}

impl From<db_models::Company> for Company {
    fn from(company: db_models::Company) -> Self {
        Company {
            id: company.id,
            company_name: company.company_name,
            liked: company.liked,
        }
    }
}

impl From<db_models::BatchJobStatus> for JobStatus {
    fn from(status: db_models::BatchJobStatus) -> Self {
        match status {
            db_models::BatchJobStatus::Pending => JobStatus::Pending,
            db_models::BatchJobStatus::InProgress => JobStatus::InProgress,
            db_models::BatchJobStatus::Completed => JobStatus::Completed,
            db_models::BatchJobStatus::Failed => JobStatus::Failed,
            db_models::BatchJobStatus::Cancelled => JobStatus::Cancelled,
        }
    }
}

impl From<JobStatus> for db_models::BatchJobStatus {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending => db_models::BatchJobStatus::Pending,
            JobStatus::InProgress => db_models::BatchJobStatus::InProgress,
            JobStatus::Completed => db_models::BatchJobStatus::Completed,
            JobStatus::Failed => db_models::BatchJobStatus::Failed,
            JobStatus::Cancelled => db_models::BatchJobStatus::Cancelled,
        }
    }
}

impl From<JobType> for db_models::BatchJobType {
    fn from(job_type: JobType) -> Self {
        match job_type {
            JobType::Add => db_models::BatchJobType::Add,
            JobType::Delete => db_models::BatchJobType::Delete,
        }
    }
}

impl TryFrom<db_models::BatchJob> for BatchJob {
    type Error = ApplicationError;

    fn try_from(job: db_models::BatchJob) -> Result<Self, Self::Error> {
        let kind = match (job.job_type, job.source_collection_id) {
            (db_models::BatchJobType::Add, Some(source_collection_id)) => JobKind::Add {
                source_collection_id,
                target_collection_id: job.target_collection_id,
            },
            (db_models::BatchJobType::Add, None) => {
                return Err(corrupt(&job, "add job without source collection"));
            }
            (db_models::BatchJobType::Delete, _) => JobKind::Delete {
                collection_id: job.target_collection_id,
            },
        };

        if job.total_count as usize != job.company_ids.len() {
            return Err(corrupt(&job, "total_count differs from the work list"));
        }

        Ok(BatchJob {
            id: job.id,
            kind,
            company_ids: job.company_ids,
            status: job.status.into(),
            total_count: job.total_count,
            processed_count: job.processed_count,
            cancel_requested: job.cancel_requested,
            error_message: job.error_message,
            lease_owner: job.lease_owner,
            lease_expires_at: job.lease_expires_at,
            created_at: job.created_at,
            updated_at: job.updated_at,
        })
    }
}

fn corrupt(job: &db_models::BatchJob, reason: &str) -> ApplicationError {
    ApplicationError::Db(DbError::CorruptJob(job.id, reason.to_string()))
}

/// Columns split back out of a domain job for inserts.
pub(crate) fn job_columns(kind: &JobKind) -> (db_models::BatchJobType, Option<uuid::Uuid>, uuid::Uuid) {
    match *kind {
        JobKind::Add {
            source_collection_id,
            target_collection_id,
        } => (
            db_models::BatchJobType::Add,
            Some(source_collection_id),
            target_collection_id,
        ),
        JobKind::Delete { collection_id } => {
            (db_models::BatchJobType::Delete, None, collection_id)
        }
    }
}
