use chrono::Utc;
use std::sync::Arc;
use tokio::{task::JoinHandle, time};
use tracing::{error, info, warn};
use uuid::Uuid;

use roster_types::errors::ApplicationError;

use crate::{
    app_bus::AppBus,
    command_handlers::{
        RequestJobCancelCommandHandler, SubmitBatchAddCommandHandler,
        SubmitBatchDeleteCommandHandler,
    },
    cqrs::{
        commands::{RequestJobCancel, SubmitBatchAdd, SubmitBatchDelete},
        queries::{GetJobStatus, ListResumableJobs},
    },
    jobs::{BatchJob, executor::BatchExecutor},
    queries_handlers::{GetJobStatusHandler, ListResumableJobsHandler},
};

const RECOVERY_BATCH: i64 = 50;

/// Entry point for batch jobs: validates and records them, then hands them to
/// a background executor. Also picks up jobs a dead executor left behind.
pub struct JobSupervisor {
    app_bus: Arc<AppBus>,
    executor: Arc<BatchExecutor>,
}

impl JobSupervisor {
    pub fn new(app_bus: Arc<AppBus>, executor: Arc<BatchExecutor>) -> Self {
        Self { app_bus, executor }
    }

    /// Records an ADD job and starts it. Returns once the job is durable.
    pub async fn submit_add(
        &self,
        source_collection_id: Uuid,
        target_collection_id: Uuid,
        company_ids: Vec<i32>,
    ) -> Result<BatchJob, ApplicationError> {
        let job_id = Uuid::new_v4();
        let cmd = SubmitBatchAdd {
            job_id,
            source_collection_id,
            target_collection_id,
            company_ids,
        };
        self.app_bus
            .execute(cmd, SubmitBatchAddCommandHandler::new())
            .await?;

        self.dispatch(job_id);
        self.get_status(job_id).await
    }

    /// Records a DELETE job and starts it. Returns once the job is durable.
    pub async fn submit_delete(
        &self,
        collection_id: Uuid,
        company_ids: Vec<i32>,
    ) -> Result<BatchJob, ApplicationError> {
        let job_id = Uuid::new_v4();
        let cmd = SubmitBatchDelete {
            job_id,
            collection_id,
            company_ids,
        };
        self.app_bus
            .execute(cmd, SubmitBatchDeleteCommandHandler::new())
            .await?;

        self.dispatch(job_id);
        self.get_status(job_id).await
    }

    pub async fn get_status(&self, job_id: Uuid) -> Result<BatchJob, ApplicationError> {
        self.app_bus
            .query(GetJobStatus { job_id }, GetJobStatusHandler::new())
            .await
    }

    /// Flags a job for cancellation. The executor observes the flag at its
    /// next chunk boundary; terminal jobs are left as they are.
    /// Accepted for every existing job, whether or not it will stop.
    pub async fn cancel(&self, job_id: Uuid) -> Result<bool, ApplicationError> {
        self.app_bus
            .execute(RequestJobCancel { job_id }, RequestJobCancelCommandHandler::new())
            .await?;
        Ok(true)
    }

    /// Runs the job on a background task.
    pub fn dispatch(&self, job_id: Uuid) -> JoinHandle<()> {
        let executor = self.executor.clone();
        tokio::spawn(async move {
            match executor.execute(job_id).await {
                Ok(outcome) => info!(%job_id, ?outcome, "Batch job execution ended"),
                Err(e) => error!(%job_id, "Batch job execution aborted: {e}"),
            }
        })
    }

    /// Dispatches every job with no live owner. Returns how many were found.
    pub async fn recover_stalled(&self) -> Result<usize, ApplicationError> {
        let lease_ttl = chrono::Duration::from_std(self.app_bus.config().lease_ttl)
            .unwrap_or_else(|_| chrono::Duration::seconds(30));
        let query = ListResumableJobs {
            limit: RECOVERY_BATCH,
            stale_before: Utc::now() - lease_ttl,
        };
        let jobs = self
            .app_bus
            .query(query, ListResumableJobsHandler::new())
            .await?;

        if !jobs.is_empty() {
            info!("Found {} stalled batch jobs, resuming.", jobs.len());
        }
        for job in &jobs {
            self.dispatch(job.id);
        }
        Ok(jobs.len())
    }

    /// Run the recovery loop inside a tokio task.
    pub fn run(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = time::interval(self.app_bus.config().recovery_interval);
            info!("Job supervisor started.");

            loop {
                interval.tick().await;
                if let Err(e) = self.recover_stalled().await {
                    warn!("Error while recovering stalled jobs: {e}");
                }
            }
        })
    }
}
