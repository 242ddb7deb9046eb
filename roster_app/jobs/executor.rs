use std::sync::Arc;
use tokio::time;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use roster_types::errors::{ApplicationError, DbError};

use crate::{
    config::Config,
    jobs::{BatchJob, JobKind, JobLease, JobStatus, chunking::ChunkPolicy},
    uow::{UnitOfWork, UnitOfWorkProvider},
};

/// How a single execution of a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Completed,
    Cancelled,
    Failed(String),
    /// The job was terminal or leased by another executor.
    NotClaimed,
    /// Another executor took the job over; its record was left alone.
    LeaseLost,
    /// The job record was deleted while running, along with its collection.
    Removed,
}

enum ChunkResult {
    Applied,
    CancelRequested,
}

/// Walks a job's persisted work list chunk by chunk.
///
/// Every chunk is one unit of work: cancellation check, membership writes and
/// checkpoint commit together, so a crash never leaves a chunk applied but
/// unaccounted for.
pub struct BatchExecutor {
    uow_provider: Arc<dyn UnitOfWorkProvider>,
    chunk_policy: Arc<dyn ChunkPolicy>,
    config: Arc<Config>,
    worker_id: Uuid,
}

impl BatchExecutor {
    pub fn new(
        uow_provider: Arc<dyn UnitOfWorkProvider>,
        chunk_policy: Arc<dyn ChunkPolicy>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            uow_provider,
            chunk_policy,
            config,
            worker_id: Uuid::new_v4(),
        }
    }

    /// Identity used as lease owner.
    pub fn worker_id(&self) -> Uuid {
        self.worker_id
    }

    fn lease(&self) -> JobLease {
        JobLease::new(self.worker_id, self.config.lease_ttl)
    }

    /// Runs the job to a terminal status, resuming from its checkpoint.
    /// Errors are returned only when the job record itself can't be read or
    /// written; failures applying memberships end up in the record.
    #[instrument(skip(self), fields(worker_id = %self.worker_id))]
    pub async fn execute(&self, job_id: Uuid) -> Result<ExecutionOutcome, ApplicationError> {
        let lease = self.lease();

        let Some(job) = self.claim(job_id, &lease).await? else {
            warn!("Job is terminal or owned by another executor, skipping");
            return Ok(ExecutionOutcome::NotClaimed);
        };

        info!(
            job_type = ?job.job_type(),
            total_count = job.total_count,
            processed_count = job.processed_count,
            "Executing batch job"
        );

        if job.cancel_requested {
            return self.finish(job_id, ExecutionOutcome::Cancelled).await;
        }

        let total = job.company_ids.len();
        let chunk_size = self.chunk_policy.chunk_size(total).max(1);
        let mut processed = (job.processed_count.max(0) as usize).min(total);

        while processed < total {
            let end = (processed + chunk_size).min(total);

            match self.apply_chunk(&job, &lease, processed, end).await {
                Ok(ChunkResult::Applied) => processed = end,
                Ok(ChunkResult::CancelRequested) => {
                    info!(processed_count = processed, "Cancellation observed");
                    return self.finish(job_id, ExecutionOutcome::Cancelled).await;
                }
                Err(ApplicationError::Db(DbError::CheckpointRejected { .. })) => {
                    warn!(processed_count = processed, "Lease lost, stopping");
                    return Ok(ExecutionOutcome::LeaseLost);
                }
                Err(ApplicationError::Db(DbError::JobNotFound(_))) => {
                    warn!(processed_count = processed, "Job record removed, stopping");
                    return Ok(ExecutionOutcome::Removed);
                }
                Err(e) => {
                    error!(processed_count = processed, "Chunk failed: {e}");
                    return self
                        .finish(job_id, ExecutionOutcome::Failed(e.to_string()))
                        .await;
                }
            }

            if processed < total && !self.config.chunk_delay.is_zero() {
                time::sleep(self.config.chunk_delay).await;
            }
        }

        self.finish(job_id, ExecutionOutcome::Completed).await
    }

    async fn claim(
        &self,
        job_id: Uuid,
        lease: &JobLease,
    ) -> Result<Option<BatchJob>, ApplicationError> {
        let uow = self.uow_provider.begin().await?;
        let claimed = uow.jobs().mark_in_progress(job_id, lease).await;
        match claimed {
            Ok(job) => {
                uow.commit().await?;
                Ok(job)
            }
            Err(e) => {
                uow.rollback().await?;
                Err(e)
            }
        }
    }

    /// Applies `job.company_ids[from..to]` and checkpoints `to`.
    async fn apply_chunk(
        &self,
        job: &BatchJob,
        lease: &JobLease,
        from: usize,
        to: usize,
    ) -> Result<ChunkResult, ApplicationError> {
        let uow = self.uow_provider.begin().await?;

        match Self::apply_chunk_in(&uow, job, lease, from, to).await {
            Ok(ChunkResult::Applied) => {
                uow.commit().await?;
                Ok(ChunkResult::Applied)
            }
            Ok(ChunkResult::CancelRequested) => {
                uow.rollback().await?;
                Ok(ChunkResult::CancelRequested)
            }
            Err(e) => {
                if let Err(rollback_err) = uow.rollback().await {
                    warn!("Rollback after failed chunk failed too: {rollback_err}");
                }
                Err(e)
            }
        }
    }

    async fn apply_chunk_in(
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        job: &BatchJob,
        lease: &JobLease,
        from: usize,
        to: usize,
    ) -> Result<ChunkResult, ApplicationError> {
        let start = from as i32;
        let checkpoint = to as i32;
        let current = uow.jobs().get_for_update(job.id).await?;

        if current.cancel_requested {
            return Ok(ChunkResult::CancelRequested);
        }
        if current.status != JobStatus::InProgress
            || current.lease_owner != Some(lease.owner)
            || current.processed_count != start
        {
            return Err(ApplicationError::Db(DbError::CheckpointRejected {
                job_id: job.id,
                processed_count: checkpoint,
            }));
        }

        let chunk = &job.company_ids[from..to];
        let memberships = uow.memberships();
        match job.kind {
            JobKind::Add {
                target_collection_id,
                ..
            } => {
                memberships.add_many(target_collection_id, chunk).await?;
            }
            JobKind::Delete { collection_id } => {
                memberships.remove_many(collection_id, chunk).await?;
            }
        }

        uow.jobs()
            .advance_progress(job.id, lease, start, checkpoint)
            .await?;

        Ok(ChunkResult::Applied)
    }

    async fn finish(
        &self,
        job_id: Uuid,
        outcome: ExecutionOutcome,
    ) -> Result<ExecutionOutcome, ApplicationError> {
        let (status, error_message) = match &outcome {
            ExecutionOutcome::Completed => (JobStatus::Completed, None),
            ExecutionOutcome::Cancelled => (JobStatus::Cancelled, None),
            ExecutionOutcome::Failed(message) => (JobStatus::Failed, Some(message.as_str())),
            ExecutionOutcome::NotClaimed
            | ExecutionOutcome::LeaseLost
            | ExecutionOutcome::Removed => return Ok(outcome),
        };

        let uow = self.uow_provider.begin().await?;
        let marked = uow.jobs().mark_terminal(job_id, status, error_message).await;
        let changed = match marked {
            Ok(changed) => changed,
            Err(e) => {
                uow.rollback().await?;
                return Err(e);
            }
        };
        uow.commit().await?;

        if changed {
            info!(?status, "Batch job finished");
        } else {
            warn!(?status, "Batch job was already terminal");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rand::Rng;
    use std::time::Duration;

    use super::*;
    use crate::{
        jobs::chunking::ThresholdChunkPolicy,
        repository::{JobRepository, MembershipRepository},
        test_utils::tests::{MockUnitOfWorkProvider, test_config},
    };

    struct Fixture {
        provider: MockUnitOfWorkProvider,
        executor: BatchExecutor,
        source: Uuid,
        target: Uuid,
    }

    fn setup(policy: ThresholdChunkPolicy) -> Fixture {
        let provider = MockUnitOfWorkProvider::new();
        let source = provider.uow().seed_collection("Source").id;
        let target = provider.uow().seed_collection("Target").id;
        let executor = BatchExecutor::new(
            Arc::new(provider.clone()),
            Arc::new(policy),
            Arc::new(test_config()),
        );
        Fixture {
            provider,
            executor,
            source,
            target,
        }
    }

    impl Fixture {
        fn add_job(&self, company_ids: Vec<i32>) -> BatchJob {
            let job = BatchJob::new(
                Uuid::new_v4(),
                JobKind::Add {
                    source_collection_id: self.source,
                    target_collection_id: self.target,
                },
                company_ids,
            );
            self.provider.uow().jobs_mock().insert(job.clone());
            job
        }

        fn delete_job(&self, collection_id: Uuid, company_ids: Vec<i32>) -> BatchJob {
            let job = BatchJob::new(
                Uuid::new_v4(),
                JobKind::Delete { collection_id },
                company_ids,
            );
            self.provider.uow().jobs_mock().insert(job.clone());
            job
        }

        fn job(&self, job_id: Uuid) -> BatchJob {
            self.provider.uow().jobs_mock().snapshot(job_id).unwrap()
        }

        fn target_members(&self) -> Vec<i32> {
            self.provider.uow().memberships_mock().members(self.target)
        }
    }

    #[tokio::test]
    async fn test_add_job_completes_with_single_id_chunks() {
        let fx = setup(ThresholdChunkPolicy::default());
        let job = fx.add_job(vec![1, 2, 3, 4, 5]);

        let outcome = fx.executor.execute(job.id).await.unwrap();

        assert_eq!(outcome, ExecutionOutcome::Completed);
        let job = fx.job(job.id);
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.processed_count, 5);
        assert!(job.lease_owner.is_none());
        assert_eq!(fx.target_members(), vec![1, 2, 3, 4, 5]);
        assert_eq!(
            fx.provider.uow().jobs_mock().checkpoints(job.id),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[tokio::test]
    async fn test_large_job_checkpoints_every_chunk() {
        let fx = setup(ThresholdChunkPolicy::new(3, 1, 5));
        let job = fx.add_job((1..=12).collect());

        let outcome = fx.executor.execute(job.id).await.unwrap();

        assert_eq!(outcome, ExecutionOutcome::Completed);
        assert_eq!(
            fx.provider.uow().jobs_mock().checkpoints(job.id),
            vec![5, 10, 12]
        );
        assert_eq!(fx.provider.uow().memberships_mock().batched_writes(), 3);
        assert_eq!(fx.target_members(), (1..=12).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_empty_job_completes_immediately() {
        let fx = setup(ThresholdChunkPolicy::default());
        let job = fx.add_job(vec![]);

        let outcome = fx.executor.execute(job.id).await.unwrap();

        assert_eq!(outcome, ExecutionOutcome::Completed);
        let job = fx.job(job.id);
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.processed_count, 0);
        assert_eq!(job.total_count, 0);
        assert_eq!(fx.provider.uow().memberships_mock().batched_writes(), 0);
    }

    #[tokio::test]
    async fn test_existing_and_duplicate_ids_still_count() {
        let fx = setup(ThresholdChunkPolicy::default());
        let memberships = fx.provider.uow().memberships_mock();
        memberships.add(fx.target, 2).await.unwrap();
        let job = fx.add_job(vec![1, 2, 2, 3]);

        fx.executor.execute(job.id).await.unwrap();

        let job = fx.job(job.id);
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.processed_count, 4);
        assert_eq!(fx.target_members(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_delete_job_removes_memberships() {
        let fx = setup(ThresholdChunkPolicy::default());
        let memberships = fx.provider.uow().memberships_mock();
        for id in 1..=4 {
            memberships.add(fx.target, id).await.unwrap();
        }
        // 9 isn't a member: removing it is a no-op but still progress.
        let job = fx.delete_job(fx.target, vec![2, 4, 9]);

        let outcome = fx.executor.execute(job.id).await.unwrap();

        assert_eq!(outcome, ExecutionOutcome::Completed);
        assert_eq!(fx.job(job.id).processed_count, 3);
        assert_eq!(fx.target_members(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_cancel_before_first_chunk() {
        let fx = setup(ThresholdChunkPolicy::default());
        let job = fx.add_job(vec![1, 2, 3]);
        fx.provider.uow().jobs_mock().flag_cancel(job.id);

        let outcome = fx.executor.execute(job.id).await.unwrap();

        assert_eq!(outcome, ExecutionOutcome::Cancelled);
        let job = fx.job(job.id);
        assert_eq!(job.status, JobStatus::Cancelled);
        assert_eq!(job.processed_count, 0);
        assert!(fx.target_members().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_before_start_wins_over_empty_job() {
        let fx = setup(ThresholdChunkPolicy::default());
        let job = fx.add_job(vec![]);
        fx.provider.uow().jobs_mock().flag_cancel(job.id);

        let outcome = fx.executor.execute(job.id).await.unwrap();

        assert_eq!(outcome, ExecutionOutcome::Cancelled);
        assert_eq!(fx.job(job.id).status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_between_chunks_keeps_applied_prefix() {
        let fx = setup(ThresholdChunkPolicy::new(0, 1, 2));
        let job = fx.add_job((1..=10).collect());

        let jobs = fx.provider.uow().jobs_mock();
        let job_id = job.id;
        fx.provider
            .uow()
            .memberships_mock()
            .on_write(move |writes| {
                if writes == 3 {
                    jobs.flag_cancel(job_id);
                }
            });

        let outcome = fx.executor.execute(job.id).await.unwrap();

        assert_eq!(outcome, ExecutionOutcome::Cancelled);
        let job = fx.job(job.id);
        assert_eq!(job.status, JobStatus::Cancelled);
        assert_eq!(job.processed_count, 6);
        assert_eq!(job.processed_count % 2, 0);
        assert_eq!(fx.target_members(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_store_failure_marks_job_failed_keeping_prefix() {
        let fx = setup(ThresholdChunkPolicy::default());
        fx.provider.uow().memberships_mock().fail_on_company(3);
        let job = fx.add_job(vec![1, 2, 3, 4]);

        let outcome = fx.executor.execute(job.id).await.unwrap();

        assert!(matches!(outcome, ExecutionOutcome::Failed(_)));
        let job = fx.job(job.id);
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.processed_count, 2);
        let message = job.error_message.unwrap();
        assert!(message.contains("company 3"), "unexpected message: {message}");
        assert_eq!(fx.target_members(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_terminal_job_is_not_claimed() {
        let fx = setup(ThresholdChunkPolicy::default());
        let mut job = fx.add_job(vec![1, 2]);
        job.status = JobStatus::Completed;
        job.processed_count = 2;
        fx.provider.uow().jobs_mock().insert(job.clone());

        let outcome = fx.executor.execute(job.id).await.unwrap();

        assert_eq!(outcome, ExecutionOutcome::NotClaimed);
        assert_eq!(fx.job(job.id).status, JobStatus::Completed);
        assert!(fx.target_members().is_empty());
    }

    #[tokio::test]
    async fn test_live_lease_of_another_executor_blocks_claim() {
        let fx = setup(ThresholdChunkPolicy::default());
        let mut job = fx.add_job(vec![1, 2]);
        job.status = JobStatus::InProgress;
        job.lease_owner = Some(Uuid::new_v4());
        job.lease_expires_at = Some(Utc::now() + chrono::Duration::seconds(60));
        fx.provider.uow().jobs_mock().insert(job.clone());

        let outcome = fx.executor.execute(job.id).await.unwrap();

        assert_eq!(outcome, ExecutionOutcome::NotClaimed);
        assert_eq!(fx.job(job.id).status, JobStatus::InProgress);
        assert!(fx.target_members().is_empty());
    }

    #[tokio::test]
    async fn test_resumes_from_checkpoint_after_expired_lease() {
        let fx = setup(ThresholdChunkPolicy::default());
        let mut job = fx.add_job(vec![1, 2, 3, 4, 5]);
        job.status = JobStatus::InProgress;
        job.processed_count = 3;
        job.lease_owner = Some(Uuid::new_v4());
        job.lease_expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
        fx.provider.uow().jobs_mock().insert(job.clone());

        let outcome = fx.executor.execute(job.id).await.unwrap();

        assert_eq!(outcome, ExecutionOutcome::Completed);
        let job = fx.job(job.id);
        assert_eq!(job.processed_count, 5);
        // Ids before the checkpoint aren't touched again.
        assert_eq!(fx.target_members(), vec![4, 5]);
        assert_eq!(
            fx.provider.uow().jobs_mock().checkpoints(job.id),
            vec![4, 5]
        );
    }

    #[tokio::test]
    async fn test_stops_when_lease_is_taken_over() {
        let fx = setup(ThresholdChunkPolicy::default());
        let job = fx.add_job(vec![1, 2, 3, 4]);

        let jobs = fx.provider.uow().jobs_mock();
        let job_id = job.id;
        let usurper = Uuid::new_v4();
        fx.provider
            .uow()
            .memberships_mock()
            .on_write(move |writes| {
                if writes == 1 {
                    let mut job = jobs.snapshot(job_id).unwrap();
                    job.lease_owner = Some(usurper);
                    job.lease_expires_at = Some(Utc::now() + chrono::Duration::seconds(60));
                    jobs.insert(job);
                }
            });

        let outcome = fx.executor.execute(job.id).await.unwrap();

        assert_eq!(outcome, ExecutionOutcome::LeaseLost);
        let job = fx.job(job.id);
        assert_eq!(job.status, JobStatus::InProgress);
        assert_eq!(job.lease_owner, Some(usurper));
        assert_eq!(job.processed_count, 0);
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_claimed() {
        let fx = setup(ThresholdChunkPolicy::default());
        let outcome = fx.executor.execute(Uuid::new_v4()).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::NotClaimed);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_bounded_for_random_jobs() {
        let mut rng = rand::thread_rng();

        for _ in 0..20 {
            let threshold = rng.gen_range(0..20);
            let large = rng.gen_range(1..8);
            let fx = setup(ThresholdChunkPolicy::new(threshold, 1, large));
            let len = rng.gen_range(0..40);
            let ids: Vec<i32> = (0..len).map(|_| rng.gen_range(1..25)).collect();
            let job = fx.add_job(ids.clone());

            fx.executor.execute(job.id).await.unwrap();

            let checkpoints = fx.provider.uow().jobs_mock().checkpoints(job.id);
            assert!(checkpoints.windows(2).all(|w| w[0] <= w[1]));
            assert!(checkpoints.iter().all(|c| *c <= job.total_count));

            let job = fx.job(job.id);
            assert_eq!(job.status, JobStatus::Completed);
            assert_eq!(job.processed_count, job.total_count);

            let mut expected = ids;
            expected.sort_unstable();
            expected.dedup();
            assert_eq!(fx.target_members(), expected);
        }
    }

    #[tokio::test]
    async fn test_pacing_delay_is_applied_between_chunks() {
        let provider = MockUnitOfWorkProvider::new();
        let target = provider.uow().seed_collection("Target").id;
        let config = Config {
            chunk_delay: Duration::from_millis(20),
            ..test_config()
        };
        let executor = BatchExecutor::new(
            Arc::new(provider.clone()),
            Arc::new(ThresholdChunkPolicy::default()),
            Arc::new(config),
        );
        let job = BatchJob::new(
            Uuid::new_v4(),
            JobKind::Add {
                source_collection_id: Uuid::new_v4(),
                target_collection_id: target,
            },
            vec![1, 2, 3],
        );
        provider.uow().jobs_mock().insert(job.clone());

        let started = std::time::Instant::now();
        executor.execute(job.id).await.unwrap();

        // Two pauses: none after the last chunk.
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    fn paced_executor(provider: &MockUnitOfWorkProvider, delay_ms: u64) -> BatchExecutor {
        let config = Config {
            chunk_delay: Duration::from_millis(delay_ms),
            ..test_config()
        };
        BatchExecutor::new(
            Arc::new(provider.clone()),
            Arc::new(ThresholdChunkPolicy::default()),
            Arc::new(config),
        )
    }

    #[tokio::test]
    async fn test_every_chunk_locks_the_job_row() {
        let fx = setup(ThresholdChunkPolicy::default());
        let job = fx.add_job(vec![1, 2, 3, 4, 5]);

        fx.executor.execute(job.id).await.unwrap();

        assert_eq!(fx.provider.uow().jobs_mock().locked_reads(), 5);
    }

    #[tokio::test]
    async fn test_overlapping_executions_apply_each_chunk_once() {
        let fx = setup(ThresholdChunkPolicy::default());
        let executor = paced_executor(&fx.provider, 10);
        let job = fx.add_job(vec![1, 2, 3, 4, 5]);

        // Same executor, so both runs hold the same lease owner.
        let (first, second) = tokio::join!(executor.execute(job.id), executor.execute(job.id));
        let mut outcomes = vec![first.unwrap(), second.unwrap()];
        outcomes.sort_by_key(|o| format!("{o:?}"));

        assert_eq!(
            outcomes,
            vec![ExecutionOutcome::Completed, ExecutionOutcome::LeaseLost]
        );
        assert_eq!(
            fx.provider.uow().jobs_mock().checkpoints(job.id),
            vec![1, 2, 3, 4, 5]
        );
        assert_eq!(fx.job(job.id).status, JobStatus::Completed);
        assert_eq!(fx.target_members(), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_checkpoint_from_a_stale_start_is_rejected() {
        let fx = setup(ThresholdChunkPolicy::default());
        let job = fx.add_job(vec![1, 2, 3]);
        let lease = JobLease::new(fx.executor.worker_id(), Duration::from_secs(30));
        let jobs = fx.provider.uow().jobs_mock();
        jobs.mark_in_progress(job.id, &lease).await.unwrap().unwrap();

        jobs.advance_progress(job.id, &lease, 0, 1).await.unwrap();
        let replayed = jobs.advance_progress(job.id, &lease, 0, 1).await;

        assert!(matches!(
            replayed,
            Err(ApplicationError::Db(DbError::CheckpointRejected { .. }))
        ));
        assert_eq!(jobs.checkpoints(job.id), vec![1]);
    }

    #[tokio::test]
    async fn test_job_removed_between_chunks_stops_execution() {
        let fx = setup(ThresholdChunkPolicy::default());
        let executor = paced_executor(&fx.provider, 30);
        let job = fx.add_job(vec![1, 2, 3, 4, 5]);
        let jobs = fx.provider.uow().jobs_mock();

        // Chunks start at 0ms, 30ms, 60ms: the job goes away during the
        // second pause.
        let (outcome, _) = tokio::join!(executor.execute(job.id), async {
            time::sleep(Duration::from_millis(45)).await;
            jobs.remove(job.id);
        });

        assert_eq!(outcome.unwrap(), ExecutionOutcome::Removed);
        assert!(jobs.snapshot(job.id).is_none());
        assert_eq!(fx.target_members(), vec![1, 2]);
    }
}
