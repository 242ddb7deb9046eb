#[cfg(any(test, feature = "test-utils"))]
#[cfg(not(tarpaulin_include))]
pub mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::{
        collections::{BTreeMap, BTreeSet, HashMap, HashSet},
        sync::{Arc, Mutex},
        time::Duration,
    };
    use uuid::Uuid;

    use roster_types::{
        collection::Collection,
        company::Company,
        errors::{ApplicationError, DbError},
    };

    use crate::{
        config::Config,
        jobs::{BatchJob, JobLease, JobStatus},
        repository::{CollectionRepository, JobRepository, MembershipRepository},
        uow::{UnitOfWork, UnitOfWorkProvider},
    };

    /// Config without pacing, suited to tests.
    pub fn test_config() -> Config {
        Config {
            chunk_delay: Duration::ZERO,
            ..Config::default()
        }
    }

    #[derive(Default, Clone)]
    pub struct MockCollectionRepository {
        collections: Arc<Mutex<HashMap<Uuid, Collection>>>,
    }

    impl MockCollectionRepository {
        pub fn all(&self) -> Vec<Collection> {
            self.collections.lock().unwrap().values().cloned().collect()
        }
    }

    #[async_trait]
    impl CollectionRepository for MockCollectionRepository {
        async fn create(&self, collection: &Collection) -> Result<(), ApplicationError> {
            self.collections
                .lock()
                .unwrap()
                .insert(collection.id, collection.clone());
            Ok(())
        }

        async fn get_by_id(&self, id: Uuid) -> Result<Collection, ApplicationError> {
            self.collections
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or_else(|| ApplicationError::Db(DbError::CollectionNotFound(id)))
        }

        async fn find_by_name(&self, name: &str) -> Result<Option<Collection>, ApplicationError> {
            Ok(self
                .collections
                .lock()
                .unwrap()
                .values()
                .find(|c| c.name == name)
                .cloned())
        }

        async fn list(&self) -> Result<Vec<Collection>, ApplicationError> {
            let mut collections = self.all();
            collections.sort_by_key(|c| c.created_at);
            Ok(collections)
        }

        async fn delete(&self, id: Uuid) -> Result<(), ApplicationError> {
            self.collections.lock().unwrap().remove(&id);
            Ok(())
        }
    }

    type WriteHook = Arc<dyn Fn(usize) + Send + Sync>;

    /// In-memory membership store. Batched writes are all-or-nothing: a write
    /// touching a company registered with `fail_on_company` fails entirely.
    #[derive(Default, Clone)]
    pub struct MockMembershipRepository {
        pairs: Arc<Mutex<BTreeSet<(Uuid, i32)>>>,
        companies: Arc<Mutex<BTreeMap<i32, String>>>,
        failing: Arc<Mutex<HashSet<i32>>>,
        writes: Arc<Mutex<usize>>,
        write_hook: Arc<Mutex<Option<WriteHook>>>,
    }

    impl MockMembershipRepository {
        pub fn add_company(&self, id: i32, name: &str) {
            self.companies.lock().unwrap().insert(id, name.to_string());
        }

        pub fn fail_on_company(&self, id: i32) {
            self.failing.lock().unwrap().insert(id);
        }

        /// Runs `hook` after every successful batched write, with the number
        /// of batched writes so far.
        pub fn on_write(&self, hook: impl Fn(usize) + Send + Sync + 'static) {
            *self.write_hook.lock().unwrap() = Some(Arc::new(hook));
        }

        pub fn members(&self, collection_id: Uuid) -> Vec<i32> {
            self.pairs
                .lock()
                .unwrap()
                .iter()
                .filter(|(c, _)| *c == collection_id)
                .map(|(_, id)| *id)
                .collect()
        }

        pub fn batched_writes(&self) -> usize {
            *self.writes.lock().unwrap()
        }

        fn check_failures(&self, company_ids: &[i32]) -> Result<(), ApplicationError> {
            let failing = self.failing.lock().unwrap();
            match company_ids.iter().find(|id| failing.contains(id)) {
                Some(id) => Err(ApplicationError::Infrastructure(format!(
                    "membership write rejected for company {id}"
                ))),
                None => Ok(()),
            }
        }

        fn record_write(&self) {
            let count = {
                let mut writes = self.writes.lock().unwrap();
                *writes += 1;
                *writes
            };
            let hook = self.write_hook.lock().unwrap().clone();
            if let Some(hook) = hook {
                hook(count);
            }
        }

        fn company(&self, id: i32, liked_collection: Option<Uuid>) -> Company {
            let company_name = self
                .companies
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .unwrap_or_else(|| format!("Company {id}"));
            let liked = liked_collection
                .map(|liked| self.pairs.lock().unwrap().contains(&(liked, id)))
                .unwrap_or(false);
            Company {
                id,
                company_name,
                liked,
            }
        }
    }

    #[async_trait]
    impl MembershipRepository for MockMembershipRepository {
        async fn add(&self, collection_id: Uuid, company_id: i32) -> Result<bool, ApplicationError> {
            self.check_failures(&[company_id])?;
            Ok(self
                .pairs
                .lock()
                .unwrap()
                .insert((collection_id, company_id)))
        }

        async fn remove(
            &self,
            collection_id: Uuid,
            company_id: i32,
        ) -> Result<bool, ApplicationError> {
            self.check_failures(&[company_id])?;
            Ok(self
                .pairs
                .lock()
                .unwrap()
                .remove(&(collection_id, company_id)))
        }

        async fn add_many(
            &self,
            collection_id: Uuid,
            company_ids: &[i32],
        ) -> Result<u64, ApplicationError> {
            self.check_failures(company_ids)?;
            let inserted = {
                let mut pairs = self.pairs.lock().unwrap();
                company_ids
                    .iter()
                    .filter(|id| pairs.insert((collection_id, **id)))
                    .count() as u64
            };
            self.record_write();
            Ok(inserted)
        }

        async fn remove_many(
            &self,
            collection_id: Uuid,
            company_ids: &[i32],
        ) -> Result<u64, ApplicationError> {
            self.check_failures(company_ids)?;
            let removed = {
                let mut pairs = self.pairs.lock().unwrap();
                company_ids
                    .iter()
                    .filter(|id| pairs.remove(&(collection_id, **id)))
                    .count() as u64
            };
            self.record_write();
            Ok(removed)
        }

        async fn delete_by_collection(&self, collection_id: Uuid) -> Result<u64, ApplicationError> {
            let mut pairs = self.pairs.lock().unwrap();
            let before = pairs.len();
            pairs.retain(|(c, _)| *c != collection_id);
            Ok((before - pairs.len()) as u64)
        }

        async fn count(&self, collection_id: Uuid) -> Result<i64, ApplicationError> {
            Ok(self.members(collection_id).len() as i64)
        }

        async fn list_after(
            &self,
            collection_id: Uuid,
            after: Option<i32>,
            limit: i64,
            liked_collection: Option<Uuid>,
        ) -> Result<Vec<Company>, ApplicationError> {
            Ok(self
                .members(collection_id)
                .into_iter()
                .filter(|id| after.is_none_or(|after| *id > after))
                .take(limit.max(0) as usize)
                .map(|id| self.company(id, liked_collection))
                .collect())
        }

        async fn list_page(
            &self,
            collection_id: Uuid,
            offset: i64,
            limit: i64,
            liked_collection: Option<Uuid>,
        ) -> Result<Vec<Company>, ApplicationError> {
            Ok(self
                .members(collection_id)
                .into_iter()
                .skip(offset.max(0) as usize)
                .take(limit.max(0) as usize)
                .map(|id| self.company(id, liked_collection))
                .collect())
        }

        async fn list_company_ids(&self, collection_id: Uuid) -> Result<Vec<i32>, ApplicationError> {
            Ok(self.members(collection_id))
        }
    }

    #[derive(Default, Clone)]
    pub struct MockJobRepository {
        jobs: Arc<Mutex<HashMap<Uuid, BatchJob>>>,
        checkpoints: Arc<Mutex<Vec<(Uuid, i32)>>>,
        locked_reads: Arc<Mutex<usize>>,
    }

    impl MockJobRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// Stores a job as is, bypassing any state checks.
        pub fn insert(&self, job: BatchJob) {
            self.jobs.lock().unwrap().insert(job.id, job);
        }

        pub fn snapshot(&self, job_id: Uuid) -> Option<BatchJob> {
            self.jobs.lock().unwrap().get(&job_id).cloned()
        }

        pub fn all(&self) -> Vec<BatchJob> {
            self.jobs.lock().unwrap().values().cloned().collect()
        }

        /// Drops a job, like a collection deletion running concurrently.
        pub fn remove(&self, job_id: Uuid) {
            self.jobs.lock().unwrap().remove(&job_id);
        }

        /// How many times a job row was read with `get_for_update`.
        pub fn locked_reads(&self) -> usize {
            *self.locked_reads.lock().unwrap()
        }

        /// Sets the cancellation flag regardless of status, like a concurrent
        /// request landing between two chunks.
        pub fn flag_cancel(&self, job_id: Uuid) {
            if let Some(job) = self.jobs.lock().unwrap().get_mut(&job_id) {
                job.cancel_requested = true;
            }
        }

        /// Every accepted checkpoint, in order.
        pub fn checkpoints(&self, job_id: Uuid) -> Vec<i32> {
            self.checkpoints
                .lock()
                .unwrap()
                .iter()
                .filter(|(id, _)| *id == job_id)
                .map(|(_, count)| *count)
                .collect()
        }
    }

    #[async_trait]
    impl JobRepository for MockJobRepository {
        async fn create(&self, job: &BatchJob) -> Result<(), ApplicationError> {
            self.insert(job.clone());
            Ok(())
        }

        async fn get_by_id(&self, id: Uuid) -> Result<BatchJob, ApplicationError> {
            self.snapshot(id)
                .ok_or_else(|| ApplicationError::Db(DbError::JobNotFound(id)))
        }

        async fn get_for_update(&self, id: Uuid) -> Result<BatchJob, ApplicationError> {
            *self.locked_reads.lock().unwrap() += 1;
            self.get_by_id(id).await
        }

        async fn mark_in_progress(
            &self,
            job_id: Uuid,
            lease: &JobLease,
        ) -> Result<Option<BatchJob>, ApplicationError> {
            let now = Utc::now();
            let mut jobs = self.jobs.lock().unwrap();
            let Some(job) = jobs.get_mut(&job_id) else {
                return Ok(None);
            };
            if job.is_terminal() || job.is_leased_by_other(lease.owner, now) {
                return Ok(None);
            }

            job.status = JobStatus::InProgress;
            job.lease_owner = Some(lease.owner);
            job.lease_expires_at = Some(lease.expires_at(now));
            job.updated_at = now;
            Ok(Some(job.clone()))
        }

        async fn advance_progress(
            &self,
            job_id: Uuid,
            lease: &JobLease,
            from: i32,
            processed_count: i32,
        ) -> Result<(), ApplicationError> {
            let now = Utc::now();
            let mut jobs = self.jobs.lock().unwrap();
            let rejected = || {
                ApplicationError::Db(DbError::CheckpointRejected {
                    job_id,
                    processed_count,
                })
            };
            let job = jobs.get_mut(&job_id).ok_or_else(rejected)?;
            if job.status != JobStatus::InProgress
                || job.lease_owner != Some(lease.owner)
                || job.processed_count != from
                || processed_count < from
                || processed_count > job.total_count
            {
                return Err(rejected());
            }

            job.processed_count = processed_count;
            job.lease_expires_at = Some(lease.expires_at(now));
            job.updated_at = now;
            self.checkpoints
                .lock()
                .unwrap()
                .push((job_id, processed_count));
            Ok(())
        }

        async fn mark_terminal(
            &self,
            job_id: Uuid,
            status: JobStatus,
            error_message: Option<&str>,
        ) -> Result<bool, ApplicationError> {
            let mut jobs = self.jobs.lock().unwrap();
            let Some(job) = jobs.get_mut(&job_id) else {
                return Ok(false);
            };
            if job.is_terminal() {
                return Ok(false);
            }

            job.status = status;
            job.error_message = error_message.map(str::to_string);
            job.lease_owner = None;
            job.lease_expires_at = None;
            job.updated_at = Utc::now();
            Ok(true)
        }

        async fn request_cancel(&self, job_id: Uuid) -> Result<bool, ApplicationError> {
            let mut jobs = self.jobs.lock().unwrap();
            let job = jobs
                .get_mut(&job_id)
                .ok_or_else(|| ApplicationError::Db(DbError::JobNotFound(job_id)))?;
            if job.is_terminal() {
                return Ok(false);
            }

            job.cancel_requested = true;
            job.updated_at = Utc::now();
            Ok(true)
        }

        async fn list_resumable(
            &self,
            limit: i64,
            stale_before: DateTime<Utc>,
        ) -> Result<Vec<BatchJob>, ApplicationError> {
            let now = Utc::now();
            let mut jobs: Vec<BatchJob> = self
                .all()
                .into_iter()
                .filter(|job| !job.is_terminal())
                .filter(|job| match (job.lease_owner, job.lease_expires_at) {
                    (None, _) => job.created_at < stale_before,
                    (Some(_), Some(expires_at)) => expires_at < now,
                    (Some(_), None) => false,
                })
                .collect();
            jobs.sort_by_key(|job| job.created_at);
            jobs.truncate(limit.max(0) as usize);
            Ok(jobs)
        }

        async fn delete_by_collection(&self, collection_id: Uuid) -> Result<u64, ApplicationError> {
            let mut jobs = self.jobs.lock().unwrap();
            let before = jobs.len();
            jobs.retain(|_, job| !job.kind.references(collection_id));
            Ok((before - jobs.len()) as u64)
        }
    }

    #[derive(Default, Clone)]
    pub struct MockUnitOfWork {
        collections: Arc<MockCollectionRepository>,
        memberships: Arc<MockMembershipRepository>,
        jobs: Arc<MockJobRepository>,

        // Flags to check if commit/rollback was called
        committed: Arc<Mutex<bool>>,
        rolled_back: Arc<Mutex<bool>>,
    }

    impl MockUnitOfWork {
        pub fn new() -> Self {
            Default::default()
        }

        pub fn collections_mock(&self) -> Arc<MockCollectionRepository> {
            self.collections.clone()
        }

        pub fn memberships_mock(&self) -> Arc<MockMembershipRepository> {
            self.memberships.clone()
        }

        pub fn jobs_mock(&self) -> Arc<MockJobRepository> {
            self.jobs.clone()
        }

        pub fn was_committed(&self) -> bool {
            *self.committed.lock().unwrap()
        }

        pub fn was_rolled_back(&self) -> bool {
            *self.rolled_back.lock().unwrap()
        }

        /// Stores a collection directly, bypassing any command validation.
        pub fn seed_collection(&self, name: &str) -> Collection {
            let collection = Collection::new(name);
            self.collections
                .collections
                .lock()
                .unwrap()
                .insert(collection.id, collection.clone());
            collection
        }
    }

    #[async_trait]
    impl<'a> UnitOfWork<'a> for MockUnitOfWork {
        fn collections(&self) -> Arc<dyn CollectionRepository + 'a> {
            self.collections.clone()
        }

        fn memberships(&self) -> Arc<dyn MembershipRepository + 'a> {
            self.memberships.clone()
        }

        fn jobs(&self) -> Arc<dyn JobRepository + 'a> {
            self.jobs.clone()
        }

        async fn commit(self: Box<Self>) -> Result<(), ApplicationError> {
            *self.committed.lock().unwrap() = true;
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<(), ApplicationError> {
            *self.rolled_back.lock().unwrap() = true;
            Ok(())
        }
    }

    /// Hands out clones of the same `MockUnitOfWork`, so state written through
    /// one unit of work is visible to the next.
    #[derive(Default, Clone)]
    pub struct MockUnitOfWorkProvider {
        uow: MockUnitOfWork,
    }

    impl MockUnitOfWorkProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn uow(&self) -> &MockUnitOfWork {
            &self.uow
        }
    }

    #[async_trait]
    impl UnitOfWorkProvider for MockUnitOfWorkProvider {
        async fn begin<'p>(&'p self) -> Result<Box<dyn UnitOfWork<'p> + 'p>, ApplicationError> {
            let uow: Box<dyn UnitOfWork<'_> + '_> = Box::new(self.uow.clone());
            Ok(uow)
        }
    }
}
