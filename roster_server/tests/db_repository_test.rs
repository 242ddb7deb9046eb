
#[cfg(test)]
pub mod tests {
    use chrono::Utc;
    use std::time::Duration;
    use uuid::Uuid;

    use roster_app::{
        command_handlers::DeleteCollectionCommandHandler,
        cqrs::commands::DeleteCollection,
        jobs::{BatchJob, JobKind, JobLease, JobStatus},
    };
    use roster_types::{
        collection::Collection,
        errors::{ApplicationError, DbError},
    };

    use crate::test_utils::tests::{seed_companies, setup_db_app};

    #[tokio::test]
    async fn test_membership_writes_are_idempotent() -> Result<(), ApplicationError> {
        let (_, _, uow_provider, master_tx, _) = setup_db_app().await?;
        let ids = seed_companies(&master_tx, 3).await?;
        let uow = uow_provider.begin().await?;

        let collection = Collection::new(format!("Prospects {}", Uuid::new_v4()));
        uow.collections().create(&collection).await?;

        let memberships = uow.memberships();
        let inserted = memberships
            .add_many(collection.id, &[ids[1], ids[0], ids[1]])
            .await?;
        assert_eq!(inserted, 2);
        assert_eq!(memberships.add_many(collection.id, &[ids[0]]).await?, 0);
        assert!(!memberships.add(collection.id, ids[1]).await?);
        assert_eq!(memberships.count(collection.id).await?, 2);

        let listed = memberships.list_after(collection.id, None, 10, None).await?;
        let listed_ids: Vec<i32> = listed.iter().map(|c| c.id).collect();
        assert_eq!(listed_ids, vec![ids[0], ids[1]]);
        assert!(listed.iter().all(|c| !c.liked));

        let after_first = memberships
            .list_after(collection.id, Some(ids[0]), 10, None)
            .await?;
        assert_eq!(after_first.len(), 1);
        assert_eq!(after_first[0].id, ids[1]);

        assert_eq!(
            memberships.remove_many(collection.id, &[ids[0], ids[2]]).await?,
            1
        );
        assert_eq!(memberships.list_company_ids(collection.id).await?, vec![ids[1]]);

        Ok(())
    }

    #[tokio::test]
    async fn test_job_lease_and_checkpoints() -> Result<(), ApplicationError> {
        let (_, _, uow_provider, master_tx, _) = setup_db_app().await?;
        let ids = seed_companies(&master_tx, 3).await?;
        let uow = uow_provider.begin().await?;

        let source = Collection::new(format!("Source {}", Uuid::new_v4()));
        let target = Collection::new(format!("Target {}", Uuid::new_v4()));
        uow.collections().create(&source).await?;
        uow.collections().create(&target).await?;

        let job = BatchJob::new(
            Uuid::new_v4(),
            JobKind::Add {
                source_collection_id: source.id,
                target_collection_id: target.id,
            },
            ids.clone(),
        );
        let jobs = uow.jobs();
        jobs.create(&job).await?;

        let resumable = jobs
            .list_resumable(10, Utc::now() + chrono::Duration::seconds(1))
            .await?;
        assert!(resumable.iter().any(|j| j.id == job.id));

        let owner = JobLease::new(Uuid::new_v4(), Duration::from_secs(30));
        let intruder = JobLease::new(Uuid::new_v4(), Duration::from_secs(30));

        let claimed = jobs.mark_in_progress(job.id, &owner).await?.unwrap();
        assert_eq!(claimed.status, JobStatus::InProgress);
        assert_eq!(claimed.lease_owner, Some(owner.owner));
        assert_eq!(claimed.company_ids, ids);
        assert!(jobs.mark_in_progress(job.id, &intruder).await?.is_none());

        let rejected = jobs.advance_progress(job.id, &intruder, 0, 1).await;
        assert!(matches!(
            rejected,
            Err(ApplicationError::Db(DbError::CheckpointRejected { .. }))
        ));

        jobs.advance_progress(job.id, &owner, 0, 2).await?;
        // Replaying the same chunk, going backwards, or past the total.
        assert!(jobs.advance_progress(job.id, &owner, 0, 2).await.is_err());
        assert!(jobs.advance_progress(job.id, &owner, 2, 1).await.is_err());
        assert!(jobs.advance_progress(job.id, &owner, 2, 4).await.is_err());

        let locked = jobs.get_for_update(job.id).await?;
        assert_eq!(locked.processed_count, 2);
        assert_eq!(locked.lease_owner, Some(owner.owner));
        assert!(matches!(
            jobs.get_for_update(Uuid::new_v4()).await,
            Err(ApplicationError::Db(DbError::JobNotFound(_)))
        ));

        assert!(jobs.request_cancel(job.id).await?);
        assert!(jobs.get_by_id(job.id).await?.cancel_requested);
        assert!(jobs.mark_terminal(job.id, JobStatus::Cancelled, None).await?);
        assert!(!jobs.request_cancel(job.id).await?);
        assert!(!jobs.mark_terminal(job.id, JobStatus::Completed, None).await?);

        let stored = jobs.get_by_id(job.id).await?;
        assert_eq!(stored.status, JobStatus::Cancelled);
        assert!(stored.lease_owner.is_none());

        let missing = jobs.request_cancel(Uuid::new_v4()).await;
        assert!(matches!(
            missing,
            Err(ApplicationError::Db(DbError::JobNotFound(_)))
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_batch_add_end_to_end() -> Result<(), ApplicationError> {
        let (_, supervisor, uow_provider, master_tx, _) = setup_db_app().await?;
        let ids = seed_companies(&master_tx, 4).await?;

        let source = Collection::new(format!("Source {}", Uuid::new_v4()));
        let target = Collection::new(format!("Target {}", Uuid::new_v4()));
        {
            let uow = uow_provider.begin().await?;
            uow.collections().create(&source).await?;
            uow.collections().create(&target).await?;
            uow.memberships().add(target.id, ids[0]).await?;
        }

        let job = supervisor.submit_add(source.id, target.id, ids.clone()).await?;
        let mut job = job;
        for _ in 0..200 {
            if job.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            job = supervisor.get_status(job.id).await?;
        }
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.processed_count, 4);

        let uow = uow_provider.begin().await?;
        assert_eq!(uow.memberships().list_company_ids(target.id).await?, ids);

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_collection_cascades() -> Result<(), ApplicationError> {
        let (app_bus, _, uow_provider, master_tx, _) = setup_db_app().await?;
        let ids = seed_companies(&master_tx, 2).await?;

        let collection = Collection::new(format!("Prospects {}", Uuid::new_v4()));
        let job = BatchJob::new(
            Uuid::new_v4(),
            JobKind::Delete {
                collection_id: collection.id,
            },
            ids.clone(),
        );
        {
            let uow = uow_provider.begin().await?;
            uow.collections().create(&collection).await?;
            uow.memberships().add_many(collection.id, &ids).await?;
            uow.jobs().create(&job).await?;
        }

        app_bus
            .execute(
                DeleteCollection { id: collection.id },
                DeleteCollectionCommandHandler::new(),
            )
            .await?;

        let uow = uow_provider.begin().await?;
        assert!(matches!(
            uow.collections().get_by_id(collection.id).await,
            Err(ApplicationError::Db(DbError::CollectionNotFound(_)))
        ));
        assert_eq!(uow.memberships().count(collection.id).await?, 0);
        assert!(matches!(
            uow.jobs().get_by_id(job.id).await,
            Err(ApplicationError::Db(DbError::JobNotFound(_)))
        ));

        Ok(())
    }
}
