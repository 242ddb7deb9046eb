use std::sync::Arc;
use tracing::info;

use roster_types::{
    Result,
    errors::{AppError, ApplicationError},
};

use crate::{
    config::Config,
    cqrs::{CommandHandler, commands::DeleteCollection},
    uow::UnitOfWork,
};

/// Removes jobs, then memberships, then the collection itself.
/// The order matters for the foreign keys on the job and membership tables.
pub struct DeleteCollectionCommandHandler {}

impl Default for DeleteCollectionCommandHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl DeleteCollectionCommandHandler {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait::async_trait]
impl CommandHandler<DeleteCollection> for DeleteCollectionCommandHandler {
    async fn handle(
        &self,
        command: DeleteCollection,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        config: &Arc<Config>,
    ) -> Result<(), ApplicationError> {
        let collection = uow.collections().get_by_id(command.id).await?;
        if collection.is_protected(&config.protected_collection) {
            return Err(AppError::ProtectedCollection(collection.name).into());
        }

        let jobs = uow.jobs().delete_by_collection(collection.id).await?;
        let memberships = uow.memberships().delete_by_collection(collection.id).await?;
        uow.collections().delete(collection.id).await?;

        info!(
            collection_id = %collection.id,
            jobs, memberships, "Collection deleted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use roster_types::errors::DbError;

    use super::*;
    use crate::{
        jobs::{BatchJob, JobKind},
        test_utils::tests::{MockUnitOfWork, test_config},
    };

    #[tokio::test]
    async fn test_delete_collection_cascades() {
        let config = Arc::new(test_config());
        let mock_uow = MockUnitOfWork::new();
        let doomed = mock_uow.seed_collection("Prospects");
        let other = mock_uow.seed_collection("Leads");

        let referencing = BatchJob::new(
            Uuid::new_v4(),
            JobKind::Add {
                source_collection_id: other.id,
                target_collection_id: doomed.id,
            },
            vec![1],
        );
        let unrelated = BatchJob::new(
            Uuid::new_v4(),
            JobKind::Delete {
                collection_id: other.id,
            },
            vec![2],
        );
        mock_uow.jobs_mock().insert(referencing.clone());
        mock_uow.jobs_mock().insert(unrelated.clone());

        let mock_uow: Box<dyn UnitOfWork<'_> + '_> = Box::new(mock_uow);
        mock_uow.memberships().add(doomed.id, 1).await.unwrap();
        mock_uow.memberships().add(other.id, 1).await.unwrap();

        let handler = DeleteCollectionCommandHandler::new();
        handler
            .handle(DeleteCollection { id: doomed.id }, &mock_uow, &config)
            .await
            .unwrap();

        let result = mock_uow.collections().get_by_id(doomed.id).await;
        assert!(matches!(
            result,
            Err(ApplicationError::Db(DbError::CollectionNotFound(_)))
        ));
        assert_eq!(mock_uow.memberships().count(doomed.id).await.unwrap(), 0);
        assert_eq!(mock_uow.memberships().count(other.id).await.unwrap(), 1);
        assert!(mock_uow.jobs().get_by_id(referencing.id).await.is_err());
        assert!(mock_uow.jobs().get_by_id(unrelated.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_protected_collection_fails() {
        let config = Arc::new(test_config());
        let mock_uow = MockUnitOfWork::new();
        let protected = mock_uow.seed_collection(&config.protected_collection);
        let mock_uow: Box<dyn UnitOfWork<'_> + '_> = Box::new(mock_uow);
        let handler = DeleteCollectionCommandHandler::new();

        let result = handler
            .handle(DeleteCollection { id: protected.id }, &mock_uow, &config)
            .await;

        assert!(matches!(
            result,
            Err(ApplicationError::App(AppError::ProtectedCollection(_)))
        ));
        assert!(mock_uow.collections().get_by_id(protected.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_unknown_collection() {
        let config = Arc::new(test_config());
        let mock_uow: Box<dyn UnitOfWork<'_> + '_> = Box::new(MockUnitOfWork::new());
        let handler = DeleteCollectionCommandHandler::new();

        let result = handler
            .handle(DeleteCollection { id: Uuid::new_v4() }, &mock_uow, &config)
            .await;

        assert!(result.unwrap_err().is_not_found());
    }
}
