use std::sync::Arc;
use tracing::info;

use roster_types::{
    Result,
    errors::{AppError, ApplicationError},
};

use crate::{
    config::Config,
    cqrs::{CommandHandler, commands::SubmitBatchDelete},
    jobs::{BatchJob, JobKind},
    uow::UnitOfWork,
};

pub struct SubmitBatchDeleteCommandHandler {}

impl Default for SubmitBatchDeleteCommandHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmitBatchDeleteCommandHandler {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait::async_trait]
impl CommandHandler<SubmitBatchDelete> for SubmitBatchDeleteCommandHandler {
    async fn handle(
        &self,
        command: SubmitBatchDelete,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        config: &Arc<Config>,
    ) -> Result<(), ApplicationError> {
        let collection = uow.collections().get_by_id(command.collection_id).await?;
        if collection.is_protected(&config.protected_collection) {
            return Err(AppError::ProtectedCollection(collection.name).into());
        }

        let job = BatchJob::new(
            command.job_id,
            JobKind::Delete {
                collection_id: collection.id,
            },
            command.company_ids,
        );
        uow.jobs().create(&job).await?;

        info!(job_id = %job.id, total_count = job.total_count, "Batch delete job created");
        Ok(())
    }
}
