use std::sync::Arc;
use tracing::info;

use roster_types::{
    Result,
    errors::{AppError, ApplicationError},
};

use crate::{
    config::Config,
    cqrs::{CommandHandler, commands::SubmitBatchAdd},
    jobs::{BatchJob, JobKind},
    uow::UnitOfWork,
};

pub struct SubmitBatchAddCommandHandler {}

impl Default for SubmitBatchAddCommandHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmitBatchAddCommandHandler {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait::async_trait]
impl CommandHandler<SubmitBatchAdd> for SubmitBatchAddCommandHandler {
    async fn handle(
        &self,
        command: SubmitBatchAdd,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        _config: &Arc<Config>,
    ) -> Result<(), ApplicationError> {
        if command.source_collection_id == command.target_collection_id {
            return Err(AppError::SameSourceAndTarget.into());
        }

        let collections = uow.collections();
        collections.get_by_id(command.source_collection_id).await?;
        collections.get_by_id(command.target_collection_id).await?;

        let job = BatchJob::new(
            command.job_id,
            JobKind::Add {
                source_collection_id: command.source_collection_id,
                target_collection_id: command.target_collection_id,
            },
            command.company_ids,
        );
        uow.jobs().create(&job).await?;

        info!(job_id = %job.id, total_count = job.total_count, "Batch add job created");
        Ok(())
    }
}
