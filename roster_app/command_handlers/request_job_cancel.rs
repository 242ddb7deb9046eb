use std::sync::Arc;
use tracing::{debug, info};

use roster_types::{Result, errors::ApplicationError};

use crate::{
    config::Config,
    cqrs::{CommandHandler, commands::RequestJobCancel},
    uow::UnitOfWork,
};

pub struct RequestJobCancelCommandHandler {}

impl Default for RequestJobCancelCommandHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestJobCancelCommandHandler {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait::async_trait]
impl CommandHandler<RequestJobCancel> for RequestJobCancelCommandHandler {
    async fn handle(
        &self,
        command: RequestJobCancel,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        _config: &Arc<Config>,
    ) -> Result<(), ApplicationError> {
        if uow.jobs().request_cancel(command.job_id).await? {
            info!(job_id = %command.job_id, "Cancellation requested");
        } else {
            debug!(job_id = %command.job_id, "Job already terminal, cancellation ignored");
        }
        Ok(())
    }
}
