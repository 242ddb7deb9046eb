use async_trait::async_trait;
use std::sync::Arc;

use roster_types::errors::ApplicationError;

use crate::{
    config::Config,
    cqrs::{Query, QueryHandler, queries::GetJobStatus},
    uow::UnitOfWork,
};

pub struct GetJobStatusHandler {}

impl GetJobStatusHandler {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait]
impl QueryHandler<GetJobStatus> for GetJobStatusHandler {
    async fn handle(
        &self,
        query: GetJobStatus,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        _config: &Arc<Config>,
    ) -> Result<<GetJobStatus as Query>::Output, ApplicationError> {
        uow.jobs().get_by_id(query.job_id).await
    }
}
