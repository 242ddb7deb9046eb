use async_trait::async_trait;
use std::sync::Arc;

use roster_types::errors::ApplicationError;

use crate::{
    config::Config,
    cqrs::{Query, QueryHandler, queries::ListResumableJobs},
    uow::UnitOfWork,
};

pub struct ListResumableJobsHandler {}

impl ListResumableJobsHandler {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait]
impl QueryHandler<ListResumableJobs> for ListResumableJobsHandler {
    async fn handle(
        &self,
        query: ListResumableJobs,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        _config: &Arc<Config>,
    ) -> Result<<ListResumableJobs as Query>::Output, ApplicationError> {
        uow.jobs()
            .list_resumable(query.limit, query.stale_before)
            .await
    }
}
