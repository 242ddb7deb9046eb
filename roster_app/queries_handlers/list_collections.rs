use async_trait::async_trait;
use std::sync::Arc;

use roster_types::errors::ApplicationError;

use crate::{
    config::Config,
    cqrs::{Query, QueryHandler, queries::ListCollections},
    uow::UnitOfWork,
};

pub struct ListCollectionsHandler {}

impl ListCollectionsHandler {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait]
impl QueryHandler<ListCollections> for ListCollectionsHandler {
    async fn handle(
        &self,
        _query: ListCollections,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        _config: &Arc<Config>,
    ) -> Result<<ListCollections as Query>::Output, ApplicationError> {
        uow.collections().list().await
    }
}
