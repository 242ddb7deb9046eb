use async_trait::async_trait;
use std::sync::Arc;

use roster_types::errors::ApplicationError;

use crate::{
    config::Config,
    cqrs::{Query, QueryHandler, queries::GetCollectionCompanyIds},
    uow::UnitOfWork,
};

pub struct GetCollectionCompanyIdsHandler {}

impl GetCollectionCompanyIdsHandler {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait]
impl QueryHandler<GetCollectionCompanyIds> for GetCollectionCompanyIdsHandler {
    async fn handle(
        &self,
        query: GetCollectionCompanyIds,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        _config: &Arc<Config>,
    ) -> Result<<GetCollectionCompanyIds as Query>::Output, ApplicationError> {
        uow.collections().get_by_id(query.collection_id).await?;
        uow.memberships()
            .list_company_ids(query.collection_id)
            .await
    }
}
