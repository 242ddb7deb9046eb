use async_trait::async_trait;
use std::sync::Arc;

use roster_types::errors::ApplicationError;

use crate::{
    config::Config,
    cqrs::{
        Query, QueryHandler,
        queries::{CollectionPage, GetCollectionPage},
    },
    queries_handlers::helpers::{liked_collection_id, validate_limit},
    uow::UnitOfWork,
};

pub struct GetCollectionPageHandler {}

impl GetCollectionPageHandler {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait]
impl QueryHandler<GetCollectionPage> for GetCollectionPageHandler {
    async fn handle(
        &self,
        query: GetCollectionPage,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        config: &Arc<Config>,
    ) -> Result<<GetCollectionPage as Query>::Output, ApplicationError> {
        validate_limit(query.limit)?;

        let collection = uow.collections().get_by_id(query.collection_id).await?;
        let liked = liked_collection_id(uow, config).await?;

        let memberships = uow.memberships();
        let companies = memberships
            .list_page(
                collection.id,
                i64::from(query.offset),
                i64::from(query.limit),
                liked,
            )
            .await?;
        let total = memberships.count(collection.id).await?;

        Ok(CollectionPage {
            collection,
            companies,
            total,
        })
    }
}
