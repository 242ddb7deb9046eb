use async_trait::async_trait;
use std::sync::Arc;

use roster_types::{
    Result,
    errors::{AppError, ApplicationError},
};

use crate::{
    config::Config,
    cqrs::{
        Query, QueryHandler,
        queries::{CursorPage, GetCollectionCursorPage},
    },
    queries_handlers::helpers::{liked_collection_id, validate_limit},
    uow::UnitOfWork,
};

/// Keyset pagination over company ids: stable under concurrent inserts,
/// unlike offsets.
pub struct GetCollectionCursorPageHandler {}

impl GetCollectionCursorPageHandler {
    pub fn new() -> Self {
        Self {}
    }
}

fn parse_cursor(cursor: Option<&str>) -> Result<Option<i32>, ApplicationError> {
    match cursor.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<i32>()
            .map(Some)
            .map_err(|_| AppError::InvalidCursor(raw.to_string()).into()),
    }
}

#[async_trait]
impl QueryHandler<GetCollectionCursorPage> for GetCollectionCursorPageHandler {
    async fn handle(
        &self,
        query: GetCollectionCursorPage,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        config: &Arc<Config>,
    ) -> Result<<GetCollectionCursorPage as Query>::Output, ApplicationError> {
        validate_limit(query.limit)?;
        let after = parse_cursor(query.cursor.as_deref())?;

        let collection = uow.collections().get_by_id(query.collection_id).await?;
        let liked = liked_collection_id(uow, config).await?;

        let memberships = uow.memberships();
        let limit = query.limit as usize;
        // One extra row tells whether another page exists.
        let mut companies = memberships
            .list_after(collection.id, after, limit as i64 + 1, liked)
            .await?;
        let has_more = companies.len() > limit;
        companies.truncate(limit);

        let next_cursor = if has_more {
            companies.last().map(|c| c.id.to_string())
        } else {
            None
        };
        let total_count = memberships.count(collection.id).await?;

        Ok(CursorPage {
            companies,
            next_cursor,
            has_more,
            total_count,
        })
    }
}
