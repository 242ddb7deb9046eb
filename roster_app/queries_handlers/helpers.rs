use uuid::Uuid;

use roster_types::{
    Result,
    errors::{AppError, ApplicationError},
};

use crate::{config::Config, cqrs::queries::MAX_CURSOR_LIMIT, uow::UnitOfWork};

/// Id of the protected collection, used to flag companies as liked.
pub async fn liked_collection_id(
    uow: &Box<dyn UnitOfWork<'_> + '_>,
    config: &Config,
) -> Result<Option<Uuid>, ApplicationError> {
    let protected = uow
        .collections()
        .find_by_name(&config.protected_collection)
        .await?;
    Ok(protected.map(|c| c.id))
}

pub fn validate_limit(limit: u32) -> Result<(), ApplicationError> {
    if limit == 0 || limit > MAX_CURSOR_LIMIT {
        return Err(AppError::InvalidPageLimit {
            limit,
            max: MAX_CURSOR_LIMIT,
        }
        .into());
    }
    Ok(())
}
