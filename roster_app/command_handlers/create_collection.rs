use std::sync::Arc;

use roster_types::{
    Result,
    collection::Collection,
    errors::{AppError, ApplicationError},
};

use crate::{
    config::Config,
    cqrs::{CommandHandler, commands::CreateCollection},
    uow::UnitOfWork,
};

pub struct CreateCollectionCommandHandler {}

impl Default for CreateCollectionCommandHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CreateCollectionCommandHandler {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait::async_trait]
impl CommandHandler<CreateCollection> for CreateCollectionCommandHandler {
    async fn handle(
        &self,
        command: CreateCollection,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        _config: &Arc<Config>,
    ) -> Result<(), ApplicationError> {
        let name = command.name.trim();
        if name.is_empty() {
            return Err(AppError::BlankCollectionName.into());
        }

        let repo = uow.collections();
        if repo.find_by_name(name).await?.is_some() {
            return Err(AppError::CollectionNameTaken(name.to_string()).into());
        }

        repo.create(&Collection::with_id(command.id, name)).await?;
        Ok(())
    }
}
