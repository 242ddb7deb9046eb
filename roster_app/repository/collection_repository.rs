use uuid::Uuid;

use roster_types::{collection::Collection, errors::ApplicationError};

#[async_trait::async_trait]
pub trait CollectionRepository: Send + Sync {
    /// Creates a new collection on the db.
    async fn create(&self, collection: &Collection) -> Result<(), ApplicationError>;

    /// Find a collection by id.
    async fn get_by_id(&self, id: Uuid) -> Result<Collection, ApplicationError>;

    /// Find a collection by its unique name, if any.
    async fn find_by_name(&self, name: &str) -> Result<Option<Collection>, ApplicationError>;

    /// Lists all collections, oldest first.
    async fn list(&self) -> Result<Vec<Collection>, ApplicationError>;

    /// Removes the collection row itself. Jobs and memberships referencing it
    /// must be gone already.
    async fn delete(&self, id: Uuid) -> Result<(), ApplicationError>;
}
