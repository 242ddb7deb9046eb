use uuid::Uuid;

use roster_types::{company::Company, errors::ApplicationError};

/// Durable (collection, company) pairs. Every write is idempotent.
#[async_trait::async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Adds a single pair. Returns false if it was already there.
    async fn add(&self, collection_id: Uuid, company_id: i32) -> Result<bool, ApplicationError>;

    /// Removes a single pair. Returns false if it wasn't there.
    async fn remove(&self, collection_id: Uuid, company_id: i32)
    -> Result<bool, ApplicationError>;

    /// Adds all pairs with one statement, returning how many rows were inserted.
    /// Duplicates and already existing pairs are skipped.
    async fn add_many(
        &self,
        collection_id: Uuid,
        company_ids: &[i32],
    ) -> Result<u64, ApplicationError>;

    /// Removes all pairs with one statement, returning how many rows were deleted.
    async fn remove_many(
        &self,
        collection_id: Uuid,
        company_ids: &[i32],
    ) -> Result<u64, ApplicationError>;

    /// Drops every membership of a collection.
    async fn delete_by_collection(&self, collection_id: Uuid) -> Result<u64, ApplicationError>;

    /// Number of companies in a collection.
    async fn count(&self, collection_id: Uuid) -> Result<i64, ApplicationError>;

    /// Companies with id strictly greater than `after`, ordered by id.
    /// `liked_collection` is used to flag members of that collection.
    async fn list_after(
        &self,
        collection_id: Uuid,
        after: Option<i32>,
        limit: i64,
        liked_collection: Option<Uuid>,
    ) -> Result<Vec<Company>, ApplicationError>;

    /// Offset-based variant of `list_after`.
    async fn list_page(
        &self,
        collection_id: Uuid,
        offset: i64,
        limit: i64,
        liked_collection: Option<Uuid>,
    ) -> Result<Vec<Company>, ApplicationError>;

    /// Every company id in a collection, ascending.
    async fn list_company_ids(&self, collection_id: Uuid) -> Result<Vec<i32>, ApplicationError>;
}
