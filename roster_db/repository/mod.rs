mod collection_repository;
mod job_repository;
mod membership_repository;

pub use collection_repository::{PostgresCollectionRepository, bootstrap_protected_collection};
pub use job_repository::PostgresJobRepository;
pub use membership_repository::PostgresMembershipRepository;
