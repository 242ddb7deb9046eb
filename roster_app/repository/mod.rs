mod collection_repository;
mod job_repository;
mod membership_repository;

pub use collection_repository::CollectionRepository;
pub use job_repository::JobRepository;
pub use membership_repository::MembershipRepository;
