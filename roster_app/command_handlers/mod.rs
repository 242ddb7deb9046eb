mod create_collection;
mod delete_collection;
mod request_job_cancel;
mod submit_batch_add;
mod submit_batch_delete;

pub use create_collection::CreateCollectionCommandHandler;
pub use delete_collection::DeleteCollectionCommandHandler;
pub use request_job_cancel::RequestJobCancelCommandHandler;
pub use submit_batch_add::SubmitBatchAddCommandHandler;
pub use submit_batch_delete::SubmitBatchDeleteCommandHandler;
