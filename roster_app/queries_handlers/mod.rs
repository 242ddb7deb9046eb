mod get_collection_company_ids;
mod get_collection_cursor_page;
mod get_collection_page;
mod get_job_status;
mod helpers;
mod list_collections;
mod list_resumable_jobs;

pub use get_collection_company_ids::GetCollectionCompanyIdsHandler;
pub use get_collection_cursor_page::GetCollectionCursorPageHandler;
pub use get_collection_page::GetCollectionPageHandler;
pub use get_job_status::GetJobStatusHandler;
pub use list_collections::ListCollectionsHandler;
pub use list_resumable_jobs::ListResumableJobsHandler;
