mod batch_handler;
mod collection_handler;
mod helpers;

pub use batch_handler::{
    BatchAddRequest, BatchDeleteRequest, JobStatusResponse, add_companies, cancel_job,
    delete_companies, job_status,
};
pub use collection_handler::{
    CollectionMetadata, CreateCollectionRequest, collection_company_ids, collection_cursor_page,
    collection_page, create_collection, delete_collection, list_collections,
};
pub use helpers::{ApiError, ErrorResponse, MessageResponse};
