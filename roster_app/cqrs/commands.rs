use uuid::Uuid;

use crate::cqrs::Command;

#[derive(Debug, Clone)]
pub struct CreateCollection {
    pub id: Uuid,
    pub name: String,
}

impl Command for CreateCollection {}

/// Deletes a collection together with the jobs and memberships referencing it.
#[derive(Debug, Clone)]
pub struct DeleteCollection {
    pub id: Uuid,
}

impl Command for DeleteCollection {}

/// Records a batch job copying companies into `target_collection_id`.
/// `job_id` is chosen by the caller, so it's known once the command commits.
#[derive(Debug, Clone)]
pub struct SubmitBatchAdd {
    pub job_id: Uuid,
    pub source_collection_id: Uuid,
    pub target_collection_id: Uuid,
    pub company_ids: Vec<i32>,
}

impl Command for SubmitBatchAdd {}

#[derive(Debug, Clone)]
pub struct SubmitBatchDelete {
    pub job_id: Uuid,
    pub collection_id: Uuid,
    pub company_ids: Vec<i32>,
}

impl Command for SubmitBatchDelete {}

#[derive(Debug, Clone)]
pub struct RequestJobCancel {
    pub job_id: Uuid,
}

impl Command for RequestJobCancel {}
