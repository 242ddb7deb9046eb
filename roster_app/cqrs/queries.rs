use chrono::{DateTime, Utc};
use roster_types::{collection::Collection, company::Company};
use uuid::Uuid;

use crate::{cqrs::Query, jobs::BatchJob};

pub const DEFAULT_CURSOR_LIMIT: u32 = 100;
pub const MAX_CURSOR_LIMIT: u32 = 1000;

/// Lists every collection.
pub struct ListCollections;

impl Query for ListCollections {
    type Output = Vec<Collection>;
}

/// Offset based page of a collection.
pub struct GetCollectionPage {
    pub collection_id: Uuid,
    pub offset: u32,
    pub limit: u32,
}

#[derive(Debug, Clone)]
pub struct CollectionPage {
    pub collection: Collection,
    pub companies: Vec<Company>,
    pub total: i64,
}

impl Query for GetCollectionPage {
    type Output = CollectionPage;
}

/// Keyset page of a collection, ordered by company id.
/// `cursor` is the last company id seen, exclusive.
pub struct GetCollectionCursorPage {
    pub collection_id: Uuid,
    pub cursor: Option<String>,
    pub limit: u32,
}

#[derive(Debug, Clone)]
pub struct CursorPage {
    pub companies: Vec<Company>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
    pub total_count: i64,
}

impl Query for GetCollectionCursorPage {
    type Output = CursorPage;
}

/// All company ids of a collection, for "select all" across pages.
pub struct GetCollectionCompanyIds {
    pub collection_id: Uuid,
}

impl Query for GetCollectionCompanyIds {
    type Output = Vec<i32>;
}

pub struct GetJobStatus {
    pub job_id: Uuid,
}

impl Query for GetJobStatus {
    type Output = BatchJob;
}

/// Jobs left behind by a dead executor.
pub struct ListResumableJobs {
    pub limit: i64,
    pub stale_before: DateTime<Utc>,
}

impl Query for ListResumableJobs {
    type Output = Vec<BatchJob>;
}
