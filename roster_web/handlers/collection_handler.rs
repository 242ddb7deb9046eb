use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use roster_app::{
    command_handlers::{CreateCollectionCommandHandler, DeleteCollectionCommandHandler},
    cqrs::{
        commands::{CreateCollection, DeleteCollection},
        queries::{
            DEFAULT_CURSOR_LIMIT, GetCollectionCompanyIds, GetCollectionCursorPage,
            GetCollectionPage, ListCollections,
        },
    },
    queries_handlers::{
        GetCollectionCompanyIdsHandler, GetCollectionCursorPageHandler, GetCollectionPageHandler,
        ListCollectionsHandler,
    },
};
use roster_types::{collection::Collection, company::Company};

use crate::{
    handlers::helpers::{ApiError, MessageResponse},
    http::AppState,
};

const DEFAULT_PAGE_LIMIT: u32 = 10;

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionMetadata {
    pub id: Uuid,
    pub collection_name: String,
}

impl From<Collection> for CollectionMetadata {
    fn from(collection: Collection) -> Self {
        Self {
            id: collection.id,
            collection_name: collection.name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCollectionRequest {
    pub collection_name: String,
}

#[derive(Debug, Serialize)]
struct CreateCollectionResponse {
    id: Uuid,
    collection_name: String,
    message: String,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
struct CollectionPageResponse {
    id: Uuid,
    collection_name: String,
    companies: Vec<Company>,
    total: i64,
}

#[derive(Debug, Deserialize)]
pub struct CursorParams {
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
struct CursorPageResponse {
    companies: Vec<Company>,
    next_cursor: Option<String>,
    has_more: bool,
    total_count: i64,
}

#[derive(Debug, Serialize)]
struct CompanyIdsResponse {
    company_ids: Vec<i32>,
    total_count: usize,
}

/// GET /collections
pub async fn list_collections(State(state): State<AppState>) -> Result<Response, ApiError> {
    let collections = state
        .app_bus
        .query(ListCollections, ListCollectionsHandler::new())
        .await?;

    let response: Vec<CollectionMetadata> = collections.into_iter().map(Into::into).collect();
    Ok(Json(response).into_response())
}

/// POST /collections
pub async fn create_collection(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<CreateCollectionRequest>, ApiError>,
) -> Result<Response, ApiError> {
    let id = Uuid::new_v4();
    let collection_name = body.collection_name.trim().to_string();
    let command = CreateCollection {
        id,
        name: collection_name.clone(),
    };
    state
        .app_bus
        .execute(command, CreateCollectionCommandHandler::new())
        .await?;

    Ok(Json(CreateCollectionResponse {
        id,
        collection_name,
        message: "Collection created successfully".to_string(),
    })
    .into_response())
}

/// DELETE /collections/{collection_id}
pub async fn delete_collection(
    State(state): State<AppState>,
    WithRejection(Path(collection_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Response, ApiError> {
    state
        .app_bus
        .execute(
            DeleteCollection { id: collection_id },
            DeleteCollectionCommandHandler::new(),
        )
        .await?;

    Ok(Json(MessageResponse::new("Collection deleted successfully")).into_response())
}

/// GET /collections/{collection_id}?offset=&limit=
pub async fn collection_page(
    State(state): State<AppState>,
    WithRejection(Path(collection_id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Query(params), _): WithRejection<Query<PageParams>, ApiError>,
) -> Result<Response, ApiError> {
    let query = GetCollectionPage {
        collection_id,
        offset: params.offset.unwrap_or(0),
        limit: params.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
    };
    let page = state
        .app_bus
        .query(query, GetCollectionPageHandler::new())
        .await?;

    Ok(Json(CollectionPageResponse {
        id: page.collection.id,
        collection_name: page.collection.name,
        companies: page.companies,
        total: page.total,
    })
    .into_response())
}

/// GET /collections/{collection_id}/companies/cursor?cursor=&limit=
pub async fn collection_cursor_page(
    State(state): State<AppState>,
    WithRejection(Path(collection_id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Query(params), _): WithRejection<Query<CursorParams>, ApiError>,
) -> Result<Response, ApiError> {
    let query = GetCollectionCursorPage {
        collection_id,
        cursor: params.cursor,
        limit: params.limit.unwrap_or(DEFAULT_CURSOR_LIMIT),
    };
    let page = state
        .app_bus
        .query(query, GetCollectionCursorPageHandler::new())
        .await?;

    Ok(Json(CursorPageResponse {
        companies: page.companies,
        next_cursor: page.next_cursor,
        has_more: page.has_more,
        total_count: page.total_count,
    })
    .into_response())
}

/// GET /collections/{collection_id}/companies/all-ids
pub async fn collection_company_ids(
    State(state): State<AppState>,
    WithRejection(Path(collection_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Response, ApiError> {
    let company_ids = state
        .app_bus
        .query(
            GetCollectionCompanyIds { collection_id },
            GetCollectionCompanyIdsHandler::new(),
        )
        .await?;

    Ok(Json(CompanyIdsResponse {
        total_count: company_ids.len(),
        company_ids,
    })
    .into_response())
}
