use axum::{
    Router,
    routing::{get, post},
};
use std::{io::Error, net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use roster_app::{app_bus::AppBus, jobs::supervisor::JobSupervisor};
use roster_types::{Result, errors::ApplicationError};

use crate::handlers::{
    add_companies, cancel_job, collection_company_ids, collection_cursor_page,
    collection_page, create_collection, delete_collection, delete_companies, job_status,
    list_collections,
};

#[derive(Clone)]
pub struct AppState {
    pub app_bus: Arc<AppBus>,
    pub supervisor: Arc<JobSupervisor>,
}

impl AppState {
    pub fn new(app_bus: Arc<AppBus>, supervisor: Arc<JobSupervisor>) -> AppState {
        AppState {
            app_bus,
            supervisor,
        }
    }
}

pub struct WebRouter {}

impl WebRouter {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/collections", get(list_collections).post(create_collection))
            .route(
                "/collections/{collection_id}",
                get(collection_page).delete(delete_collection),
            )
            .route(
                "/collections/{collection_id}/companies/cursor",
                get(collection_cursor_page),
            )
            .route(
                "/collections/{collection_id}/companies/all-ids",
                get(collection_company_ids),
            )
            .route("/batch/add-companies", post(add_companies))
            .route("/batch/delete-companies", post(delete_companies))
            .route("/batch/jobs/{job_id}/status", get(job_status))
            .route("/batch/jobs/{job_id}/cancel", post(cancel_job))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    pub async fn serve(state: AppState, port: u16) -> Result<(), ApplicationError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await.map_err(infra_error)?;

        tracing::info!("HTTP Server started, listening on http://{}", addr);
        Self::serve_on(listener, state).await
    }

    /// Serves on an already bound listener.
    pub async fn serve_on(listener: TcpListener, state: AppState) -> Result<(), ApplicationError> {
        axum::serve(listener, Self::router(state))
            .await
            .map_err(infra_error)?;

        Ok(())
    }
}

fn infra_error(e: Error) -> ApplicationError {
    let err = format!("{:#?}", e);
    ApplicationError::Infrastructure(err)
}
