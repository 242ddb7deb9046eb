use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use roster_types::errors::ApplicationError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error side of every JSON handler.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ApplicationError> for ApiError {
    fn from(err: ApplicationError) -> Self {
        match &err {
            ApplicationError::App(_) => ApiError::new(StatusCode::BAD_REQUEST, err.to_string()),
            e if e.is_not_found() => ApiError::new(StatusCode::NOT_FOUND, err.to_string()),
            _ => {
                tracing::error!("Request failed: {}", err);
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use roster_types::errors::{AppError, DbError};

    use super::*;

    #[test]
    fn test_status_mapping() {
        let validation: ApiError = ApplicationError::from(AppError::SameSourceAndTarget).into();
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);

        let missing: ApiError = ApplicationError::from(DbError::JobNotFound(Uuid::new_v4())).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let broken: ApiError = ApplicationError::Infrastructure("disk on fire".into()).into();
        assert_eq!(broken.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(broken.message, "Internal server error.");
    }
}
