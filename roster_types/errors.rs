use thiserror::Error;

pub mod app_error;
pub mod db_error;

pub use app_error::AppError;
pub use db_error::DbError;

pub type Result<T, E = ApplicationError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),

    #[error("An unknown error occurred: {0}")]
    Unknown(String),
}

impl ApplicationError {
    /// True for lookups of records that don't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ApplicationError::Db(DbError::CollectionNotFound(_) | DbError::JobNotFound(_))
        )
    }
}

impl From<anyhow::Error> for ApplicationError {
    fn from(err: anyhow::Error) -> Self {
        ApplicationError::Unknown(err.to_string())
    }
}
