use thiserror::Error;

/// Validation errors, raised synchronously before anything is persisted.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Source and target collection must differ")]
    SameSourceAndTarget,

    #[error("Collection '{0}' is protected")]
    ProtectedCollection(String),

    #[error("Collection name can't be blank")]
    BlankCollectionName,

    #[error("Collection name '{0}' already exists")]
    CollectionNameTaken(String),

    #[error("Page limit must be between 1 and {max}, got {limit}")]
    InvalidPageLimit { limit: u32, max: u32 },

    #[error("Invalid cursor format: '{0}'")]
    InvalidCursor(String),
}
