use thiserror::Error;

/// Failures surfaced by the catalog service and the controllers. None of them
/// are fatal; callers show the message and keep going with the prior state.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Input that the controllers refuse before anything reaches the store.
    #[error("{0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    /// The store rejected a write (length, required field or foreign key).
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("the dialog is already closed")]
    DialogClosed,
    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
}

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

impl CatalogError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        CatalogError::Validation(message.into())
    }

    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        CatalogError::NotFound { entity, id }
    }
}

/// Turn SQLite constraint failures into `ConstraintViolation`, keeping every
/// other error as a storage failure.
pub(crate) fn map_write_error(err: rusqlite::Error) -> CatalogError {
    match err {
        rusqlite::Error::SqliteFailure(code, message)
            if code.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            CatalogError::ConstraintViolation(
                message.unwrap_or_else(|| "constraint failed".to_string()),
            )
        }
        other => CatalogError::Storage(other),
    }
}
