use thiserror::Error;

use crate::validation::ValidationErrors;

/// Errors surfaced by repository implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Errors returned by the account and domain services.
///
/// The HTTP layer maps these onto 400, 404 and 500 respectively, so new
/// variants must not be added without updating that mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("record not found")]
    NotFound,
    #[error("storage failure: {0}")]
    Storage(String),
}

impl ServiceError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound => "not_found",
            Self::Storage(_) => "storage",
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Storage(message) => Self::Storage(message),
        }
    }
}
