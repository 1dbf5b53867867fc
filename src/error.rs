//! Service-level error taxonomy
//!
//! Storage keeps its own two-variant error (`StorageError`); everything the
//! HTTP surface can observe is funneled through `ServiceError` so handlers
//! can map variants to status codes in one place.

use axum::http::StatusCode;
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed URL or alias - user-correctable, surfaced immediately
    #[error("{0}")]
    Validation(String),

    /// Requested custom alias is already taken
    #[error("custom alias already exists")]
    AliasConflict,

    /// Random code generation kept colliding past the attempt bound
    #[error("failed to allocate a unique short code")]
    AllocationExhausted,

    /// Unknown short code
    #[error("short URL not found")]
    NotFound,

    /// Cache / store / queue transient failure
    #[error("dependency unavailable: {0}")]
    Dependency(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::AliasConflict => StatusCode::CONFLICT,
            ServiceError::AllocationExhausted => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Dependency(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict => ServiceError::AliasConflict,
            StorageError::Other(e) => ServiceError::Dependency(e.to_string()),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
