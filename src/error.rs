//! Error types for the cache
//!
//! Misses, overwrites and deletes of absent keys are ordinary outcomes and are
//! never represented here. Only caller mistakes and environment failures are.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache and its HTTP front-end.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Negative TTL, zero reaper interval, oversized key and the like
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The store refused a new key because its entry limit is reached
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// Every handle to the store was dropped while a reaper was still attached
    #[error("Store unavailable")]
    StoreUnavailable,

    /// The reaper was asked to reschedule after it had already stopped
    #[error("Reaper is not running")]
    ReaperStopped,

    /// A reaper was started outside of a tokio runtime
    #[error("No tokio runtime available to run the reaper")]
    NoRuntime,

    /// Key absent or expired (HTTP surface only)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Internal failure, such as a panicked reaper task
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::CapacityExceeded(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::StoreUnavailable
            | CacheError::ReaperStopped
            | CacheError::NoRuntime
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
