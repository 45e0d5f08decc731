//! API Handlers
//!
//! HTTP request handlers for each endpoint. The handlers only translate
//! between HTTP and the store; all expiration policy lives in the store.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::CacheStore;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, GetResponse, HealthResponse, SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// The store is already safe for concurrent use, so no outer lock is needed.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Shared cache handle
    pub cache: CacheStore<String, String>,
    /// TTL applied when a SET request carries none
    pub default_ttl: Duration,
}

impl AppState {
    /// Creates a new AppState with the given cache store.
    pub fn new(cache: CacheStore<String, String>, default_ttl: Duration) -> Self {
        Self { cache, default_ttl }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Self {
        let cache = match config.max_entries {
            0 => CacheStore::new(),
            max => CacheStore::with_capacity_limit(max),
        };
        Self::new(cache, config.default_ttl())
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair with the request's TTL, or the default one.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidArgument(error_msg));
    }

    let key = req.key.clone();
    match req.ttl_ms {
        Some(ttl_ms) => state.cache.put_with_ttl_millis(req.key, req.value, ttl_ms)?,
        None => state.cache.put(req.key, req.value, state.default_ttl)?,
    }

    Ok(Json(SetResponse::new(key)))
}

/// Handler for GET /get/:key
///
/// Retrieves a live value; absent and expired keys are both 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let (value, remaining) = state
        .cache
        .get_with_ttl(key.as_str())
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    let ttl_ms = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX);
    Ok(Json(GetResponse::new(key, value, ttl_ms)))
}

/// Handler for DELETE /del/:key
///
/// Always succeeds; the body says whether anything was removed.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    let deleted = state.cache.delete(key.as_str());
    Json(DeleteResponse::new(key, deleted))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
