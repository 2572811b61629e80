// HTTP surface.
// Builds the router and wires config into the cache, store, and GitHub client.

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::{Router, http::HeaderValue, routing::get};
use tower_http::trace::TraceLayer;

use crate::cache::{CacheStore, FileStore, MemoryStore, SwrCache, TokioTasks, TtlPolicy};
use crate::config::{Config, StoreConfig};
use crate::error::{Error, Result};
use crate::github::GitHubClient;
use crate::service::ContentService;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ContentService>,
    pub cache_control: HeaderValue,
}

impl AppState {
    pub fn new(service: ContentService) -> Result<Self> {
        let cache_control = cache_control(service.cache().ttl())?;
        Ok(Self {
            service: Arc::new(service),
            cache_control,
        })
    }
}

/// `Cache-Control` value sent with every successful response.
fn cache_control(ttl: &TtlPolicy) -> Result<HeaderValue> {
    let value = format!("public, max-age={}, immutable", ttl.revalidate().as_secs());
    HeaderValue::from_str(&value)
        .map_err(|e| Error::Config(format!("invalid cache-control {}: {}", value, e)))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/:user/:repo/:reference", get(routes::listing))
        .route("/:user/:repo/:reference/*path", get(routes::document))
        .fallback(routes::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Assemble the production router.
///
/// The returned task tracker owns background revalidations and should be
/// drained before the process exits.
pub fn build(config: &Config) -> Result<(Router, TokioTasks)> {
    let store: Arc<dyn CacheStore> = match &config.store {
        StoreConfig::Memory => Arc::new(MemoryStore::new()),
        StoreConfig::Dir(dir) => {
            tracing::info!(dir = %dir.display(), "using file cache store");
            Arc::new(FileStore::new(dir.clone()))
        }
    };

    let tasks = TokioTasks::new();
    let cache = SwrCache::new(store, Arc::new(tasks.clone()), config.ttl)
        .with_coalescing(config.coalesce)
        .with_sweep_interval(config.sweep_interval);
    let client = GitHubClient::from_config(config)?;
    let state = AppState::new(ContentService::new(cache, Arc::new(client)))?;

    Ok((router(state), tasks))
}
