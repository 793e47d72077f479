use crate::classify::{classify_handler, ApiError};
use crate::middleware::{auth_middleware, AuthConfig};
use axum::{
    extract::State,
    middleware as axum_mw,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use binwise_agent::Resolver;
use binwise_memory::IndexSynchronizer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Listener settings for `binwise serve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Keys accepted on the classification and refresh routes. Empty = open.
    #[serde(default)]
    pub api_keys: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_keys: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Shared application state.
pub struct AppState {
    pub resolver: Arc<Resolver>,
    pub synchronizer: Arc<IndexSynchronizer>,
}

/// The HTTP front end for classification.
pub struct GatewayServer;

impl GatewayServer {
    /// Build the gateway without auth.
    pub fn build(resolver: Arc<Resolver>, synchronizer: Arc<IndexSynchronizer>) -> Router {
        Self::build_with_auth(resolver, synchronizer, AuthConfig::default())
    }

    /// Build the gateway; `/health` stays open when auth is enabled.
    pub fn build_with_auth(
        resolver: Arc<Resolver>,
        synchronizer: Arc<IndexSynchronizer>,
        auth_config: AuthConfig,
    ) -> Router {
        let state = Arc::new(AppState {
            resolver,
            synchronizer,
        });

        let api = Router::new()
            .route("/classify", post(classify_handler))
            .route("/index/refresh", post(refresh_handler));
        let api = if auth_config.is_enabled() {
            api.route_layer(axum_mw::from_fn_with_state(
                Arc::new(auth_config),
                auth_middleware,
            ))
        } else {
            api
        };

        Router::new()
            .route("/health", get(health_handler))
            .merge(api)
            .with_state(state)
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let indexed_items = state.synchronizer.shared().current().len();
    Json(serde_json::json!({
        "status": "ok",
        "service": "binwise",
        "indexed_items": indexed_items,
    }))
}

/// `POST /index/refresh`: rebuild from the graph and swap the new generation in.
async fn refresh_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let generation = state.synchronizer.refresh().await.map_err(|e| {
        warn!(error = %e, "Index refresh failed");
        ApiError::from(e)
    })?;
    info!(items = generation.len(), "Index refresh served");
    Ok(Json(serde_json::json!({
        "items": generation.len(),
        "built_at": generation.built_at().to_rfc3339(),
    })))
}
