//! HTTP request handlers for chatrelay

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::middleware::request_id_middleware;
use crate::upstream::UpstreamClient;
use axum::{
    Router, middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
};
use secrecy::SecretString;
use std::any::Any;
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

pub mod chat;
pub mod health;
pub mod metrics;

/// Path the chat forwarder is mounted on
pub const CHAT_PATH: &str = "/api/chat";

/// Application state shared across all handlers
///
/// The bearer credential is resolved once, before the state is built, and
/// handed in here. Handlers never read the environment.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    api_key: Option<Arc<SecretString>>,
    upstream: Arc<UpstreamClient>,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Create a new AppState from configuration and an optional credential
    pub fn new(config: Arc<Config>, api_key: Option<SecretString>) -> AppResult<Self> {
        let upstream = UpstreamClient::new(
            config.upstream.clone(),
            config.speech.clone(),
            config.request_timeout(),
        )?;
        let metrics = Metrics::new()
            .map_err(|e| AppError::Internal(format!("Failed to register metrics: {}", e)))?;

        Ok(Self {
            config,
            api_key: api_key.map(Arc::new),
            upstream: Arc::new(upstream),
            metrics: Arc::new(metrics),
        })
    }

    /// Create AppState reading the credential from the environment variable
    /// named by `upstream.api_key_env`
    ///
    /// A missing or blank variable is not an error here: the server still
    /// starts and chat requests answer 500 until the operator sets it.
    pub fn from_env(config: Arc<Config>) -> AppResult<Self> {
        let api_key = std::env::var(&config.upstream.api_key_env)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(SecretString::new);

        if api_key.is_none() {
            tracing::warn!(
                env_var = %config.upstream.api_key_env,
                "Upstream credential not set; chat requests will fail until it is configured"
            );
        }

        Self::new(config, api_key)
    }

    /// Get reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Bearer credential, if one was configured
    pub fn api_key(&self) -> Option<&SecretString> {
        self.api_key.as_deref()
    }

    /// Get reference to the upstream client
    pub fn upstream(&self) -> &UpstreamClient {
        &self.upstream
    }

    /// Get the metrics collector
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

/// Build the application router with all routes and layers
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(CHAT_PATH, any(chat::handler))
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .with_state(state)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
}

/// Convert a handler panic into the standard JSON error body
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };

    tracing::error!(panic = %message, "Handler panicked");
    AppError::Internal(message).into_response()
}
