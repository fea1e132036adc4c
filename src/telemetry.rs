//! Structured logging setup

use crate::config::ObservabilityConfig;
use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Install the global `tracing` subscriber
///
/// `RUST_LOG` wins when set; otherwise the crate logs at
/// `observability.log_level` and `tower_http` at debug. Only the first call
/// per process has any effect.
pub fn init(config: &ObservabilityConfig) {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(filter(config))
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}

fn filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback_directives(config)))
}

fn fallback_directives(config: &ObservabilityConfig) -> String {
    format!("chatrelay={},tower_http=debug", config.log_level)
}
