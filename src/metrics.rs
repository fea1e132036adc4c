//! Prometheus metrics collection for chatrelay
//!
//! Tracks:
//! - Requests by outcome
//! - Upstream call latency (chat and speech)
//! - Speech synthesis failures
//! - Conversations intensified by the stress policy
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// Outbound call kind for type-safe metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamCall {
    Chat,
    Speech,
}

impl UpstreamCall {
    /// Convert call kind to Prometheus label string
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamCall::Chat => "chat",
            UpstreamCall::Speech => "speech",
        }
    }
}

/// Metrics collector for chatrelay
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    requests_total: IntCounterVec,
    upstream_duration: HistogramVec,
    speech_failures: IntCounter,
    intensified: IntCounter,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all metrics with a new Prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: bounded by AppError::outcome() plus "ok"
        let requests_total = IntCounterVec::new(
            Opts::new(
                "chatrelay_requests_total",
                "Total number of chat requests by outcome",
            ),
            &["outcome"],
        )?;

        let upstream_duration = HistogramVec::new(
            HistogramOpts::new(
                "chatrelay_upstream_duration_seconds",
                "Latency of outbound calls in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["call"],
        )?;

        let speech_failures = IntCounter::with_opts(Opts::new(
            "chatrelay_speech_failures_total",
            "Speech synthesis calls that failed (reply still returned)",
        ))?;

        let intensified = IntCounter::with_opts(Opts::new(
            "chatrelay_intensified_total",
            "Conversations whose trailing system message was intensified",
        ))?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(upstream_duration.clone()))?;
        registry.register(Box::new(speech_failures.clone()))?;
        registry.register(Box::new(intensified.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            upstream_duration,
            speech_failures,
            intensified,
        })
    }

    /// Record a finished request
    pub fn record_request(&self, outcome: &str) {
        self.requests_total.with_label_values(&[outcome]).inc();
    }

    /// Record latency of one outbound call
    pub fn record_upstream(&self, call: UpstreamCall, elapsed: Duration) {
        self.upstream_duration
            .with_label_values(&[call.as_str()])
            .observe(elapsed.as_secs_f64());
    }

    pub fn speech_failure(&self) {
        self.speech_failures.inc();
    }

    pub fn intensified(&self) {
        self.intensified.inc();
    }

    /// Current request count for an outcome label
    pub fn requests_count(&self, outcome: &str) -> u64 {
        self.requests_total.with_label_values(&[outcome]).get()
    }

    pub fn speech_failures_count(&self) -> u64 {
        self.speech_failures.get()
    }

    pub fn intensified_count(&self) -> u64 {
        self.intensified.get()
    }

    /// Encode all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
