//! Outbound calls to the hosted model API
//!
//! One shared `reqwest::Client` per process. Each call is attempted exactly
//! once and bounded by the configured timeout.

use crate::config::{SpeechConfig, UpstreamApi, UpstreamConfig};
use crate::conversation::ChatMessage;
use crate::error::{AppError, AppResult};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::time::Duration;

pub mod reply;
pub mod speech;

pub use reply::UpstreamReply;
pub use speech::SpeechOutcome;

/// Decoded completion: resolved reply plus the untouched payload
#[derive(Debug, Clone)]
pub struct Completion {
    pub reply: UpstreamReply,
    pub raw: serde_json::Value,
}

/// HTTP client for the completion and speech endpoints
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    upstream: UpstreamConfig,
    speech: SpeechConfig,
    timeout: Duration,
}

impl UpstreamClient {
    /// Build a client with a bounded per-request timeout
    pub fn new(
        upstream: UpstreamConfig,
        speech: SpeechConfig,
        timeout: Duration,
    ) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            upstream,
            speech,
            timeout,
        })
    }

    /// Request payload for the configured API style
    pub fn completion_payload(&self, messages: &[ChatMessage]) -> serde_json::Value {
        match self.upstream.api {
            UpstreamApi::Responses => json!({
                "model": self.upstream.model,
                "input": messages,
                "temperature": self.upstream.temperature,
                "max_output_tokens": self.upstream.max_output_tokens,
            }),
            UpstreamApi::ChatCompletions => json!({
                "model": self.upstream.model,
                "messages": messages,
                "temperature": self.upstream.temperature,
                "max_tokens": self.upstream.max_output_tokens,
            }),
        }
    }

    /// Send the conversation to the completion endpoint
    ///
    /// A non-success status becomes [`AppError::Upstream`] carrying the
    /// upstream status and body unchanged.
    pub async fn complete(
        &self,
        api_key: &SecretString,
        messages: &[ChatMessage],
    ) -> AppResult<Completion> {
        let url = self.upstream.completion_url();
        let payload = self.completion_payload(messages);

        tracing::debug!(
            url = %url,
            model = %self.upstream.model,
            messages_count = messages.len(),
            "Sending completion request"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(&url, response).await;
            tracing::warn!(
                url = %url,
                status = %status,
                body_len = body.len(),
                "Completion request rejected by upstream"
            );
            return Err(AppError::Upstream { status, body });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(&url, e))?;
        let raw: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::Internal(format!("Upstream returned malformed JSON: {}", e))
        })?;

        Ok(Completion {
            reply: UpstreamReply::from_value(&raw),
            raw,
        })
    }

    /// Synthesize speech for `input`, returning the raw audio bytes
    pub async fn synthesize(&self, api_key: &SecretString, input: &str) -> AppResult<Vec<u8>> {
        let url = self.upstream.speech_url();
        let payload = json!({
            "model": self.speech.model,
            "input": input,
            "voice": self.speech.voice,
            "response_format": self.speech.format,
        });

        tracing::debug!(
            url = %url,
            voice = %self.speech.voice,
            input_chars = input.chars().count(),
            "Sending speech request"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(&url, response).await;
            return Err(AppError::Upstream { status, body });
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(&url, e))?;
        Ok(audio.to_vec())
    }

    fn transport_error(&self, url: &str, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            AppError::UpstreamTimeout {
                endpoint: url.to_string(),
                timeout_seconds: self.timeout.as_secs(),
            }
        } else {
            AppError::UpstreamRequest(err.to_string())
        }
    }
}

/// Body of a rejected call, or a marker when it cannot be read
async fn error_body(url: &str, response: reqwest::Response) -> String {
    match response.text().await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Failed to read upstream error body");
            format!("<unreadable body: {}>", e)
        }
    }
}
