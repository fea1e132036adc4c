//! Chat forwarding handler
//!
//! Handles `POST /api/chat`: validates the conversation, applies the stress
//! policy, forwards it to the completion service and reshapes the answer into
//! `{"choices": [{"message": {"content": ...}}]}`. An optional second stage
//! synthesizes speech for the reply; its failure only degrades the reply.
//!
//! Every failure is turned into a JSON error response at this boundary.

use crate::conversation::ConversationRequest;
use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::metrics::UpstreamCall;
use crate::middleware::RequestId;
use crate::upstream::SpeechOutcome;
use crate::upstream::speech::speech_input;
use axum::{
    Extension, Json,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use secrecy::SecretString;
use serde::Serialize;
use std::time::Instant;

/// Normalized reply returned to the client
#[derive(Debug, Clone, Serialize)]
pub struct ForwardedReply {
    pub choices: Vec<ReplyChoice>,
    /// `Some(None)` serializes as `null` after a failed synthesis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_error: Option<String>,
    #[serde(rename = "_raw", skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyChoice {
    pub message: ReplyMessage,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyMessage {
    pub content: String,
}

impl ForwardedReply {
    pub fn new(content: String, raw: Option<serde_json::Value>) -> Self {
        Self {
            choices: vec![ReplyChoice {
                message: ReplyMessage { content },
            }],
            audio: None,
            audio_error: None,
            raw,
        }
    }

    /// Reply text
    pub fn content(&self) -> &str {
        &self.choices[0].message.content
    }

    /// Attach the result of the speech stage
    pub fn with_speech(mut self, outcome: SpeechOutcome) -> Self {
        match outcome {
            SpeechOutcome::Skipped => {}
            SpeechOutcome::Audio(audio) => self.audio = Some(Some(audio)),
            SpeechOutcome::Failed(marker) => {
                self.audio = Some(None);
                self.audio_error = Some(marker);
            }
        }
        self
    }
}

/// Successful handler result
#[derive(Debug)]
enum Forwarded {
    Preflight,
    Reply(ForwardedReply),
}

/// Chat handler
///
/// Accepts any method so that OPTIONS and 405 answers come from the same
/// place as the forwarding logic.
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    method: Method,
    body: Bytes,
) -> Response {
    match forward(&state, request_id, &method, &body).await {
        Ok(Forwarded::Preflight) => {
            tracing::debug!(request_id = %request_id, "Answered preflight request");
            StatusCode::OK.into_response()
        }
        Ok(Forwarded::Reply(reply)) => {
            state.metrics().record_request("ok");
            tracing::info!(
                request_id = %request_id,
                response_length = reply.content().len(),
                audio = reply.audio.is_some(),
                "Chat request forwarded"
            );
            (StatusCode::OK, Json(reply)).into_response()
        }
        Err(err) => {
            state.metrics().record_request(err.outcome());
            let status = err.status();
            if status.is_server_error() {
                tracing::error!(
                    request_id = %request_id,
                    status = %status,
                    error = %err,
                    "Chat request failed"
                );
            } else {
                tracing::warn!(
                    request_id = %request_id,
                    status = %status,
                    error = %err,
                    "Chat request rejected"
                );
            }
            err.into_response()
        }
    }
}

async fn forward(
    state: &AppState,
    request_id: RequestId,
    method: &Method,
    body: &[u8],
) -> AppResult<Forwarded> {
    if *method == Method::OPTIONS {
        return Ok(Forwarded::Preflight);
    }
    if *method != Method::POST {
        return Err(AppError::MethodNotAllowed);
    }

    let mut request = ConversationRequest::from_body(body)?;

    let config = state.config();
    let api_key = state
        .api_key()
        .ok_or_else(|| AppError::MissingCredential {
            env_var: config.upstream.api_key_env.clone(),
        })?;

    tracing::debug!(
        request_id = %request_id,
        messages_count = request.messages.len(),
        stress_level = ?request.stress_level,
        want_tts = request.want_tts,
        "Received chat request"
    );

    if request.intensify(&config.policy) {
        state.metrics().intensified();
        tracing::info!(
            request_id = %request_id,
            stress_level = ?request.stress_level,
            "Intensified trailing system message"
        );
    }

    let started = Instant::now();
    let completion = state.upstream().complete(api_key, &request.messages).await;
    state
        .metrics()
        .record_upstream(UpstreamCall::Chat, started.elapsed());
    let completion = completion?;

    let text = completion.reply.text();
    let speech = if request.want_tts && config.speech.enabled {
        speak(state, request_id, api_key, &text).await
    } else {
        SpeechOutcome::Skipped
    };

    let raw = config.upstream.include_raw.then_some(completion.raw);
    Ok(Forwarded::Reply(
        ForwardedReply::new(text, raw).with_speech(speech),
    ))
}

/// Second stage: never fails, only reports
async fn speak(
    state: &AppState,
    request_id: RequestId,
    api_key: &SecretString,
    text: &str,
) -> SpeechOutcome {
    let Some(input) = speech_input(text, state.config().speech.max_chars) else {
        return SpeechOutcome::Skipped;
    };

    let started = Instant::now();
    let result = state.upstream().synthesize(api_key, &input).await;
    state
        .metrics()
        .record_upstream(UpstreamCall::Speech, started.elapsed());

    let outcome = SpeechOutcome::from_result(result);
    if let SpeechOutcome::Failed(marker) = &outcome {
        state.metrics().speech_failure();
        tracing::warn!(
            request_id = %request_id,
            audio_error = %marker,
            "Speech synthesis failed; returning text only"
        );
    }
    outcome
}
