//! Speech synthesis stage
//!
//! Runs after the chat reply is known. Its failure never fails the request:
//! the outcome is folded into the reply as `audio: null` plus a marker.

use crate::error::AppError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Result of the optional speech stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// Not requested, disabled, or nothing to say
    Skipped,
    /// Base64-encoded audio bytes
    Audio(String),
    /// Synthesis failed; carries the marker returned to the client
    Failed(String),
}

impl SpeechOutcome {
    /// Fold the synthesis call result into an outcome
    pub fn from_result(result: Result<Vec<u8>, AppError>) -> Self {
        match result {
            Ok(bytes) => Self::Audio(STANDARD.encode(bytes)),
            Err(err) => Self::Failed(failure_marker(&err)),
        }
    }
}

/// Client-facing description of a speech failure
pub fn failure_marker(err: &AppError) -> String {
    match err {
        AppError::Upstream { status, .. } => {
            format!("TTS failed with status {}", status.as_u16())
        }
        other => format!("TTS failed: {}", other),
    }
}

/// Text sent for synthesis
///
/// Trims surrounding whitespace and keeps at most `max_chars` characters.
/// Returns `None` when nothing speakable remains.
pub fn speech_input(text: &str, max_chars: usize) -> Option<String> {
    let truncated: String = text.trim().chars().take(max_chars).collect();
    let truncated = truncated.trim_end();
    if truncated.is_empty() {
        None
    } else {
        Some(truncated.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_speech_input_trims_and_truncates() {
        assert_eq!(speech_input("  hello  ", 800).as_deref(), Some("hello"));

        let long = "a".repeat(1000);
        let input = speech_input(&long, 800).expect("should produce input");
        assert_eq!(input.chars().count(), 800);
    }

    #[test]
    fn test_speech_input_counts_characters_not_bytes() {
        let text = "é".repeat(900);
        let input = speech_input(&text, 800).expect("should produce input");
        assert_eq!(input.chars().count(), 800);
    }

    #[test]
    fn test_speech_input_trims_cut_boundary() {
        let text = format!("{} tail", "a".repeat(5));
        assert_eq!(speech_input(&text, 6).as_deref(), Some("aaaaa"));
    }

    #[test]
    fn test_speech_input_rejects_blank_text() {
        assert_eq!(speech_input("", 800), None);
        assert_eq!(speech_input("   \n\t", 800), None);
    }

    #[test]
    fn test_audio_outcome_is_base64() {
        let outcome = SpeechOutcome::from_result(Ok(b"ID3".to_vec()));
        assert_eq!(outcome, SpeechOutcome::Audio("SUQz".to_string()));
    }

    #[test]
    fn test_failed_outcome_carries_status() {
        let outcome = SpeechOutcome::from_result(Err(AppError::Upstream {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".to_string(),
        }));
        match outcome {
            SpeechOutcome::Failed(marker) => assert!(marker.contains("500"), "{}", marker),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_transport_failure_marker() {
        let marker = failure_marker(&AppError::UpstreamRequest("connection refused".to_string()));
        assert!(marker.contains("connection refused"));
    }
}
