//! Inbound conversation payload
//!
//! Parses the client body into a [`ConversationRequest`] and applies the
//! stress-driven intensification policy before the messages are forwarded.

use crate::config::PolicyConfig;
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Message rejected when `messages` is missing or not a list
pub const INVALID_MESSAGES: &str = "Invalid payload: messages must be an array.";

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Developer,
    User,
    Assistant,
}

/// A single conversation entry, forwarded verbatim to the upstream API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Client request body
///
/// Only `messages` is strict. A stress level that is not numeric disables the
/// policy and a `wantTTS` that is not a boolean counts as `false`; neither
/// rejects the request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default, deserialize_with = "lenient_stress_level")]
    pub stress_level: Option<f64>,
    #[serde(default, rename = "wantTTS", deserialize_with = "lenient_flag")]
    pub want_tts: bool,
}

/// Numbers and numeric strings (slider values often arrive as `"90"`)
fn lenient_stress_level<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let level = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(level.filter(|l| l.is_finite()))
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_bool().unwrap_or(false))
}

impl ConversationRequest {
    /// Parse a raw request body
    ///
    /// Accepts a JSON object, or a JSON string whose contents are the
    /// JSON-encoded object. The `messages` field is checked separately so a
    /// missing or non-list value always yields the same client-facing message.
    pub fn from_body(body: &[u8]) -> AppResult<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| AppError::validation_with_details("Invalid JSON body", e.to_string()))?;

        let value = match value {
            Value::String(encoded) => serde_json::from_str(&encoded).map_err(|e| {
                AppError::validation_with_details("Invalid JSON body", e.to_string())
            })?,
            other => other,
        };

        if !value.is_object() {
            return Err(AppError::validation_with_details(
                "Invalid payload: expected a JSON object",
                format!("got {}", json_kind(&value)),
            ));
        }

        if !value.get("messages").is_some_and(|m| m.is_array()) {
            return Err(AppError::validation(INVALID_MESSAGES));
        }

        serde_json::from_value(value)
            .map_err(|e| AppError::validation_with_details("Invalid payload", e.to_string()))
    }

    /// Append the intensification suffix to a trailing system message
    ///
    /// Applies only when the stress level is strictly above the threshold, the
    /// conversation is non-empty and the last message is a system message.
    /// Returns whether the conversation was changed.
    pub fn intensify(&mut self, policy: &PolicyConfig) -> bool {
        let Some(stress) = self.stress_level else {
            return false;
        };
        if stress <= policy.stress_threshold {
            return false;
        }

        match self.messages.last_mut() {
            Some(last) if last.role == Role::System => {
                last.content.push_str(&policy.intensify_suffix);
                true
            }
            _ => false,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn request(stress_level: Option<f64>, messages: Vec<ChatMessage>) -> ConversationRequest {
        ConversationRequest {
            messages,
            stress_level,
            want_tts: false,
        }
    }

    fn expect_validation(result: AppResult<ConversationRequest>) -> String {
        match result {
            Err(AppError::Validation { message, .. }) => message,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_parses_object_body() {
        let body = br#"{"messages":[{"role":"user","content":"hi"}],"stressLevel":42,"wantTTS":true}"#;
        let parsed = ConversationRequest::from_body(body).expect("should parse");
        assert_eq!(parsed.messages, vec![ChatMessage::new(Role::User, "hi")]);
        assert_eq!(parsed.stress_level, Some(42.0));
        assert!(parsed.want_tts);
    }

    #[test]
    fn test_parses_string_encoded_body() {
        let body = br#""{\"messages\":[{\"role\":\"system\",\"content\":\"Begin.\"}]}""#;
        let parsed = ConversationRequest::from_body(body).expect("should parse");
        assert_eq!(parsed.messages.len(), 1);
        assert_eq!(parsed.messages[0].role, Role::System);
        assert!(!parsed.want_tts);
        assert_eq!(parsed.stress_level, None);
    }

    #[test]
    fn test_accepts_empty_message_list() {
        let parsed = ConversationRequest::from_body(br#"{"messages":[]}"#).expect("should parse");
        assert!(parsed.messages.is_empty());
    }

    #[test]
    fn test_rejects_missing_messages() {
        let message = expect_validation(ConversationRequest::from_body(br#"{"stressLevel":90}"#));
        assert_eq!(message, INVALID_MESSAGES);
    }

    #[test]
    fn test_rejects_non_list_messages() {
        for body in [
            br#"{"messages":"hello"}"#.as_slice(),
            br#"{"messages":{"role":"user"}}"#.as_slice(),
            br#"{"messages":null}"#.as_slice(),
            br#"{"messages":3}"#.as_slice(),
        ] {
            let message = expect_validation(ConversationRequest::from_body(body));
            assert_eq!(message, INVALID_MESSAGES);
        }
    }

    #[test]
    fn test_rejects_invalid_json() {
        let message = expect_validation(ConversationRequest::from_body(b"{not json"));
        assert_eq!(message, "Invalid JSON body");
    }

    #[test]
    fn test_rejects_non_object_payload() {
        let message = expect_validation(ConversationRequest::from_body(b"[1,2,3]"));
        assert!(message.contains("JSON object"));
    }

    #[test]
    fn test_rejects_unknown_role() {
        let body = br#"{"messages":[{"role":"narrator","content":"x"}]}"#;
        let message = expect_validation(ConversationRequest::from_body(body));
        assert_eq!(message, "Invalid payload");
    }

    #[test]
    fn test_non_numeric_stress_level_is_ignored() {
        for stress in [r#""high""#, "true", "[90]", r#"{"level":90}"#, r#""NaN""#] {
            let body = format!(
                r#"{{"messages":[{{"role":"system","content":"Begin."}}],"stressLevel":{stress}}}"#
            );
            let parsed = ConversationRequest::from_body(body.as_bytes())
                .unwrap_or_else(|e| panic!("stressLevel {stress} should not reject: {e:?}"));
            assert_eq!(parsed.stress_level, None, "stressLevel {stress}");
        }
    }

    #[test]
    fn test_numeric_string_stress_level_is_read() {
        let body = br#"{"messages":[],"stressLevel":" 90 "}"#;
        let parsed = ConversationRequest::from_body(body).expect("should parse");
        assert_eq!(parsed.stress_level, Some(90.0));
    }

    #[test]
    fn test_non_boolean_want_tts_counts_as_false() {
        for flag in [r#""yes""#, r#""true""#, "1", "null"] {
            let body = format!(r#"{{"messages":[],"wantTTS":{flag}}}"#);
            let parsed = ConversationRequest::from_body(body.as_bytes())
                .unwrap_or_else(|e| panic!("wantTTS {flag} should not reject: {e:?}"));
            assert!(!parsed.want_tts, "wantTTS {flag}");
        }
    }

    #[test]
    fn test_intensifies_trailing_system_message() {
        let policy = PolicyConfig::default();
        let mut req = request(Some(85.0), vec![ChatMessage::new(Role::System, "Begin.")]);

        assert!(req.intensify(&policy));
        assert_eq!(
            req.messages[0].content,
            "Begin. The candidate is panicking. Press them harder."
        );
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let policy = PolicyConfig::default();
        let mut req = request(Some(80.0), vec![ChatMessage::new(Role::System, "Begin.")]);
        assert!(!req.intensify(&policy));
        assert_eq!(req.messages[0].content, "Begin.");
    }

    #[test]
    fn test_skips_when_last_message_is_not_system() {
        let policy = PolicyConfig::default();
        let mut req = request(
            Some(99.0),
            vec![
                ChatMessage::new(Role::System, "Begin."),
                ChatMessage::new(Role::User, "Hello"),
            ],
        );
        assert!(!req.intensify(&policy));
        assert_eq!(req.messages[0].content, "Begin.");
        assert_eq!(req.messages[1].content, "Hello");
    }

    #[test]
    fn test_skips_empty_conversation_and_missing_stress() {
        let policy = PolicyConfig::default();
        assert!(!request(Some(99.0), vec![]).intensify(&policy));

        let mut req = request(None, vec![ChatMessage::new(Role::System, "Begin.")]);
        assert!(!req.intensify(&policy));
        assert_eq!(req.messages[0].content, "Begin.");
    }

    proptest! {
        #[test]
        fn prop_at_or_below_threshold_never_mutates(stress in -1000.0f64..=80.0) {
            let policy = PolicyConfig::default();
            let mut req = request(Some(stress), vec![ChatMessage::new(Role::System, "Begin.")]);
            prop_assert!(!req.intensify(&policy));
            prop_assert_eq!(req.messages[0].content.as_str(), "Begin.");
        }

        #[test]
        fn prop_above_threshold_appends_once(stress in 80.001f64..1000.0) {
            let policy = PolicyConfig::default();
            let mut req = request(Some(stress), vec![ChatMessage::new(Role::System, "Begin.")]);
            prop_assert!(req.intensify(&policy));
            prop_assert_eq!(
                req.messages[0].content.matches(policy.intensify_suffix.as_str()).count(),
                1
            );
        }
    }
}
