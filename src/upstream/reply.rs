//! Upstream reply shapes
//!
//! The completion service answers in one of several shapes depending on the
//! API style. [`UpstreamReply`] resolves the shape once so the handler never
//! pokes at raw JSON.

use serde::Deserialize;

/// Resolved upstream reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamReply {
    /// Responses API convenience field: `{"output_text": "..."}`
    FlatText(String),
    /// Responses API item list: `{"output": [{"content": [{"text": ".."}, ..]}]}`
    Fragments(Vec<String>),
    /// Chat Completions API: `{"choices": [{"message": {"content": ".."}}]}`
    Choices(String),
    /// None of the known shapes
    Empty,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireReply {
    Flat { output_text: String },
    Fragments { output: Vec<WireOutputItem> },
    Choices { choices: Vec<WireChoice> },
    Other(serde::de::IgnoredAny),
}

#[derive(Deserialize)]
struct WireOutputItem {
    #[serde(default)]
    content: Option<Vec<WireFragment>>,
}

#[derive(Deserialize)]
struct WireFragment {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct WireChoice {
    #[serde(default)]
    message: Option<WireMessage>,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
}

impl UpstreamReply {
    /// Classify a decoded upstream payload
    ///
    /// The flat field wins over the fragment list. Only the first output item
    /// is read; fragments without text contribute nothing.
    pub fn from_value(value: &serde_json::Value) -> Self {
        if !value.is_object() {
            return Self::Empty;
        }

        match WireReply::deserialize(value) {
            Ok(WireReply::Flat { output_text }) => Self::FlatText(output_text),
            Ok(WireReply::Fragments { output }) => {
                let fragments = output
                    .into_iter()
                    .next()
                    .and_then(|item| item.content)
                    .map(|content| content.into_iter().filter_map(|f| f.text).collect());
                match fragments {
                    Some(fragments) => Self::Fragments(fragments),
                    None => Self::Empty,
                }
            }
            Ok(WireReply::Choices { choices }) => {
                match choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.message)
                    .and_then(|message| message.content)
                {
                    Some(content) => Self::Choices(content),
                    None => Self::Empty,
                }
            }
            Ok(WireReply::Other(_)) | Err(_) => Self::Empty,
        }
    }

    /// Generated text, or an empty string when nothing was produced
    pub fn text(&self) -> String {
        match self {
            Self::FlatText(text) | Self::Choices(text) => text.clone(),
            Self::Fragments(fragments) => fragments.concat(),
            Self::Empty => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_output_text() {
        let reply = UpstreamReply::from_value(&json!({ "output_text": "Hello" }));
        assert_eq!(reply, UpstreamReply::FlatText("Hello".to_string()));
        assert_eq!(reply.text(), "Hello");
    }

    #[test]
    fn test_fragments_are_concatenated_in_order() {
        let reply = UpstreamReply::from_value(&json!({
            "output": [{ "content": [{ "text": "He" }, { "text": "llo" }] }]
        }));
        assert_eq!(
            reply,
            UpstreamReply::Fragments(vec!["He".to_string(), "llo".to_string()])
        );
        assert_eq!(reply.text(), "Hello");
    }

    #[test]
    fn test_flat_field_wins_over_fragments() {
        let reply = UpstreamReply::from_value(&json!({
            "output_text": "flat",
            "output": [{ "content": [{ "text": "nested" }] }]
        }));
        assert_eq!(reply.text(), "flat");
    }

    #[test]
    fn test_null_flat_field_falls_back_to_fragments() {
        let reply = UpstreamReply::from_value(&json!({
            "output_text": null,
            "output": [{ "content": [{ "text": "nested" }] }]
        }));
        assert_eq!(reply.text(), "nested");
    }

    #[test]
    fn test_fragments_without_text_are_skipped() {
        let reply = UpstreamReply::from_value(&json!({
            "output": [{ "content": [{ "type": "refusal" }, { "text": "ok" }] }]
        }));
        assert_eq!(reply.text(), "ok");
    }

    #[test]
    fn test_only_first_output_item_is_read() {
        let reply = UpstreamReply::from_value(&json!({
            "output": [
                { "content": [{ "text": "first" }] },
                { "content": [{ "text": "second" }] }
            ]
        }));
        assert_eq!(reply.text(), "first");
    }

    #[test]
    fn test_chat_completions_choice() {
        let reply = UpstreamReply::from_value(&json!({
            "choices": [{ "message": { "role": "assistant", "content": "Hi there" } }]
        }));
        assert_eq!(reply, UpstreamReply::Choices("Hi there".to_string()));
    }

    #[test]
    fn test_unknown_shapes_default_to_empty() {
        for value in [
            json!({}),
            json!({ "output": [] }),
            json!({ "output": [{ "type": "reasoning" }] }),
            json!({ "choices": [] }),
            json!({ "id": "resp_1" }),
            json!([1, 2, 3]),
            json!("text"),
        ] {
            assert_eq!(UpstreamReply::from_value(&value).text(), "", "{}", value);
        }
    }
}
