use serde::Deserialize;
use serde_json::Value;

use crate::api::models::TextMessage;
use crate::error::Result;

/// Inbound chat socket envelope, discriminated by its `type` field.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    TextMessage(TextMessage),
    /// The server rejected one of our frames.
    ServerError { error: String, time: f64 },
    Unknown { kind: String },
}

#[derive(Deserialize)]
struct ServerErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    time: f64,
}

impl ChatEvent {
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(match kind.as_str() {
            "text_message" => Self::TextMessage(serde_json::from_value(value)?),
            "error" => {
                let body: ServerErrorBody = serde_json::from_value(value)?;
                Self::ServerError { error: body.error, time: body.time }
            }
            _ => Self::Unknown { kind },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_text_message() {
        let frame = json!({
            "type": "text_message",
            "sender": { "id": "$self", "name": "Test1" },
            "content": "hello",
            "time": 1700000000
        });
        let ev = ChatEvent::parse(&frame.to_string()).unwrap();
        let ChatEvent::TextMessage(msg) = ev else { panic!("expected text message, got {ev:?}") };
        assert_eq!(msg.sender.name, "Test1");
        assert_eq!(msg.content, "hello");
        assert_eq!(msg.time, 1_700_000_000.0);
    }

    #[test]
    fn parses_server_error() {
        let ev = ChatEvent::parse(r#"{"type":"error","error":"empty message","time":5}"#).unwrap();
        assert_eq!(ev, ChatEvent::ServerError { error: "empty message".into(), time: 5.0 });
    }

    #[test]
    fn unknown_and_missing_tags_are_kept_explicit() {
        assert_eq!(
            ChatEvent::parse(r#"{"type":"typing"}"#).unwrap(),
            ChatEvent::Unknown { kind: "typing".into() }
        );
        assert_eq!(ChatEvent::parse(r#"{}"#).unwrap(), ChatEvent::Unknown { kind: String::new() });
    }

    #[test]
    fn malformed_frames_are_errors() {
        assert!(ChatEvent::parse("not json").is_err());
        assert!(ChatEvent::parse(r#"{"type":"text_message","content":"x"}"#).is_err());
    }
}
