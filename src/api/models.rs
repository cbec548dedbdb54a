use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body of `GET /messages`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageList {
    pub messages: Vec<String>,
}

/// Body of `POST /messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub message: String,
}

/// Frame sent over the chat socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingChat {
    pub message: String,
}

/// Sender id the server uses when echoing the client's own message.
pub const SELF_ID: &str = "$self";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Sender {
    #[serde(deserialize_with = "sender_id")]
    pub id: String,
    pub name: String,
}

impl Sender {
    pub fn is_self(&self) -> bool {
        self.id == SELF_ID
    }
}

// Other users arrive with a numeric id, the echo of our own message with "$self".
fn sender_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
    })
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextMessage {
    pub sender: Sender,
    pub time: f64,
    pub content: String,
}

/// Reply of `POST /login` and `POST /register`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FormReply {
    #[serde(default)]
    pub error: Option<Value>,
}

impl FormReply {
    /// The error to display, if the `error` field is truthy.
    pub fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_sender_ids_normalise_to_integers() {
        let msg: TextMessage = serde_json::from_value(json!({
            "sender": { "id": 3.0, "name": "Test1" },
            "time": 1700000000.0,
            "content": "hi"
        }))
        .unwrap();
        assert_eq!(msg.sender.id, "3");
        assert!(!msg.sender.is_self());
    }

    #[test]
    fn self_sender_is_recognised() {
        let sender: Sender =
            serde_json::from_value(json!({ "id": "$self", "name": "me" })).unwrap();
        assert!(sender.is_self());
    }

    #[test]
    fn form_reply_truthiness() {
        let reply = |v: Value| serde_json::from_value::<FormReply>(v).unwrap().error_message();
        assert_eq!(reply(json!({})), None);
        assert_eq!(reply(json!({ "error": null })), None);
        assert_eq!(reply(json!({ "error": "" })), None);
        assert_eq!(reply(json!({ "error": false })), None);
        assert_eq!(reply(json!({ "error": 0 })), None);
        assert_eq!(reply(json!({ "error": "NO_USER" })).as_deref(), Some("NO_USER"));
        assert_eq!(reply(json!({ "error": true })).as_deref(), Some("true"));
    }
}
