use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Prefix of every event-bearing line in the response body.
pub const SSE_DATA_PREFIX: &str = "data: ";

/// Default text for an `error` event that carries no message.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// One event from the chat stream.
///
/// Wire: `{"type": "token", "data": {"text": "Hi"}}`
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental assistant text. May be empty; empty tokens are ignored
    /// by dispatch.
    Token { text: String },

    /// The agent started a tool.
    ToolCall { tool: String, input: Value },

    /// A tool finished. `result` is an object, or a plain string when the
    /// tool returned something that is not a JSON object.
    ToolResult { tool: String, result: Value },

    /// Application-level error reported in-stream.
    Error { message: Option<String> },

    /// End-of-response marker.
    Done,

    /// A `type` this client does not know. Kept so newer servers can add
    /// event types without breaking older clients.
    Unknown { event_type: String },
}

/// Which half of a tool round trip an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolEventKind {
    Call,
    Result,
}

impl ToolEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolEventKind::Call => "tool_call",
            ToolEventKind::Result => "tool_result",
        }
    }
}

impl std::fmt::Display for ToolEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("invalid event JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid `{event_type}` payload: {source}")]
    Payload {
        event_type: String,
        source: serde_json::Error,
    },
}

// Envelope and payload shapes (deserialization only)

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct TokenPayload {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ToolCallPayload {
    #[serde(default)]
    tool: String,
    #[serde(default)]
    input: Value,
}

#[derive(Deserialize)]
struct ToolResultPayload {
    #[serde(default)]
    tool: String,
    #[serde(default)]
    result: Value,
}

impl StreamEvent {
    /// Decode one record (the text after `data: `).
    pub fn from_json(record: &str) -> Result<Self, EventDecodeError> {
        let envelope: Envelope = serde_json::from_str(record)?;
        // A missing or null `data` behaves like an empty object.
        let data = match envelope.data {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };

        let event = match envelope.event_type.as_str() {
            "token" => {
                let p: TokenPayload = payload(&envelope.event_type, data)?;
                StreamEvent::Token {
                    text: p.text.unwrap_or_default(),
                }
            }
            "tool_call" => {
                let p: ToolCallPayload = payload(&envelope.event_type, data)?;
                StreamEvent::ToolCall {
                    tool: p.tool,
                    input: p.input,
                }
            }
            "tool_result" => {
                let p: ToolResultPayload = payload(&envelope.event_type, data)?;
                StreamEvent::ToolResult {
                    tool: p.tool,
                    result: p.result,
                }
            }
            // Never rejected on shape: the user must always see the error.
            "error" => StreamEvent::Error {
                message: error_text(&data),
            },
            "done" => StreamEvent::Done,
            _ => StreamEvent::Unknown {
                event_type: envelope.event_type,
            },
        };
        Ok(event)
    }

    /// The wire `type` string.
    pub fn event_type(&self) -> &str {
        match self {
            StreamEvent::Token { .. } => "token",
            StreamEvent::ToolCall { .. } => "tool_call",
            StreamEvent::ToolResult { .. } => "tool_result",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Done => "done",
            StreamEvent::Unknown { event_type } => event_type,
        }
    }

    /// Error text to show the user, falling back to "Unknown error" when
    /// the server sent none. `None` for non-error events.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            StreamEvent::Error { message } => Some(
                message
                    .as_deref()
                    .filter(|m| !m.is_empty())
                    .unwrap_or(UNKNOWN_ERROR),
            ),
            _ => None,
        }
    }

    /// Wire JSON object for this event.
    pub fn to_json(&self) -> Value {
        let data = match self {
            StreamEvent::Token { text } => serde_json::json!({ "text": text }),
            StreamEvent::ToolCall { tool, input } => {
                serde_json::json!({ "tool": tool, "input": input })
            }
            StreamEvent::ToolResult { tool, result } => {
                serde_json::json!({ "tool": tool, "result": result })
            }
            StreamEvent::Error { message: Some(m) } => serde_json::json!({ "message": m }),
            StreamEvent::Error { message: None }
            | StreamEvent::Done
            | StreamEvent::Unknown { .. } => serde_json::json!({}),
        };
        serde_json::json!({ "type": self.event_type(), "data": data })
    }

    /// Full SSE record as the server writes it: `data: {...}\n\n`.
    pub fn to_sse_record(&self) -> String {
        format!("{}{}\n\n", SSE_DATA_PREFIX, self.to_json())
    }
}

impl Serialize for StreamEvent {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// `data.message` as display text. Non-string scalars are stringified;
/// anything else leaves the message unset.
fn error_text(data: &Value) -> Option<String> {
    match data.get("message")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn payload<T: serde::de::DeserializeOwned>(
    event_type: &str,
    data: Value,
) -> Result<T, EventDecodeError> {
    serde_json::from_value(data).map_err(|source| EventDecodeError::Payload {
        event_type: event_type.to_string(),
        source,
    })
}
