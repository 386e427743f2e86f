use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Who authored a message.
///
/// The client only ever produces `User` and `Assistant`; `System` exists
/// because the server schema accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

/// Response language requested from the server. `Auto` lets the server
/// detect it from the latest message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LangMode {
    #[default]
    Auto,
    En,
    He,
}

impl std::str::FromStr for LangMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(LangMode::Auto),
            "en" => Ok(LangMode::En),
            "he" => Ok(LangMode::He),
            other => Err(format!("unknown language mode: {}", other)),
        }
    }
}

/// A single message in the conversation history. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Append-only conversation history for one chat session.
///
/// Roles usually alternate user/assistant but nothing enforces it: a failed
/// call leaves a user message with no reply, and the next user message is
/// appended right after it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Per-call identifier (random UUID, used only to correlate log lines).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallId(pub String);

impl CallId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn conversation_serializes_as_plain_array() {
        let mut conv = ConversationState::new();
        conv.push(Message::user("a"));
        conv.push(Message::assistant("b"));

        let json = serde_json::to_value(&conv).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["role"], "user");
        assert_eq!(json[1]["content"], "b");
    }

    #[test]
    fn conversation_does_not_enforce_alternation() {
        let mut conv = ConversationState::new();
        conv.push(Message::user("first"));
        conv.push(Message::user("second"));
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.last().map(|m| m.content.as_str()), Some("second"));
    }

    #[test]
    fn lang_mode_parses_case_insensitively() {
        assert_eq!("HE".parse::<LangMode>(), Ok(LangMode::He));
        assert_eq!("auto".parse::<LangMode>(), Ok(LangMode::Auto));
        assert!("fr".parse::<LangMode>().is_err());
    }

    #[test]
    fn call_ids_are_unique() {
        assert_ne!(CallId::new(), CallId::new());
    }
}
