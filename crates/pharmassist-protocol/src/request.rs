use pharmassist_core::{ConversationState, LangMode, Message};
use serde::{Deserialize, Serialize};

/// Body of `POST /chat/stream`.
/// Wire: `{ "messages": [{"role": "user", "content": "hi"}], "user_identifier": "..." }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequestBody {
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang_mode: Option<LangMode>,
}

impl ChatRequestBody {
    /// Snapshot the whole conversation.
    pub fn new(conversation: &ConversationState) -> Self {
        Self {
            messages: conversation.messages().to_vec(),
            user_identifier: None,
            lang_mode: None,
        }
    }

    /// Attach the identifier; blank values are dropped so the field stays
    /// off the wire.
    pub fn with_user_identifier(mut self, identifier: Option<&str>) -> Self {
        self.user_identifier = identifier
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        self
    }

    pub fn with_lang_mode(mut self, lang_mode: Option<LangMode>) -> Self {
        self.lang_mode = lang_mode;
        self
    }
}

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
}

impl HealthResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
