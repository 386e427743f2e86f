pub mod config;
pub mod error;
pub mod types;

pub use config::PharmAssistConfig;
pub use error::{PharmAssistError, Result};
pub use types::{CallId, ConversationState, LangMode, Message, Role};
