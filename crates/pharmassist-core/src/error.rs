use thiserror::Error;

#[derive(Debug, Error)]
pub enum PharmAssistError {
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PharmAssistError {
    /// Short error code string, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            PharmAssistError::Config(_) => "CONFIG_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, PharmAssistError>;
