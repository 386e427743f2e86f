//! Error types for the pharmassist-client crate.

use thiserror::Error;

/// Failures that end a streaming call.
///
/// Malformed records are not here: they are skipped by the framer and never
/// end a call.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Network failure, either before the response or while reading the body.
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status. The body is not read.
    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    /// Nothing to send after trimming whitespace.
    #[error("message cannot be empty")]
    EmptyMessage,

    /// The caller cancelled the call.
    #[error("operation cancelled")]
    Cancelled,
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ChatError>;
