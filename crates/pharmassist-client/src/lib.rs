//! pharmassist-client: streaming chat client for the pharmacy assistant.
//!
//! Data flow for one call:
//! `POST` → byte chunks → [`decode::Utf8Decoder`] → [`framer::EventFramer`]
//! → [`dispatch::Dispatcher`] → [`dispatch::StreamHandler`] callbacks.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use pharmassist_client::{ChatSession, StreamHandler};
//! use pharmassist_core::PharmAssistConfig;
//!
//! struct Print;
//!
//! impl StreamHandler for Print {
//!     fn on_token(&mut self, text: &str) {
//!         print!("{text}");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut session = ChatSession::from_config(&PharmAssistConfig::default()).unwrap();
//!     session.send("Do you have ibuprofen in stock?", &mut Print).await.unwrap();
//! }
//! ```

pub mod decode;
pub mod dispatch;
pub mod error;
pub mod framer;
pub mod session;
pub mod transport;

pub use dispatch::{Dispatcher, StreamHandler, StreamPhase};
pub use error::{ChatError, Result};
pub use framer::{EventFramer, FrameError};
pub use session::{drive_stream, ChatSession, StreamOutcome};
pub use transport::ChatTransport;
