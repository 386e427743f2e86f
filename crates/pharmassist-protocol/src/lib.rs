//! Wire types shared with the pharmacy chat server.
//!
//! - [`request`]: the JSON body POSTed to the streaming endpoint and the
//!   health-check response.
//! - [`events`]: the `{"type": ..., "data": ...}` objects carried on
//!   `data: ` lines of the SSE response.

pub mod events;
pub mod request;

pub use events::{EventDecodeError, StreamEvent, ToolEventKind, SSE_DATA_PREFIX};
pub use request::{ChatRequestBody, HealthResponse};
