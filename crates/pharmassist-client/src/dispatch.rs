use pharmassist_protocol::{StreamEvent, ToolEventKind};
use serde_json::Value;
use tracing::debug;

/// Reactions to stream events. Every method defaults to a no-op so a
/// front end implements only what it renders.
///
/// Callbacks run synchronously between network reads; a slow callback
/// delays the next chunk but never reorders events.
pub trait StreamHandler {
    /// The first non-empty token of the call arrived. Fires once per call,
    /// immediately before that token's [`on_token`](Self::on_token).
    fn on_first_token(&mut self) {}

    /// A non-empty piece of assistant text.
    fn on_token(&mut self, _text: &str) {}

    /// A tool was called or returned. `payload` is the tool input for
    /// [`ToolEventKind::Call`] and the result for [`ToolEventKind::Result`].
    fn on_tool_event(&mut self, _kind: ToolEventKind, _tool: &str, _payload: &Value) {}

    /// An error to show the user: in-stream `error` events and fatal
    /// transport failures alike.
    fn on_error(&mut self, _message: &str) {}
}

/// Handler that ignores everything.
impl StreamHandler for () {}

impl<H: StreamHandler + ?Sized> StreamHandler for &mut H {
    fn on_first_token(&mut self) {
        (**self).on_first_token()
    }

    fn on_token(&mut self, text: &str) {
        (**self).on_token(text)
    }

    fn on_tool_event(&mut self, kind: ToolEventKind, tool: &str, payload: &Value) {
        (**self).on_tool_event(kind, tool, payload)
    }

    fn on_error(&mut self, message: &str) {
        (**self).on_error(message)
    }
}

/// First-token latch for one streaming call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamPhase {
    /// No non-empty token seen yet.
    #[default]
    AwaitingFirstToken,
    /// At least one token seen. Terminal for the call.
    Streaming,
}

/// Applies one reaction per event and accumulates the assistant text.
///
/// Create one per call; state never carries over between calls.
#[derive(Debug, Default)]
pub struct Dispatcher {
    phase: StreamPhase,
    text: String,
    dispatched: usize,
    saw_done: bool,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch<H: StreamHandler + ?Sized>(&mut self, event: &StreamEvent, handler: &mut H) {
        self.dispatched += 1;
        debug!(event_type = event.event_type(), "dispatching stream event");

        match event {
            StreamEvent::Token { text } => {
                if text.is_empty() {
                    return;
                }
                if self.phase == StreamPhase::AwaitingFirstToken {
                    self.phase = StreamPhase::Streaming;
                    handler.on_first_token();
                }
                self.text.push_str(text);
                handler.on_token(text);
            }
            StreamEvent::ToolCall { tool, input } => {
                handler.on_tool_event(ToolEventKind::Call, tool, input);
            }
            StreamEvent::ToolResult { tool, result } => {
                handler.on_tool_event(ToolEventKind::Result, tool, result);
            }
            StreamEvent::Error { .. } => {
                if let Some(message) = event.error_message() {
                    handler.on_error(message);
                }
            }
            StreamEvent::Done => {
                // Marker only: the read loop ends at transport end-of-stream.
                self.saw_done = true;
            }
            StreamEvent::Unknown { event_type } => {
                debug!(event_type = %event_type, "ignoring unknown stream event type");
            }
        }
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Assistant text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Events handed to [`dispatch`](Self::dispatch), including ignored ones.
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn saw_done(&self) -> bool {
        self.saw_done
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl StreamHandler for Recorder {
        fn on_first_token(&mut self) {
            self.calls.push("first".into());
        }

        fn on_token(&mut self, text: &str) {
            self.calls.push(format!("token:{text}"));
        }

        fn on_tool_event(&mut self, kind: ToolEventKind, tool: &str, _payload: &Value) {
            self.calls.push(format!("{kind}:{tool}"));
        }

        fn on_error(&mut self, message: &str) {
            self.calls.push(format!("error:{message}"));
        }
    }

    fn token(text: &str) -> StreamEvent {
        StreamEvent::Token { text: text.into() }
    }

    #[test]
    fn first_token_fires_once_before_its_token() {
        let mut d = Dispatcher::new();
        let mut r = Recorder::default();

        d.dispatch(&token("Hel"), &mut r);
        d.dispatch(&token("lo"), &mut r);

        assert_eq!(r.calls, ["first", "token:Hel", "token:lo"]);
        assert_eq!(d.text(), "Hello");
        assert_eq!(d.phase(), StreamPhase::Streaming);
    }

    #[test]
    fn empty_token_does_not_trip_the_latch() {
        let mut d = Dispatcher::new();
        let mut r = Recorder::default();

        d.dispatch(&token(""), &mut r);
        assert!(r.calls.is_empty());
        assert_eq!(d.phase(), StreamPhase::AwaitingFirstToken);

        d.dispatch(&token("x"), &mut r);
        assert_eq!(r.calls, ["first", "token:x"]);
    }

    #[test]
    fn tool_events_do_not_change_phase() {
        let mut d = Dispatcher::new();
        let mut r = Recorder::default();

        d.dispatch(
            &StreamEvent::ToolCall {
                tool: "inventory_check".into(),
                input: serde_json::json!({"sku": 1}),
            },
            &mut r,
        );
        d.dispatch(
            &StreamEvent::ToolResult {
                tool: "inventory_check".into(),
                result: serde_json::json!("in stock"),
            },
            &mut r,
        );

        assert_eq!(
            r.calls,
            ["tool_call:inventory_check", "tool_result:inventory_check"]
        );
        assert_eq!(d.phase(), StreamPhase::AwaitingFirstToken);
        assert!(d.text().is_empty());
    }

    #[test]
    fn error_defaults_message() {
        let mut d = Dispatcher::new();
        let mut r = Recorder::default();

        d.dispatch(&StreamEvent::Error { message: None }, &mut r);
        d.dispatch(
            &StreamEvent::Error {
                message: Some("db locked".into()),
            },
            &mut r,
        );

        assert_eq!(r.calls, ["error:Unknown error", "error:db locked"]);
    }

    #[test]
    fn done_and_unknown_are_silent() {
        let mut d = Dispatcher::new();
        let mut r = Recorder::default();

        d.dispatch(&StreamEvent::Done, &mut r);
        d.dispatch(
            &StreamEvent::Unknown {
                event_type: "usage".into(),
            },
            &mut r,
        );

        assert!(r.calls.is_empty());
        assert!(d.saw_done());
        assert_eq!(d.dispatched(), 2);
    }

    #[test]
    fn tokens_after_done_still_dispatch() {
        let mut d = Dispatcher::new();
        let mut r = Recorder::default();

        d.dispatch(&StreamEvent::Done, &mut r);
        d.dispatch(&token("late"), &mut r);

        assert_eq!(r.calls, ["first", "token:late"]);
    }

    #[test]
    fn unit_handler_accepts_everything() {
        let mut d = Dispatcher::new();
        d.dispatch(&token("ignored by ()"), &mut ());
        assert_eq!(d.into_text(), "ignored by ()");
    }
}
