use futures_util::{Stream, StreamExt};
use pharmassist_core::{CallId, ConversationState, LangMode, Message, PharmAssistConfig};
use pharmassist_protocol::ChatRequestBody;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatch::{Dispatcher, StreamHandler};
use crate::error::{ChatError, Result};
use crate::framer::EventFramer;
use crate::transport::ChatTransport;

/// Summary of one completed streaming call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOutcome {
    /// Accumulated assistant text; `None` when no non-empty token arrived.
    pub reply: Option<String>,
    /// Records successfully decoded and dispatched.
    pub events: usize,
    /// Records skipped because they were not valid events.
    pub malformed: usize,
    /// Whether a `done` marker was seen before end-of-stream.
    pub saw_done: bool,
}

/// One chat conversation and the endpoint it talks to.
///
/// `send` borrows the session mutably, so a session runs at most one call
/// at a time. Each call gets a fresh framer and dispatcher.
pub struct ChatSession {
    transport: ChatTransport,
    conversation: ConversationState,
    user_identifier: Option<String>,
    lang_mode: Option<LangMode>,
}

impl ChatSession {
    pub fn new(transport: ChatTransport) -> Self {
        Self {
            transport,
            conversation: ConversationState::new(),
            user_identifier: None,
            lang_mode: None,
        }
    }

    pub fn from_config(config: &PharmAssistConfig) -> Result<Self> {
        let mut session = Self::new(ChatTransport::new(&config.endpoint)?);
        session.set_user_identifier(config.client.user_identifier.clone());
        session.lang_mode = config.client.lang_mode;
        Ok(session)
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn transport(&self) -> &ChatTransport {
        &self.transport
    }

    pub fn user_identifier(&self) -> Option<&str> {
        self.user_identifier.as_deref()
    }

    /// Blank identifiers are stored as `None`.
    pub fn set_user_identifier(&mut self, identifier: Option<String>) {
        self.user_identifier = identifier
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
    }

    pub fn set_lang_mode(&mut self, lang_mode: Option<LangMode>) {
        self.lang_mode = lang_mode;
    }

    /// Send a user message and stream the reply through `handler`.
    pub async fn send<H: StreamHandler + ?Sized>(
        &mut self,
        text: &str,
        handler: &mut H,
    ) -> Result<StreamOutcome> {
        self.send_with_cancel(text, handler, &CancellationToken::new())
            .await
    }

    /// Like [`send`](Self::send), but stops reading when `cancel` fires.
    ///
    /// The user message is appended before the request and kept whatever
    /// happens. The assistant message is appended only when the stream ends
    /// normally with some text. Transport failures reach `on_error` once;
    /// cancellation does not.
    pub async fn send_with_cancel<H: StreamHandler + ?Sized>(
        &mut self,
        text: &str,
        handler: &mut H,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome> {
        let content = text.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.conversation.push(Message::user(content));

        let call_id = CallId::new();
        let body = ChatRequestBody::new(&self.conversation)
            .with_user_identifier(self.user_identifier.as_deref())
            .with_lang_mode(self.lang_mode);

        info!(
            call_id = %call_id,
            messages = body.messages.len(),
            has_identifier = body.user_identifier.is_some(),
            "starting chat stream"
        );

        match self.run_call(&body, handler, cancel, &call_id).await {
            Ok(outcome) => {
                if let Some(reply) = &outcome.reply {
                    self.conversation.push(Message::assistant(reply.clone()));
                }
                info!(
                    call_id = %call_id,
                    events = outcome.events,
                    malformed = outcome.malformed,
                    reply_chars = outcome.reply.as_ref().map_or(0, |r| r.chars().count()),
                    "chat stream complete"
                );
                Ok(outcome)
            }
            Err(ChatError::Cancelled) => {
                info!(call_id = %call_id, "chat stream cancelled");
                Err(ChatError::Cancelled)
            }
            Err(e) => {
                warn!(call_id = %call_id, error = %e, "chat stream failed");
                handler.on_error(&e.to_string());
                Err(e)
            }
        }
    }

    async fn run_call<H: StreamHandler + ?Sized>(
        &self,
        body: &ChatRequestBody,
        handler: &mut H,
        cancel: &CancellationToken,
        call_id: &CallId,
    ) -> Result<StreamOutcome> {
        let resp = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
            resp = self.transport.open(body) => resp?,
        };
        drive_stream(resp.bytes_stream(), handler, cancel, call_id).await
    }
}

/// Run the framer and dispatcher over a body stream until it ends.
///
/// All records completed by one chunk are dispatched before the next chunk
/// is awaited. A chunk error ends the call; a malformed record does not.
/// Text left unterminated at end-of-stream is dropped.
pub async fn drive_stream<S, B, E, H>(
    stream: S,
    handler: &mut H,
    cancel: &CancellationToken,
    call_id: &CallId,
) -> Result<StreamOutcome>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<ChatError>,
    H: StreamHandler + ?Sized,
{
    let mut stream = std::pin::pin!(stream);
    let mut framer = EventFramer::new();
    let mut dispatcher = Dispatcher::new();
    let mut malformed = 0;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
            next = stream.next() => next,
        };
        let Some(chunk) = next else { break };
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => return Err(e.into()),
        };
        let bytes = chunk.as_ref();
        debug!(call_id = %call_id, bytes = bytes.len(), "chunk received");

        for framed in framer.feed(bytes) {
            match framed {
                Ok(event) => dispatcher.dispatch(&event, handler),
                Err(e) => {
                    malformed += 1;
                    warn!(call_id = %call_id, error = %e, record = %e.record, "skipping malformed stream record");
                }
            }
        }
    }

    if let Some(residual) = framer.finish() {
        debug!(call_id = %call_id, len = residual.len(), "discarding unterminated trailing fragment");
    }

    let events = dispatcher.dispatched();
    let saw_done = dispatcher.saw_done();
    let text = dispatcher.into_text();
    Ok(StreamOutcome {
        reply: (!text.is_empty()).then_some(text),
        events,
        malformed,
        saw_done,
    })
}
