//! Line framing for the chat SSE stream.
//!
//! The server writes one event per line:
//!
//! ```text
//! data: {"type": "token", "data": {"text": "Hel"}}
//!
//! data: {"type": "token", "data": {"text": "lo"}}
//!
//! data: {"type": "done", "data": {}}
//! ```
//!
//! Chunks arrive with arbitrary boundaries, so the framer keeps the text
//! after the last `\n` until a later chunk terminates it. Only `data: `
//! lines are records; blank separators, `event:` lines and `:` comments are
//! skipped.

use pharmassist_protocol::{EventDecodeError, StreamEvent, SSE_DATA_PREFIX};
use thiserror::Error;

use crate::decode::Utf8Decoder;

/// A `data: ` record that could not be decoded. Never fatal to the stream.
#[derive(Debug, Error)]
#[error("malformed stream record: {source}")]
pub struct FrameError {
    /// Raw text after the `data: ` prefix.
    pub record: String,
    #[source]
    pub source: EventDecodeError,
}

/// One framed record: a decoded event, or the reason it was skipped.
pub type Framed = std::result::Result<StreamEvent, FrameError>;

/// Per-call framing state: the UTF-8 decoder plus the unterminated tail.
#[derive(Debug, Default)]
pub struct EventFramer {
    decoder: Utf8Decoder,
    buffer: String,
}

impl EventFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk and return every record it completed, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Framed> {
        let scanned = self.buffer.len();
        self.decoder.decode(chunk, &mut self.buffer);

        // Text before `scanned` held no newline, so only the new suffix is searched.
        let Some(last_newline) = self.buffer[scanned..].rfind('\n').map(|i| scanned + i) else {
            return Vec::new();
        };
        let complete: String = self.buffer.drain(..=last_newline).collect();

        complete.split('\n').filter_map(parse_line).collect()
    }

    /// Text received but not yet terminated by a newline.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// End of stream. The unterminated tail is discarded, never parsed;
    /// it is returned (if any) so the caller can log it.
    pub fn finish(mut self) -> Option<String> {
        let dropped_bytes = self.decoder.finish();
        if dropped_bytes > 0 {
            tracing::debug!(dropped_bytes, "stream ended inside a UTF-8 sequence");
        }
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }
}

fn parse_line(line: &str) -> Option<Framed> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let record = line.strip_prefix(SSE_DATA_PREFIX)?;
    if record.is_empty() {
        return None;
    }
    Some(
        StreamEvent::from_json(record).map_err(|source| FrameError {
            record: record.to_string(),
            source,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(framed: Vec<Framed>) -> Vec<StreamEvent> {
        framed.into_iter().filter_map(|f| f.ok()).collect()
    }

    fn frame_all(chunks: &[&[u8]]) -> Vec<Framed> {
        let mut framer = EventFramer::new();
        chunks.iter().flat_map(|c| framer.feed(c)).collect()
    }

    const STREAM: &str = concat!(
        "data: {\"type\":\"token\",\"data\":{\"text\":\"שלום \"}}\n\n",
        "data: {\"type\":\"tool_call\",\"data\":{\"tool\":\"medication_lookup\",\"input\":{\"name\":\"אקמול\"}}}\n\n",
        "data: {\"type\":\"tool_result\",\"data\":{\"tool\":\"medication_lookup\",\"result\":{\"found\":true}}}\n\n",
        "data: {\"type\":\"token\",\"data\":{\"text\":\"💊 ready\"}}\n\n",
        "data: {\"type\":\"done\",\"data\":{}}\n\n",
    );

    #[test]
    fn token_split_across_chunks() {
        let out = events(frame_all(&[
            &b"data: {\"type\":\"tok"[..],
            &b"en\",\"data\":{\"text\":\"Hi\"}}\n"[..],
        ]));
        assert_eq!(out, vec![StreamEvent::Token { text: "Hi".into() }]);
    }

    #[test]
    fn framing_is_chunk_boundary_invariant() {
        let bytes = STREAM.as_bytes();
        let whole = events(frame_all(&[bytes]));
        assert_eq!(whole.len(), 5);

        for size in [1, 2, 3, 5, 7, 13, 64] {
            let chunks: Vec<&[u8]> = bytes.chunks(size).collect();
            assert_eq!(events(frame_all(&chunks)), whole, "chunk size {size}");
        }

        for split in 0..bytes.len() {
            let (a, b) = bytes.split_at(split);
            assert_eq!(events(frame_all(&[a, b])), whole, "split at {split}");
        }
    }

    #[test]
    fn malformed_record_does_not_stop_later_records() {
        let framed = frame_all(&[
            &b"data: not-json\n"[..],
            &b"data: {\"type\":\"done\",\"data\":{}}\n"[..],
        ]);
        assert_eq!(framed.len(), 2);
        let err = framed[0].as_ref().unwrap_err();
        assert_eq!(err.record, "not-json");
        assert_eq!(framed[1].as_ref().unwrap(), &StreamEvent::Done);
    }

    #[test]
    fn malformed_and_valid_in_same_chunk() {
        let framed = frame_all(&[
            &b"data: {broken\ndata: {\"type\":\"token\",\"data\":{\"text\":\"ok\"}}\n"[..],
        ]);
        assert!(framed[0].is_err());
        assert_eq!(
            framed[1].as_ref().unwrap(),
            &StreamEvent::Token { text: "ok".into() }
        );
    }

    #[test]
    fn non_data_lines_are_ignored() {
        let framed = frame_all(&[
            &b": keep-alive\n"[..],
            &b"event: message\n"[..],
            &b"\n"[..],
            &b"data:{\"type\":\"done\"}\n"[..],
            &b"data: \n"[..],
        ]);
        assert!(framed.is_empty());
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let out = events(frame_all(&[&b"data: {\"type\":\"done\",\"data\":{}}\r\n\r\n"[..]]));
        assert_eq!(out, vec![StreamEvent::Done]);
    }

    #[test]
    fn unterminated_tail_is_discarded_at_finish() {
        let mut framer = EventFramer::new();
        let out = framer.feed(&b"data: {\"type\":\"token\",\"data\":{\"text\":\"lost\"}}"[..]);
        assert!(out.is_empty());
        assert!(framer.buffered().starts_with("data: "));

        let residual = framer.finish();
        assert!(residual.unwrap().contains("lost"));
    }

    #[test]
    fn long_record_in_small_chunks_completes_once_terminated() {
        let big = "x".repeat(10_000);
        let record = format!(
            "data: {{\"type\":\"tool_result\",\"data\":{{\"tool\":\"t\",\"result\":\"{big}\"}}}}\n"
        );
        let mut framer = EventFramer::new();
        let mut out = Vec::new();
        for chunk in record.as_bytes().chunks(7) {
            out.extend(framer.feed(chunk));
        }
        let out = events(out);
        assert_eq!(out.len(), 1);
        match &out[0] {
            StreamEvent::ToolResult { result, .. } => assert_eq!(result.as_str(), Some(big.as_str())),
            other => panic!("expected tool_result, got {other:?}"),
        }
        assert!(framer.buffered().is_empty());
    }

    #[test]
    fn text_after_last_newline_stays_buffered() {
        let mut framer = EventFramer::new();
        let out = framer.feed(&b"data: {\"type\":\"done\",\"data\":{}}\ndata: {\"ty"[..]);
        assert_eq!(events(out), vec![StreamEvent::Done]);
        assert_eq!(framer.buffered(), "data: {\"ty");

        let out = framer.feed(&b"pe\":\"done\",\"data\":{}}\n"[..]);
        assert_eq!(events(out), vec![StreamEvent::Done]);
        assert!(framer.buffered().is_empty());
    }

    #[test]
    fn finish_with_empty_buffer_returns_none() {
        let mut framer = EventFramer::new();
        framer.feed(&b"data: {\"type\":\"done\",\"data\":{}}\n"[..]);
        assert!(framer.finish().is_none());
    }

    #[test]
    fn multiple_records_from_one_chunk_keep_order() {
        let out = events(frame_all(&[STREAM.as_bytes()]));
        let types: Vec<&str> = out.iter().map(|e| e.event_type()).collect();
        assert_eq!(
            types,
            ["token", "tool_call", "tool_result", "token", "done"]
        );
    }
}
