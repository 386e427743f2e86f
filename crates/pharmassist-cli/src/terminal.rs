use std::io::Write;

use pharmassist_client::StreamHandler;
use pharmassist_protocol::ToolEventKind;
use serde_json::Value;

use crate::render::{format_tool_event, mark_rtl_lines};

const THINKING: &str = "thinking…";
/// Carriage return plus ANSI "erase line".
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Renders one streamed reply to a terminal.
///
/// Shows a thinking indicator until the first token, then writes tokens as
/// they arrive. Tool events are printed only when enabled.
pub struct TerminalHandler<W: Write> {
    out: W,
    show_tools: bool,
    rtl: bool,
    thinking: bool,
    at_line_start: bool,
    wrote_text: bool,
}

impl<W: Write> TerminalHandler<W> {
    pub fn new(out: W, show_tools: bool, rtl: bool) -> Self {
        Self {
            out,
            show_tools,
            rtl,
            thinking: false,
            at_line_start: true,
            wrote_text: false,
        }
    }

    /// Print the thinking indicator. Called when the request is sent.
    pub fn begin(&mut self) {
        self.thinking = true;
        self.emit(THINKING);
    }

    /// Clear leftovers and end the reply on a fresh line.
    pub fn finish(&mut self) {
        self.clear_thinking();
        if self.wrote_text && !self.at_line_start {
            self.emit("\n");
            self.at_line_start = true;
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn clear_thinking(&mut self) {
        if self.thinking {
            self.thinking = false;
            self.emit(CLEAR_LINE);
        }
    }

    /// Print a full line outside the token flow, keeping the indicator
    /// visible if no token has arrived yet.
    fn emit_line(&mut self, line: &str) {
        let redraw = self.thinking;
        self.clear_thinking();
        if !self.at_line_start {
            self.emit("\n");
        }
        self.emit(line);
        self.emit("\n");
        self.at_line_start = true;
        if redraw {
            self.begin();
        }
    }

    fn emit(&mut self, text: &str) {
        let result = self
            .out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush());
        if let Err(e) = result {
            tracing::debug!(error = %e, "terminal write failed");
        }
    }
}

impl<W: Write> StreamHandler for TerminalHandler<W> {
    fn on_first_token(&mut self) {
        self.clear_thinking();
    }

    fn on_token(&mut self, text: &str) {
        let piece = if self.rtl {
            mark_rtl_lines(text, &mut self.at_line_start)
        } else {
            self.at_line_start = text.ends_with('\n');
            text.to_string()
        };
        self.wrote_text = true;
        self.emit(&piece);
    }

    fn on_tool_event(&mut self, kind: ToolEventKind, tool: &str, payload: &Value) {
        if self.show_tools {
            self.emit_line(&format_tool_event(kind, tool, payload));
        }
    }

    fn on_error(&mut self, message: &str) {
        self.emit_line(&format!("Error: {message}"));
    }
}
