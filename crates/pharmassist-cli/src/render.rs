//! Text helpers for the terminal front end: direction detection, the
//! prescription-query check, and tool event formatting.

use pharmassist_core::LangMode;
use pharmassist_protocol::ToolEventKind;
use serde_json::Value;

/// Unicode RIGHT-TO-LEFT MARK.
pub const RLM: char = '\u{200F}';

const PRESCRIPTION_KEYWORDS: &[&str] = &[
    "prescription",
    "refill",
    "my medication",
    "my prescriptions",
    "מרשם",
    "מרשמים",
    "התרופות שלי",
];

fn is_hebrew(c: char) -> bool {
    ('\u{0590}'..='\u{05FF}').contains(&c)
}

/// More Hebrew letters than ASCII Latin letters.
pub fn is_rtl(text: &str) -> bool {
    let (hebrew, latin) = text.chars().fold((0usize, 0usize), |(h, l), c| {
        if is_hebrew(c) {
            (h + 1, l)
        } else if c.is_ascii_alphabetic() {
            (h, l + 1)
        } else {
            (h, l)
        }
    });
    hebrew > latin
}

/// Direction for the reply to `message`. An explicit language wins;
/// otherwise the reply follows the user's own script.
pub fn reply_is_rtl(lang_mode: Option<LangMode>, message: &str) -> bool {
    match lang_mode {
        Some(LangMode::He) => true,
        Some(LangMode::En) => false,
        Some(LangMode::Auto) | None => is_rtl(message),
    }
}

pub fn is_prescription_query(text: &str) -> bool {
    let lower = text.to_lowercase();
    PRESCRIPTION_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// `Calling: <tool>` / `Result: <tool>` followed by the payload. String
/// results are shown raw, everything else as pretty JSON.
pub fn format_tool_event(kind: ToolEventKind, tool: &str, payload: &Value) -> String {
    let header = match kind {
        ToolEventKind::Call => format!("Calling: {tool}"),
        ToolEventKind::Result => format!("Result: {tool}"),
    };
    let body = match payload {
        Value::Null => return header,
        Value::String(s) if kind == ToolEventKind::Result => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    };
    format!("{header}\n{body}")
}

/// Insert an RLM at the start of every line of a streamed piece.
/// `at_line_start` carries over between pieces of the same reply.
pub fn mark_rtl_lines(piece: &str, at_line_start: &mut bool) -> String {
    let mut out = String::with_capacity(piece.len() + 3);
    for c in piece.chars() {
        if *at_line_start {
            out.push(RLM);
            *at_line_start = false;
        }
        out.push(c);
        if c == '\n' {
            *at_line_start = true;
        }
    }
    out
}
