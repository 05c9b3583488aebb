//! `<think>` reasoning-span removal.
//!
//! Two flavours are provided:
//!
//! - [`ReasoningFilter`] is an incremental state machine fed one streamed
//!   fragment at a time. A span may open in one fragment and close several
//!   fragments later. Each turn owns its own filter.
//! - [`strip_reasoning_spans`] removes complete spans from a finished text.

use once_cell::sync::Lazy;
use regex::Regex;

pub const SPAN_START: &str = "<think>";
pub const SPAN_END: &str = "</think>";

static SPAN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());
static BLANK_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpanState {
    #[default]
    Outside,
    Inside,
}

/// Streaming reasoning-span filter.
///
/// Markers are matched within a single fragment; a marker split across two
/// fragments is passed through as text.
#[derive(Debug, Clone, Default)]
pub struct ReasoningFilter {
    state: SpanState,
}

impl ReasoningFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SpanState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = SpanState::Outside;
    }

    /// Returns the visible part of `fragment`, updating the span state.
    pub fn filter_fragment(&mut self, fragment: &str) -> String {
        let mut out = String::new();
        let mut rest = fragment;

        while !rest.is_empty() {
            match self.state {
                SpanState::Inside => match rest.find(SPAN_END) {
                    Some(end) => {
                        rest = &rest[end + SPAN_END.len()..];
                        self.state = SpanState::Outside;
                    }
                    None => break,
                },
                SpanState::Outside => match rest.find(SPAN_START) {
                    Some(start) => {
                        out.push_str(&rest[..start]);
                        rest = &rest[start + SPAN_START.len()..];
                        self.state = SpanState::Inside;
                    }
                    None => {
                        out.push_str(rest);
                        break;
                    }
                },
            }
        }

        out
    }
}

/// Removes every complete `<think>…</think>` span, collapses runs of three or
/// more newlines to two, and trims.
pub fn strip_reasoning_spans(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let without_spans = SPAN_RE.replace_all(text, "");
    let collapsed = BLANK_RUN_RE.replace_all(&without_spans, "\n\n");
    collapsed.trim().to_string()
}

/// Whether `text` holds at least one complete reasoning span.
pub fn contains_reasoning_markers(text: &str) -> bool {
    SPAN_RE.is_match(text)
}
