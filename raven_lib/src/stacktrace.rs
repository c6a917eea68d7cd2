//! Stack capture and formatting into `sentry.interfaces.Stacktrace` frames.

use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;
use std::collections::BTreeMap;

/// One call-site record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackFrame {
    pub filename: String,
    pub lineno: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colno: Option<u32>,
    pub function: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, String>,
}

impl StackFrame {
    pub fn new(function: impl Into<String>, filename: impl Into<String>, lineno: u32) -> Self {
        Self {
            filename: filename.into(),
            lineno,
            colno: None,
            function: function.into(),
            vars: BTreeMap::new(),
        }
    }
}

/// Turns a raw call-stack snapshot into ordered frames (outermost first).
pub trait StackFormatter: Send + Sync {
    /// `skip` innermost frames are dropped after backtrace machinery frames are removed.
    fn format(&self, backtrace: &Backtrace, skip: usize) -> Vec<StackFrame>;
}

/// Parses the rendered form of [`std::backtrace::Backtrace`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStackFormatter;

impl StackFormatter for DefaultStackFormatter {
    fn format(&self, backtrace: &Backtrace, skip: usize) -> Vec<StackFrame> {
        let rendered = backtrace.to_string();
        let mut frames: Vec<StackFrame> = parse_rendered(&rendered)
            .into_iter()
            .filter(|f| !is_capture_machinery(&f.function))
            .skip(skip)
            .collect();
        frames.reverse();
        frames
    }
}

/// Snapshot the current stack. Never inlined so that it is always exactly one frame.
#[inline(never)]
pub fn capture() -> Backtrace {
    Backtrace::force_capture()
}

fn is_capture_machinery(function: &str) -> bool {
    function.starts_with("std::backtrace::")
        || function.starts_with("std::backtrace_rs::")
        || function.starts_with("std::sys::backtrace::")
        || function.starts_with("raven_lib::stacktrace::capture")
}

/// Parse lines of the form
/// `  3: crate::module::function` optionally followed by `      at src/file.rs:10:5`.
fn parse_rendered(rendered: &str) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = Vec::new();
    for line in rendered.lines() {
        let trimmed = line.trim();
        if let Some(location) = trimmed.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                apply_location(frame, location);
            }
            continue;
        }
        let Some((index, function)) = trimmed.split_once(": ") else {
            continue;
        };
        if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        frames.push(StackFrame::new(
            strip_hash(function.trim()),
            "<unknown>",
            0,
        ));
    }
    frames
}

fn apply_location(frame: &mut StackFrame, location: &str) {
    // Paths may contain ':' (Windows drives), so split from the right.
    let mut parts = location.rsplitn(3, ':');
    let last = parts.next();
    let middle = parts.next();
    let rest = parts.next();
    match (rest, middle, last) {
        (Some(file), Some(line), Some(col)) => {
            frame.filename = file.to_string();
            frame.lineno = line.parse().unwrap_or_default();
            frame.colno = col.parse().ok();
        }
        (None, Some(file), Some(line)) => {
            frame.filename = file.to_string();
            frame.lineno = line.parse().unwrap_or_default();
        }
        _ => frame.filename = location.to_string(),
    }
}

/// Drop the trailing `::h0123abcd` symbol hash some toolchains print.
fn strip_hash(function: &str) -> String {
    match function.rsplit_once("::h") {
        Some((head, hash)) if hash.len() == 16 && hash.chars().all(|c| c.is_ascii_hexdigit()) => {
            head.to_string()
        }
        _ => function.to_string(),
    }
}
