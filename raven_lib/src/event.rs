//! Event model and the builder that assembles events from caller data and ambient context.

use crate::config::Config;
use crate::context::{HttpInterface, RequestContext};
use crate::helpers::{format_message, format_time, generate_event_id};
use crate::stacktrace::{StackFormatter, StackFrame};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::Location;
use std::str::FromStr;

/// Used when an error renders to an empty string.
pub const UNKNOWN_EXCEPTION: &str = "<unknown exception>";

/// Severity level, ordered by importance. Serialized as the protocol's numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "LevelRepr")]
pub enum Level {
    Debug,
    Info,
    Warning,
    #[default]
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> u8 {
        match level {
            Level::Debug => 10,
            Level::Info => 20,
            Level::Warning => 30,
            Level::Error => 40,
        }
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, String> {
        match value {
            10 => Ok(Level::Debug),
            20 => Ok(Level::Info),
            30 => Ok(Level::Warning),
            40 => Ok(Level::Error),
            other => Err(format!("unknown level: {}", other)),
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            other => Err(format!("unknown level: {}", other)),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LevelRepr {
    Number(u8),
    Name(String),
}

impl TryFrom<LevelRepr> for Level {
    type Error = String;

    fn try_from(repr: LevelRepr) -> Result<Self, String> {
        match repr {
            LevelRepr::Number(n) => Level::try_from(n),
            LevelRepr::Name(s) => s.parse(),
        }
    }
}

/// `sentry.interfaces.Message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageInterface {
    pub message: String,
    pub params: Vec<Value>,
    pub formatted: String,
}

/// `sentry.interfaces.Exception`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionInterface {
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub module: Option<String>,
}

/// `sentry.interfaces.Stacktrace`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StacktraceInterface {
    pub frames: Vec<StackFrame>,
}

/// One report submitted to the collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub project: String,
    pub site: Option<String>,
    pub timestamp: String,
    pub level: Level,
    pub server_name: String,
    pub logger: String,
    pub message: String,
    pub culprit: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(
        rename = "sentry.interfaces.Message",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub message_interface: Option<MessageInterface>,
    #[serde(
        rename = "sentry.interfaces.Exception",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub exception: Option<ExceptionInterface>,
    #[serde(
        rename = "sentry.interfaces.Stacktrace",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub stacktrace: Option<StacktraceInterface>,
    #[serde(
        rename = "sentry.interfaces.Http",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub http: Option<HttpInterface>,
}

/// Caller-supplied part of an event; everything left `None` is filled by the builder.
#[derive(Debug, Clone, Default)]
pub struct EventFields {
    pub message: String,
    pub level: Option<Level>,
    pub timestamp: Option<String>,
    pub culprit: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub message_interface: Option<MessageInterface>,
    pub exception: Option<ExceptionInterface>,
    pub stacktrace: Option<StacktraceInterface>,
}

impl EventFields {
    /// Fields for a printf-style message.
    pub fn message(template: &str, params: Vec<Value>, level: Level) -> Self {
        let formatted = format_message(template, &params);
        Self {
            message: formatted.clone(),
            level: Some(level),
            message_interface: Some(MessageInterface {
                message: template.to_string(),
                params,
                formatted,
            }),
            ..Default::default()
        }
    }

    /// Fields for an exception. The exception's own trace is returned separately
    /// so the caller can hand it to the builder as the explicit stack.
    pub fn exception(exc: Exception) -> (Self, Option<Stack>) {
        let value = if exc.value.trim().is_empty() {
            UNKNOWN_EXCEPTION.to_string()
        } else {
            exc.value
        };
        let fields = Self {
            message: value.clone(),
            level: Some(Level::Error),
            culprit: exc.location.clone(),
            exception: Some(ExceptionInterface {
                value,
                kind: exc.kind,
                module: exc.location,
            }),
            ..Default::default()
        };
        (fields, exc.stack)
    }

    pub fn tag(mut self, name: &str, value: &str) -> Self {
        self.tags.insert(name.to_string(), value.to_string());
        self
    }
}

/// Stack policy for one capture.
#[derive(Debug)]
pub enum Stack {
    /// Capture only if the client has `auto_log_stacks` on.
    Default,
    /// Capture the current stack regardless of `auto_log_stacks`.
    Capture,
    /// Use a snapshot taken elsewhere (e.g. when the error was created).
    Snapshot(Backtrace),
    /// Use frames that are already formatted.
    Frames(Vec<StackFrame>),
}

/// Error data for [`crate::Client::capture_exception`].
#[derive(Debug)]
pub struct Exception {
    pub value: String,
    pub kind: String,
    /// `file:line` of the error's origin.
    pub location: Option<String>,
    pub stack: Option<Stack>,
}

impl Exception {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: kind.into(),
            location: None,
            stack: None,
        }
    }

    /// Build from any error; the location is the caller of this function.
    #[track_caller]
    pub fn from_error<E: std::error::Error + ?Sized>(err: &E) -> Self {
        let caller = Location::caller();
        Self::new(short_type_name::<E>(), err.to_string())
            .with_location(caller.file(), caller.line())
    }

    pub fn with_location(mut self, file: &str, line: u32) -> Self {
        self.location = Some(format!("{}:{}", file, line));
        self
    }

    pub fn with_backtrace(mut self, backtrace: Backtrace) -> Self {
        self.stack = Some(Stack::Snapshot(backtrace));
        self
    }

    pub fn with_frames(mut self, frames: Vec<StackFrame>) -> Self {
        self.stack = Some(Stack::Frames(frames));
        self
    }
}

fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

/// A stack ready to be formatted: a snapshot plus how many innermost frames to drop.
#[derive(Debug)]
pub enum ResolvedStack {
    Snapshot { backtrace: Backtrace, skip: usize },
    Frames(Vec<StackFrame>),
}

/// Assembles [`Event`]s from caller fields, configuration and request context.
pub struct EventBuilder<'a> {
    pub config: &'a Config,
    pub context: &'a dyn RequestContext,
    pub formatter: &'a dyn StackFormatter,
}

impl EventBuilder<'_> {
    pub fn build(&self, fields: EventFields, stack: Option<ResolvedStack>) -> Event {
        let stacktrace = fields.stacktrace.or_else(|| {
            let frames = match stack? {
                ResolvedStack::Snapshot { backtrace, skip } => {
                    self.formatter.format(&backtrace, skip)
                }
                ResolvedStack::Frames(frames) => frames,
            };
            Some(StacktraceInterface { frames })
        });

        let mut tags = self.config.tags.clone();
        tags.extend(fields.tags);

        Event {
            event_id: generate_event_id(),
            project: self.config.project.clone(),
            site: self.config.site.clone(),
            timestamp: fields
                .timestamp
                .unwrap_or_else(|| format_time(Utc::now())),
            level: fields.level.unwrap_or_default(),
            server_name: self.config.server_name.clone(),
            logger: self.config.logger.clone(),
            message: fields.message,
            culprit: fields.culprit,
            tags,
            message_interface: fields.message_interface,
            exception: fields.exception,
            stacktrace,
            http: Some(HttpInterface::from_context(self.context)),
        }
    }
}
