//! Client facade: capture entry points that build an event and hand it to the transport.

use crate::config::{ClientOptions, Config};
use crate::context::{ProcessContext, RequestContext};
use crate::error::{DeliveryError, Error};
use crate::event::{Event, EventBuilder, EventFields, Exception, Level, ResolvedStack, Stack};
use crate::stacktrace::{self, DefaultStackFormatter, StackFormatter, StackFrame};
use crate::transport::{deliver, HttpTransport, Transport};
use serde_json::Value;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::sync::Mutex;
use url::Url;

/// Frames between a public capture method and the stack snapshot (`resolve_stack`).
const INTERNAL_FRAMES: usize = 1;

/// Sentry client. Configuration is fixed at construction.
///
/// Every capture method returns the new event id whether or not delivery succeeded.
pub struct Client {
    config: Config,
    transport: Box<dyn Transport>,
    context: Box<dyn RequestContext>,
    formatter: Box<dyn StackFormatter>,
    last_event_id: Mutex<Option<String>>,
}

impl Client {
    /// Create a client from a DSN with default options.
    pub fn new(dsn: &str) -> Result<Self, Error> {
        Self::from_config(Config::from_dsn(dsn)?)
    }

    pub fn from_options(options: ClientOptions) -> Result<Self, Error> {
        Self::from_config(Config::from_options(options)?)
    }

    pub fn from_config(config: Config) -> Result<Self, Error> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self {
            config,
            transport: Box::new(transport),
            context: Box::new(ProcessContext),
            formatter: Box::new(DefaultStackFormatter),
            last_event_id: Mutex::new(None),
        })
    }

    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Box::new(transport);
        self
    }

    /// Replace the request context provider (e.g. with the request being served).
    pub fn with_context(mut self, context: impl RequestContext + 'static) -> Self {
        self.context = Box::new(context);
        self
    }

    pub fn with_formatter(mut self, formatter: impl StackFormatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Id of the most recently captured event, if any.
    pub fn last_event_id(&self) -> Option<String> {
        self.last_event_id
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Capture a printf-style message (`"Hello %s"` with `["world"]`).
    #[inline(never)]
    pub fn capture_message(
        &self,
        template: &str,
        params: Vec<Value>,
        level: Level,
        stack: Stack,
    ) -> String {
        let resolved = self.resolve_stack(stack);
        self.dispatch(EventFields::message(template, params, level), resolved)
    }

    /// Capture an error. Its own trace, if it carries one, is used as the stack.
    #[inline(never)]
    pub fn capture_exception(&self, exception: Exception) -> String {
        let (fields, stack) = EventFields::exception(exception);
        let resolved = self.resolve_stack(stack.unwrap_or(Stack::Default));
        self.dispatch(fields, resolved)
    }

    /// Like [`Client::capture_exception`] with an explicit culprit.
    #[inline(never)]
    pub fn capture_exception_with_culprit(&self, exception: Exception, culprit: &str) -> String {
        let (mut fields, stack) = EventFields::exception(exception);
        fields.culprit = Some(culprit.to_string());
        let resolved = self.resolve_stack(stack.unwrap_or(Stack::Default));
        self.dispatch(fields, resolved)
    }

    /// Capture an event from arbitrary fields.
    #[inline(never)]
    pub fn capture(&self, fields: EventFields, stack: Stack) -> String {
        let resolved = self.resolve_stack(stack);
        self.dispatch(fields, resolved)
    }

    /// Build the event that a capture would send, without sending it.
    pub fn build_event(&self, fields: EventFields, stack: Option<ResolvedStack>) -> Event {
        self.builder().build(fields, stack)
    }

    /// Format a snapshot with this client's stack formatter.
    pub fn format_stack(&self, backtrace: &Backtrace, skip: usize) -> Vec<StackFrame> {
        self.formatter.format(backtrace, skip)
    }

    /// Send `event` to every server, discarding delivery failures.
    ///
    /// Delivery is best-effort: failures are logged at debug level and never returned.
    pub fn send(&self, event: &Event) {
        match self.try_send(event) {
            Ok(outcomes) => {
                for (url, outcome) in outcomes {
                    if let Err(e) = outcome {
                        tracing::debug!(
                            event_id = %event.event_id,
                            server = %url,
                            error = %e,
                            "event delivery failed"
                        );
                    }
                }
            }
            Err(e) => {
                tracing::debug!(event_id = %event.event_id, error = %e, "event encoding failed");
            }
        }
    }

    /// Send `event` to every server and report each outcome.
    pub fn try_send(
        &self,
        event: &Event,
    ) -> Result<Vec<(Url, Result<(), DeliveryError>)>, DeliveryError> {
        deliver(self.transport.as_ref(), &self.config, event)
    }

    #[inline(never)]
    fn resolve_stack(&self, stack: Stack) -> Option<ResolvedStack> {
        // A snapshot taken while backtraces were disabled has no frames.
        let stack = match stack {
            Stack::Snapshot(backtrace) if backtrace.status() != BacktraceStatus::Captured => {
                Stack::Default
            }
            other => other,
        };
        match stack {
            Stack::Default if !self.config.auto_log_stacks => None,
            Stack::Default | Stack::Capture => Some(ResolvedStack::Snapshot {
                backtrace: stacktrace::capture(),
                skip: INTERNAL_FRAMES + self.config.skip_frames,
            }),
            Stack::Snapshot(backtrace) => Some(ResolvedStack::Snapshot { backtrace, skip: 0 }),
            Stack::Frames(frames) => Some(ResolvedStack::Frames(frames)),
        }
    }

    fn dispatch(&self, fields: EventFields, stack: Option<ResolvedStack>) -> String {
        let event = self.builder().build(fields, stack);
        let event_id = event.event_id.clone();
        tracing::trace!(event_id = %event_id, level = %event.level, "captured event");
        self.send(&event);
        *self.last_event_id.lock().unwrap_or_else(|e| e.into_inner()) = Some(event_id.clone());
        event_id
    }

    fn builder(&self) -> EventBuilder<'_> {
        EventBuilder {
            config: &self.config,
            context: self.context.as_ref(),
            formatter: self.formatter.as_ref(),
        }
    }
}
