//! Sentry client library (raven protocol 2.0).
//!
//! Captures messages, errors and panics as events and posts them, signed with
//! the project's secret key, to every store endpoint in the configuration.
//! Delivery is synchronous and best-effort: capture calls always return the
//! event id and never fail because a server was unreachable.

pub mod client;
pub mod config;
pub mod context;
pub mod dsn;
pub mod error;
pub mod event;
pub mod helpers;
pub mod panic;
pub mod signature;
pub mod stacktrace;
pub mod transport;

pub use client::Client;
pub use config::{ClientOptions, Config};
pub use context::{HttpRequest, ProcessContext, RequestContext};
pub use dsn::{Dsn, Scheme};
pub use error::{ConfigError, DeliveryError, Error};
pub use event::{Event, EventFields, Exception, Level, Stack};
pub use helpers::{dsn_from_env, format_message};
pub use stacktrace::{DefaultStackFormatter, StackFormatter, StackFrame};
pub use transport::{HttpTransport, Transport};

/// Library version for the client identifier and diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
