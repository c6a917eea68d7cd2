//! Ambient request context used to fill `sentry.interfaces.Http`.
//!
//! The event builder never reads globals directly; it asks a [`RequestContext`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read-only view of the request being served when an event is captured.
pub trait RequestContext: Send + Sync {
    fn method(&self) -> Option<String>;
    /// Absolute URL without the query string.
    fn url(&self) -> Option<String>;
    fn query_string(&self) -> String;
    fn data(&self) -> BTreeMap<String, String>;
    fn cookies(&self) -> BTreeMap<String, String>;
    fn headers(&self) -> BTreeMap<String, String>;
    fn env(&self) -> BTreeMap<String, String>;
}

/// `sentry.interfaces.Http` sub-record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpInterface {
    pub method: Option<String>,
    pub url: Option<String>,
    pub query_string: String,
    pub data: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub env: BTreeMap<String, String>,
}

impl HttpInterface {
    pub fn from_context(ctx: &dyn RequestContext) -> Self {
        Self {
            method: ctx.method(),
            url: ctx.url(),
            query_string: ctx.query_string(),
            data: ctx.data(),
            cookies: ctx.cookies(),
            headers: ctx.headers(),
            env: ctx.env(),
        }
    }
}

/// Context for code not serving a request: empty request fields, process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessContext;

impl RequestContext for ProcessContext {
    fn method(&self) -> Option<String> {
        None
    }

    fn url(&self) -> Option<String> {
        None
    }

    fn query_string(&self) -> String {
        String::new()
    }

    fn data(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn cookies(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn headers(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn env(&self) -> BTreeMap<String, String> {
        std::env::vars().collect()
    }
}

/// Owned snapshot of an HTTP request, filled in by the hosting framework.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    method: String,
    scheme: String,
    host: String,
    path: String,
    query: Vec<(String, String)>,
    data: BTreeMap<String, String>,
    cookies: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    env: BTreeMap<String, String>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, scheme: &str, host: &str, path: &str) -> Self {
        Self {
            method: method.into().to_uppercase(),
            scheme: scheme.to_string(),
            host: host.to_string(),
            path: if path.starts_with('/') {
                path.to_string()
            } else {
                format!("/{}", path)
            },
            ..Default::default()
        }
    }

    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    pub fn form(mut self, name: &str, value: &str) -> Self {
        self.data.insert(name.to_string(), value.to_string());
        self
    }

    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn env_var(mut self, name: &str, value: &str) -> Self {
        self.env.insert(name.to_string(), value.to_string());
        self
    }
}

impl RequestContext for HttpRequest {
    fn method(&self) -> Option<String> {
        Some(self.method.clone()).filter(|m| !m.is_empty())
    }

    fn url(&self) -> Option<String> {
        if self.host.is_empty() {
            return None;
        }
        let scheme = if self.scheme.is_empty() {
            "http"
        } else {
            self.scheme.as_str()
        };
        Some(format!("{}://{}{}", scheme, self.host, self.path))
    }

    fn query_string(&self) -> String {
        self.query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    fn data(&self) -> BTreeMap<String, String> {
        self.data.clone()
    }

    fn cookies(&self) -> BTreeMap<String, String> {
        self.cookies.clone()
    }

    fn headers(&self) -> BTreeMap<String, String> {
        self.headers.clone()
    }

    fn env(&self) -> BTreeMap<String, String> {
        self.env.clone()
    }
}
