//! Client configuration: DSN-derived values merged with explicit options.

use crate::dsn::{Dsn, Scheme};
use crate::error::ConfigError;
use crate::helpers::hostname;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_LOGGER: &str = "root";

/// Explicit client options. Anything set here overrides the value parsed from `dsn`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    pub dsn: Option<String>,
    pub servers: Vec<String>,
    pub project: Option<String>,
    pub public_key: Option<String>,
    pub secret_key: Option<String>,
    pub site: Option<String>,
    pub server_name: Option<String>,
    pub logger: Option<String>,
    pub auto_log_stacks: bool,
    pub verify_tls: Option<bool>,
    /// Request timeout in seconds.
    pub timeout: Option<u64>,
    /// Frames to drop at the capture point, counted from the public capture call.
    pub skip_frames: Option<usize>,
    pub tags: BTreeMap<String, String>,
}

/// Validated, immutable client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub servers: Vec<Url>,
    pub project: String,
    pub public_key: String,
    pub secret_key: String,
    pub site: Option<String>,
    pub server_name: String,
    pub logger: String,
    pub auto_log_stacks: bool,
    pub verify_tls: bool,
    pub timeout: Duration,
    pub skip_frames: usize,
    pub tags: BTreeMap<String, String>,
}

impl Config {
    /// Configuration from a DSN alone, with default options.
    pub fn from_dsn(dsn: &str) -> Result<Self, ConfigError> {
        Self::from_options(ClientOptions {
            dsn: Some(dsn.to_string()),
            ..Default::default()
        })
    }

    pub fn from_options(options: ClientOptions) -> Result<Self, ConfigError> {
        let dsn = options.dsn.as_deref().map(Dsn::parse).transpose()?;

        let servers: Vec<String> = if !options.servers.is_empty() {
            options.servers
        } else {
            dsn.iter().map(Dsn::store_url).collect()
        };
        if servers.is_empty() {
            return Err(ConfigError::MissingField("servers"));
        }
        let servers = servers
            .iter()
            .map(|s| parse_server(s))
            .collect::<Result<Vec<_>, _>>()?;

        let project = required(
            options.project,
            dsn.as_ref().map(|d| d.project.clone()),
            "project",
        )?;
        let public_key = required(
            options.public_key,
            dsn.as_ref().map(|d| d.public_key.clone()),
            "public_key",
        )?;
        let secret_key = required(
            options.secret_key,
            dsn.as_ref().map(|d| d.secret_key.clone()),
            "secret_key",
        )?;

        Ok(Self {
            servers,
            project,
            public_key,
            secret_key,
            site: options.site.filter(|s| !s.is_empty()),
            server_name: options
                .server_name
                .filter(|s| !s.is_empty())
                .unwrap_or_else(hostname),
            logger: options
                .logger
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_LOGGER.to_string()),
            auto_log_stacks: options.auto_log_stacks,
            verify_tls: options.verify_tls.unwrap_or(true),
            timeout: Duration::from_secs(options.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            skip_frames: options.skip_frames.unwrap_or(1),
            tags: options.tags,
        })
    }
}

fn required(
    explicit: Option<String>,
    from_dsn: Option<String>,
    field: &'static str,
) -> Result<String, ConfigError> {
    explicit
        .filter(|s| !s.is_empty())
        .or(from_dsn)
        .filter(|s| !s.is_empty())
        .ok_or(ConfigError::MissingField(field))
}

fn parse_server(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidDsn(e.to_string()))?;
    url.scheme().parse::<Scheme>()?;
    if url.host_str().unwrap_or_default().is_empty() {
        return Err(ConfigError::MissingField("host"));
    }
    Ok(url)
}
