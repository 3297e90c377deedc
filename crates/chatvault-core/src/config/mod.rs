//! Runtime configuration for archive runs.
//!
//! Values come from environment variables (the CLI loads `.env` first) and can
//! be overridden by command-line flags. Parsing goes through a lookup closure
//! so it can be exercised without touching the process environment.

use std::env;
use std::fmt;
use std::time::Duration;

use chrono_tz::Tz;

use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

const ENV_ACCESS_TOKEN: &str = "CHATVAULT_ACCESS_TOKEN";
const ENV_GRAPH_BASE_URL: &str = "CHATVAULT_GRAPH_BASE_URL";
const ENV_PAGE_SIZE: &str = "CHATVAULT_PAGE_SIZE";
const ENV_HTTP_TIMEOUT_SECS: &str = "CHATVAULT_HTTP_TIMEOUT_SECS";
const ENV_TIMEZONE: &str = "CHATVAULT_TIMEZONE";

pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Los_Angeles;

/// Graph caps `$top` for chat listings at 50.
const MAX_PAGE_SIZE: u32 = 50;

/// Settings shared by the download and render commands.
#[derive(Clone, PartialEq, Eq)]
pub struct ArchiveConfig {
    /// Bearer token for the Graph API. Only required for downloads.
    pub access_token: Option<String>,
    /// Graph API root, without trailing slash.
    pub graph_base_url: String,
    /// `$top` value for paginated listings.
    pub page_size: u32,
    /// Timeout applied to every HTTP request.
    pub http_timeout: Duration,
    /// Time zone used when rendering message timestamps.
    pub timezone: Tz,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            graph_base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            timezone: DEFAULT_TIMEZONE,
        }
    }
}

impl fmt::Debug for ArchiveConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ArchiveConfig")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("graph_base_url", &self.graph_base_url)
            .field("page_size", &self.page_size)
            .field("http_timeout", &self.http_timeout)
            .field("timezone", &self.timezone)
            .finish()
    }
}

impl ArchiveConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        parse_config(|key| env::var(key).ok())
    }

    /// Replace the access token when `token` is non-empty.
    #[must_use]
    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        if let Some(token) = normalize_text_option(token) {
            self.access_token = Some(token);
        }
        self
    }

    /// The access token, or a configuration error naming the variable to set.
    pub fn require_access_token(&self) -> Result<&str> {
        self.access_token.as_deref().ok_or_else(|| {
            Error::Configuration(format!(
                "an access token is required; set {ENV_ACCESS_TOKEN} or pass --token"
            ))
        })
    }

    /// URL prefix that identifies hosted content referenced from message bodies.
    #[must_use]
    pub fn content_endpoint_prefix(&self) -> String {
        format!("{}/chats/", self.graph_base_url)
    }
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<ArchiveConfig> {
    let defaults = ArchiveConfig::default();

    let access_token = normalize_text_option(lookup(ENV_ACCESS_TOKEN));

    let graph_base_url = match normalize_text_option(lookup(ENV_GRAPH_BASE_URL)) {
        Some(url) if is_http_url(&url) => url.trim_end_matches('/').to_string(),
        Some(_) => {
            return Err(Error::Configuration(format!(
                "{ENV_GRAPH_BASE_URL} must include http:// or https://"
            )))
        }
        None => defaults.graph_base_url,
    };

    let page_size = match normalize_text_option(lookup(ENV_PAGE_SIZE)) {
        Some(raw) => parse_page_size(&raw)?,
        None => defaults.page_size,
    };

    let http_timeout = match normalize_text_option(lookup(ENV_HTTP_TIMEOUT_SECS)) {
        Some(raw) => {
            let secs = raw.parse::<u64>().ok().filter(|secs| *secs > 0).ok_or_else(|| {
                Error::Configuration(format!(
                    "{ENV_HTTP_TIMEOUT_SECS} must be a positive integer, got '{raw}'"
                ))
            })?;
            Duration::from_secs(secs)
        }
        None => defaults.http_timeout,
    };

    let timezone = match normalize_text_option(lookup(ENV_TIMEZONE)) {
        Some(raw) => raw.parse::<Tz>().map_err(|error| {
            Error::Configuration(format!("{ENV_TIMEZONE} is not a valid time zone: {error}"))
        })?,
        None => defaults.timezone,
    };

    Ok(ArchiveConfig {
        access_token,
        graph_base_url,
        page_size,
        http_timeout,
        timezone,
    })
}

fn parse_page_size(raw: &str) -> Result<u32> {
    raw.parse::<u32>()
        .ok()
        .filter(|size| (1..=MAX_PAGE_SIZE).contains(size))
        .ok_or_else(|| {
            Error::Configuration(format!(
                "{ENV_PAGE_SIZE} must be between 1 and {MAX_PAGE_SIZE}, got '{raw}'"
            ))
        })
}
