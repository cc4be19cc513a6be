//! Configuration for the hypermedia API client.
//!
//! # Configuration Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `base_url` | `http://localhost:8080/api` | Root resource URL |
//! | `ws_url` | `ws://localhost:8080/ws` | Push channel URL |
//! | `requested_version` | 1 | Sent as `requestedVersion` on the root fetch |
//! | `request_timeout_ms` | 30000 | Per-request timeout of the default transport |
//! | `enable_logging` | false | Per-request debug logging |
//! | `message_clear_delay_ms` | 5000 | Lifetime of a transient user message |
//! | `default_page_size` | 10 | Page size before the user picks one |
//! | `page_sizes` | `[5, 10, 20, 50]` | Page sizes offered to the user |
//! | `sort` | none | Sort expression sent with page requests |
//!
//! # Examples
//!
//! ```
//! use turnstile_hal::client::ClientConfig;
//!
//! let config = ClientConfig::for_origin("https://turnstiles.example.com");
//! assert_eq!(config.base_url, "https://turnstiles.example.com/api");
//! assert_eq!(config.ws_url, "ws://turnstiles.example.com/ws");
//!
//! let config = ClientConfig {
//!     default_page_size: 20,
//!     ..Default::default()
//! };
//! assert_eq!(config.requested_version, 1);
//! ```

use crate::error::{HalError, Result};
use std::time::Duration;

/// Environment variable holding the application origin.
pub const ENV_ORIGIN: &str = "TURNSTILE_ORIGIN";
/// Environment variable overriding the API root URL.
pub const ENV_API_URL: &str = "TURNSTILE_API_URL";
/// Environment variable overriding the push channel URL.
pub const ENV_WS_URL: &str = "TURNSTILE_WS_URL";
/// Environment variable overriding the default page size.
pub const ENV_PAGE_SIZE: &str = "TURNSTILE_PAGE_SIZE";

/// Configuration for [`HalClient`](crate::client::HalClient) and the dashboard built on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Root resource URL. Relative hrefs are resolved against it.
    pub base_url: String,

    /// WebSocket URL of the push channel.
    pub ws_url: String,

    /// API version requested on the root fetch.
    pub requested_version: u32,

    /// Request timeout in milliseconds.
    ///
    /// Only applies to the default reqwest transport; the client itself never
    /// cancels an in-flight call.
    pub request_timeout_ms: u64,

    /// Enable request logging.
    ///
    /// When enabled, every request is logged at debug level with its method and URL.
    pub enable_logging: bool,

    /// How long a transient user message stays visible, in milliseconds.
    pub message_clear_delay_ms: u64,

    /// Page size used until the user picks another one.
    pub default_page_size: u32,

    /// Page sizes offered to the user.
    pub page_sizes: Vec<u32>,

    /// Sort expression sent with every page request, e.g. `id,asc`.
    pub sort: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: "http://localhost:8080/api".to_string(),
            ws_url: "ws://localhost:8080/ws".to_string(),
            requested_version: 1,
            request_timeout_ms: 30000,
            enable_logging: false,
            message_clear_delay_ms: 5000,
            default_page_size: 10,
            page_sizes: vec![5, 10, 20, 50],
            sort: None,
        }
    }
}

impl ClientConfig {
    /// Derive the API and push URLs from the application origin.
    ///
    /// The API lives at `{origin}/api`; the push channel at `ws://{host}/ws`, whatever
    /// the origin's scheme.
    pub fn for_origin(origin: &str) -> Self {
        let origin = origin.trim_end_matches('/');
        let host = origin
            .strip_prefix("https://")
            .or_else(|| origin.strip_prefix("http://"))
            .unwrap_or(origin);
        ClientConfig {
            base_url: format!("{}/api", origin),
            ws_url: format!("ws://{}/ws", host),
            ..Default::default()
        }
    }

    /// Build a configuration from `TURNSTILE_*` environment variables.
    ///
    /// `TURNSTILE_ORIGIN` seeds both URLs; `TURNSTILE_API_URL` and `TURNSTILE_WS_URL`
    /// override them individually. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match lookup(ENV_ORIGIN) {
            Some(origin) => Self::for_origin(&origin),
            None => Self::default(),
        };
        if let Some(url) = lookup(ENV_API_URL) {
            config.base_url = url;
        }
        if let Some(url) = lookup(ENV_WS_URL) {
            config.ws_url = url;
        }
        if let Some(size) = lookup(ENV_PAGE_SIZE) {
            config.default_page_size = size.trim().parse().map_err(|_| {
                HalError::Config(format!("{} must be a number, got {:?}", ENV_PAGE_SIZE, size))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can drive a client.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url)
            .map_err(|e| HalError::Config(format!("invalid base_url {:?}: {}", self.base_url, e)))?;
        if self.default_page_size == 0 {
            return Err(HalError::Config("default_page_size must be positive".to_string()));
        }
        if self.page_sizes.contains(&0) {
            return Err(HalError::Config("page sizes must be positive".to_string()));
        }
        Ok(())
    }

    /// Request timeout as a [`Duration`].
    #[inline]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Transient message lifetime as a [`Duration`].
    #[inline]
    pub fn message_clear_delay(&self) -> Duration {
        Duration::from_millis(self.message_clear_delay_ms)
    }
}
