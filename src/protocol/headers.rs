//! Standard request headers and per-call request options.
//!
//! Every request carries the same small set of headers:
//!
//! | Header | Value |
//! |--------|-------|
//! | `Access-Control-Allow-Origin` | `*` |
//! | `Access-Control-Allow-Methods` | `GET,POST,OPTIONS,DELETE,PUT` |
//! | `Accept` | `application/json` |
//!
//! Callers add to these through [`RequestOptions`]. Extra headers are appended, so a
//! caller can never silently drop a standard header by reusing its name.
//!
//! ```
//! use turnstile_hal::protocol::{standard_headers, RequestOptions};
//!
//! let opts = RequestOptions::new()
//!     .with_header("x-trace", "abc")
//!     .with_query("requestedVersion", "1");
//! let headers = opts.merge_headers(standard_headers());
//! assert_eq!(headers.get("x-trace").unwrap(), "abc");
//! assert_eq!(headers.get("accept").unwrap(), "application/json");
//! ```

use http::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};

/// Methods advertised in `Access-Control-Allow-Methods`.
pub const ALLOWED_METHODS: &str = "GET,POST,OPTIONS,DELETE,PUT";

/// Media type used for request and response bodies.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Header names used by the client.
pub mod header_names {
    /// Open CORS origin marker.
    pub const ALLOW_ORIGIN: &str = "access-control-allow-origin";
    /// Declared methods.
    pub const ALLOW_METHODS: &str = "access-control-allow-methods";
}

/// Headers sent with every request.
pub fn standard_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(header_names::ALLOW_ORIGIN),
        HeaderValue::from_static("*"),
    );
    headers.insert(
        HeaderName::from_static(header_names::ALLOW_METHODS),
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(ACCEPT, HeaderValue::from_static(JSON_MEDIA_TYPE));
    headers
}

/// Add `Content-Type: application/json` for a request that carries a body.
pub(crate) fn with_json_body(mut headers: HeaderMap) -> HeaderMap {
    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MEDIA_TYPE));
    }
    headers
}

/// Extra request options: additional headers and query pairs.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Headers appended after the standard ones.
    pub headers: HeaderMap,
    /// Query pairs appended to the URL after link expansion.
    pub query: Vec<(String, String)>,
}

impl RequestOptions {
    /// No extra headers or query pairs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header. Invalid names or values are ignored with a warning.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => tracing::warn!("Ignoring invalid request header {:?}", name),
        }
        self
    }

    /// Add a query pair.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Append this option's headers to `base`.
    pub fn merge_headers(&self, mut base: HeaderMap) -> HeaderMap {
        for (name, value) in self.headers.iter() {
            base.append(name.clone(), value.clone());
        }
        base
    }
}
