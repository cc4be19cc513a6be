//! Raw HTTP response as delivered by a transport.

use bytes::Bytes;
use std::collections::BTreeMap;

/// Status, headers and body of one HTTP exchange.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status code; 0 when no response arrived.
    pub status: u16,
    /// Response headers as received.
    pub headers: BTreeMap<String, String>,
    /// Raw body bytes.
    pub body: Bytes,
}

impl HttpResponse {
    /// Response with no headers.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        HttpResponse {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Add a header, replacing any with the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Header value, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body as UTF-8, if it is valid.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Whether the status is 2xx.
    #[inline]
    pub fn is_success(&self) -> bool {
        crate::client::is_success_status(self.status)
    }
}
