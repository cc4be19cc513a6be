//! HTTP transport seam.
//!
//! The client never talks to `reqwest` directly; it hands a [`TransportRequest`] to an
//! [`HttpTransport`] and gets the full response envelope back. Tests plug in their own
//! transport; production uses [`ReqwestTransport`].

use crate::client::config::ClientConfig;
use crate::error::{HalError, Result};
use crate::types::HttpResponse;
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method};
use std::collections::BTreeMap;

/// One outbound request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP verb.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Headers to send.
    pub headers: HeaderMap,
    /// JSON body, if any.
    pub body: Option<Bytes>,
}

/// Perform one HTTP exchange.
///
/// Implementations return every response they receive, whatever its status.
/// Only a failure to obtain a response at all is an error, reported as
/// [`HalError::Transport`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and return whatever response came back.
    async fn send(&self, request: TransportRequest) -> Result<HttpResponse>;
}

/// [`HttpTransport`] over a shared [`reqwest::Client`].
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport honouring the configured request timeout.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()
            .map_err(|e| HalError::Config(e.to_string()))?;
        Ok(ReqwestTransport { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: reqwest::Client) -> Self {
        ReqwestTransport { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<HttpResponse> {
        let mut req_builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        let response = req_builder
            .send()
            .await
            .map_err(|e| HalError::Transport(e.to_string()))?;

        let status = response.status().as_u16();

        let mut headers = BTreeMap::new();
        for (k, v) in response.headers() {
            if let Ok(val) = v.to_str() {
                headers.insert(k.as_str().to_string(), val.to_string());
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| HalError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
