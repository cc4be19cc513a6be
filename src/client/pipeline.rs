//! Uniform request/response pipeline.
//!
//! Every HTTP call made by the client goes through [`Pipeline::execute`]:
//!
//! 1. The URL is resolved against the configured `base_url` and option query pairs
//!    are appended.
//! 2. Standard headers are sent, followed by the caller's extra headers.
//! 3. The full response envelope is read, whatever the status.
//! 4. `2xx` bodies decode into the caller's type; anything else is
//!    [`HalError::Http`](crate::HalError::Http) carrying status and body.

use crate::client::config::ClientConfig;
use crate::client::transport::{HttpTransport, TransportRequest};
use crate::client::utils::decode_response;
use crate::error::{HalError, Result};
use crate::protocol::{append_query, standard_headers, with_json_body, RequestOptions};
use bytes::Bytes;
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Body argument for calls that send none.
pub const NO_BODY: Option<&'static ()> = None;

/// Shared HTTP pipeline. Cloning is cheap.
#[derive(Clone)]
pub struct Pipeline {
    transport: Arc<dyn HttpTransport>,
    config: Arc<ClientConfig>,
}

impl Pipeline {
    /// Pipeline sending through `transport`.
    pub fn new(transport: Arc<dyn HttpTransport>, config: Arc<ClientConfig>) -> Self {
        Pipeline { transport, config }
    }

    /// Configuration shared with the client.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET `url`.
    pub async fn get<R: DeserializeOwned>(&self, url: &str, opts: Option<&RequestOptions>) -> Result<R> {
        self.execute(Method::GET, url, NO_BODY, opts).await
    }

    /// POST `body` (if any) to `url`.
    pub async fn post<B, R>(&self, url: &str, body: Option<&B>, opts: Option<&RequestOptions>) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.execute(Method::POST, url, body, opts).await
    }

    /// PUT `body` (if any) to `url`.
    pub async fn put<B, R>(&self, url: &str, body: Option<&B>, opts: Option<&RequestOptions>) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.execute(Method::PUT, url, body, opts).await
    }

    /// PATCH `url` with `body` (if any).
    pub async fn patch<B, R>(&self, url: &str, body: Option<&B>, opts: Option<&RequestOptions>) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.execute(Method::PATCH, url, body, opts).await
    }

    /// DELETE `url`.
    pub async fn delete<R: DeserializeOwned>(&self, url: &str, opts: Option<&RequestOptions>) -> Result<R> {
        self.execute(Method::DELETE, url, NO_BODY, opts).await
    }

    /// Perform one request and classify its response.
    pub async fn execute<B, R>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        opts: Option<&RequestOptions>,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut url = self.absolute_url(url)?;
        let mut headers = standard_headers();
        if let Some(opts) = opts {
            url = append_query(&url, &opts.query);
            headers = opts.merge_headers(headers);
        }
        let body = match body {
            Some(body) => {
                headers = with_json_body(headers);
                Some(Bytes::from(serde_json::to_vec(body)?))
            }
            None => None,
        };

        if self.config.enable_logging {
            tracing::debug!("{} {}", method, url);
        }

        let request = TransportRequest {
            method: method.clone(),
            url,
            headers,
            body,
        };
        let url_for_log = request.url.clone();
        let response = self.transport.send(request).await.inspect_err(|e| {
            tracing::error!("{} {} failed: {}", method, url_for_log, e);
        })?;

        if !response.is_success() {
            tracing::warn!("{} {} returned {}", method, url_for_log, response.status);
        }
        decode_response(&response)
    }

    /// Resolve `href` against the configured base URL.
    pub fn absolute_url(&self, href: &str) -> Result<String> {
        let base = url::Url::parse(&self.config.base_url)
            .map_err(|e| HalError::Config(format!("invalid base_url: {}", e)))?;
        base.join(href)
            .map(String::from)
            .map_err(|e| HalError::InvalidTemplate(format!("cannot resolve {:?}: {}", href, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HttpResponse;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    #[derive(Default)]
    struct Recorder {
        requests: Mutex<Vec<TransportRequest>>,
        reply: Mutex<Option<HttpResponse>>,
    }

    #[async_trait]
    impl HttpTransport for Recorder {
        async fn send(&self, request: TransportRequest) -> Result<HttpResponse> {
            self.requests.lock().push(request);
            self.reply
                .lock()
                .clone()
                .ok_or_else(|| HalError::Transport("connection refused".to_string()))
        }
    }

    fn pipeline(reply: Option<HttpResponse>) -> (Pipeline, Arc<Recorder>) {
        let recorder = Arc::new(Recorder {
            requests: Mutex::new(Vec::new()),
            reply: Mutex::new(reply),
        });
        let config = ClientConfig {
            base_url: "http://host/api".to_string(),
            ..Default::default()
        };
        (Pipeline::new(recorder.clone(), Arc::new(config)), recorder)
    }

    #[tokio::test]
    async fn test_relative_url_and_standard_headers() {
        let (pipeline, recorder) = pipeline(Some(HttpResponse::new(200, r#"{"ok": true}"#)));
        let opts = RequestOptions::new().with_header("x-extra", "1");
        let value: Value = pipeline.get("/api/turnstiles", Some(&opts)).await.unwrap();
        assert_eq!(value, json!({"ok": true}));

        let requests = recorder.requests.lock();
        assert_eq!(requests[0].url, "http://host/api/turnstiles");
        assert_eq!(requests[0].headers.get("accept").unwrap(), "application/json");
        assert_eq!(requests[0].headers.get("x-extra").unwrap(), "1");
        assert!(requests[0].body.is_none());
    }

    #[tokio::test]
    async fn test_json_body_sent() {
        let (pipeline, recorder) = pipeline(Some(HttpResponse::new(201, "")));
        let _: () = pipeline
            .post("http://host/api/t", Some(&json!({"a": 1})), None)
            .await
            .unwrap();
        let requests = recorder.requests.lock();
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].body.as_deref(), Some(&b"{\"a\":1}"[..]));
        assert_eq!(requests[0].headers.get("content-type").unwrap(), "application/json");
    }

    #[tokio::test]
    async fn test_non_success_is_http_failure() {
        let (pipeline, _) = pipeline(Some(HttpResponse::new(404, r#"{"id": 3}"#)));
        let err = pipeline.get::<Value>("/x", None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let (pipeline, _) = pipeline(None);
        let err = pipeline.delete::<()>("/x", None).await.unwrap_err();
        assert!(matches!(err, HalError::Transport(_)));
    }

    #[tokio::test]
    async fn test_option_query_appended() {
        let (pipeline, recorder) = pipeline(Some(HttpResponse::new(200, "{}")));
        let opts = RequestOptions::new().with_query("requestedVersion", "1");
        let _: Value = pipeline.get("http://host/api", Some(&opts)).await.unwrap();
        assert_eq!(
            recorder.requests.lock()[0].url,
            "http://host/api?requestedVersion=1"
        );
    }
}
