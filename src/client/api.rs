//! Endpoint-name facade over the root cache, link resolver and pipeline.
//!
//! Every verb comes in three forms:
//!
//! | Form | Example | Resolution |
//! |------|---------|------------|
//! | endpoint name | [`HalClient::get`] | root resource relation, then link |
//! | link | [`HalClient::get_by_link`] | none |
//! | link name | [`HalClient::get_by_link_name`] | relation on a resource you already hold |
//!
//! The endpoint-name form is defined entirely in terms of the link form.

use crate::client::config::ClientConfig;
use crate::client::pipeline::{Pipeline, NO_BODY};
use crate::client::root::{ReloadHook, RootCache};
use crate::client::transport::{HttpTransport, ReqwestTransport};
use crate::error::Result;
use crate::protocol::{build_url, build_url_overriding, resolve_link, RequestOptions};
use crate::types::{Link, Linked, PageRequest, Paged, Params, RootResource};
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Where a request goes: a root relation name or a link already in hand.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// Relation on the root resource.
    Endpoint(&'a str),
    /// Fully known link.
    Link(&'a Link),
}

impl<'a> From<&'a str> for Target<'a> {
    fn from(name: &'a str) -> Self {
        Target::Endpoint(name)
    }
}

impl<'a> From<&'a Link> for Target<'a> {
    fn from(link: &'a Link) -> Self {
        Target::Link(link)
    }
}

/// Hypermedia API client.
///
/// Cloning is cheap and clones share the root cache.
///
/// # Example
///
/// ```ignore
/// use turnstile_hal::{ClientConfig, HalClient, PageRequest, Params};
/// use turnstile_hal::turnstile::TurnstilePage;
///
/// let client = HalClient::new(ClientConfig::default())?;
/// let params = Params::from_serializable(&PageRequest::new().with_size(10))?;
/// let page: TurnstilePage = client.get("list", Some(&params), None).await?;
/// let next: TurnstilePage = client.next_page(&page, None).await?;
/// ```
#[derive(Clone)]
pub struct HalClient {
    pipeline: Pipeline,
    root: Arc<RootCache>,
    config: Arc<ClientConfig>,
}

impl HalClient {
    /// Create a client using the reqwest transport.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over a custom transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let config = Arc::new(config);
        let pipeline = Pipeline::new(transport, config.clone());
        HalClient {
            root: Arc::new(RootCache::new(pipeline.clone())),
            pipeline,
            config,
        }
    }

    /// Install the hook fired when the root fetch answers 417.
    pub fn with_reload_hook(self, hook: ReloadHook) -> Self {
        self.root.set_reload_hook(hook);
        self
    }

    /// Configuration the client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The request pipeline shared with the root cache.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// The root resource, fetched once and shared.
    pub async fn root(&self) -> Result<Arc<RootResource>> {
        self.root.get().await
    }

    /// Drop the cached root resource.
    pub fn reset_root(&self) {
        self.root.reset();
    }

    /// URL for a root relation.
    pub async fn url(&self, endpoint: &str, params: Option<&Params>) -> Result<String> {
        let root = self.root().await?;
        build_url(resolve_link(&*root, endpoint)?, params)
    }

    /// Resolve `target`, build its URL and perform the request.
    pub async fn request<B, R>(
        &self,
        method: Method,
        target: Target<'_>,
        params: Option<&Params>,
        body: Option<&B>,
        opts: Option<&RequestOptions>,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = match target {
            Target::Endpoint(name) => self.url(name, params).await?,
            Target::Link(link) => build_url(link, params)?,
        };
        self.pipeline.execute(method, &url, body, opts).await
    }

    // by endpoint name

    /// GET the endpoint named in the root resource.
    pub async fn get<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Option<&Params>,
        opts: Option<&RequestOptions>,
    ) -> Result<R> {
        self.request(Method::GET, Target::Endpoint(endpoint), params, NO_BODY, opts)
            .await
    }

    /// POST `body` to the endpoint named in the root resource.
    pub async fn post<B, R>(
        &self,
        endpoint: &str,
        params: Option<&Params>,
        body: Option<&B>,
        opts: Option<&RequestOptions>,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.request(Method::POST, Target::Endpoint(endpoint), params, body, opts)
            .await
    }

    /// PUT `body` to the endpoint named in the root resource.
    pub async fn put<B, R>(
        &self,
        endpoint: &str,
        params: Option<&Params>,
        body: Option<&B>,
        opts: Option<&RequestOptions>,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.request(Method::PUT, Target::Endpoint(endpoint), params, body, opts)
            .await
    }

    /// PATCH the endpoint named in the root resource with `body`.
    pub async fn patch<B, R>(
        &self,
        endpoint: &str,
        params: Option<&Params>,
        body: Option<&B>,
        opts: Option<&RequestOptions>,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.request(Method::PATCH, Target::Endpoint(endpoint), params, body, opts)
            .await
    }

    /// DELETE the endpoint named in the root resource.
    pub async fn delete<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Option<&Params>,
        opts: Option<&RequestOptions>,
    ) -> Result<R> {
        self.request(Method::DELETE, Target::Endpoint(endpoint), params, NO_BODY, opts)
            .await
    }

    // by link

    /// GET the target of `link`, expanding it with `params`.
    pub async fn get_by_link<R: DeserializeOwned>(
        &self,
        link: &Link,
        params: Option<&Params>,
        opts: Option<&RequestOptions>,
    ) -> Result<R> {
        self.request(Method::GET, Target::Link(link), params, NO_BODY, opts)
            .await
    }

    /// POST `body` to the target of `link`.
    pub async fn post_by_link<B, R>(
        &self,
        link: &Link,
        params: Option<&Params>,
        body: Option<&B>,
        opts: Option<&RequestOptions>,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.request(Method::POST, Target::Link(link), params, body, opts)
            .await
    }

    /// PUT `body` to the target of `link`.
    pub async fn put_by_link<B, R>(
        &self,
        link: &Link,
        params: Option<&Params>,
        body: Option<&B>,
        opts: Option<&RequestOptions>,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.request(Method::PUT, Target::Link(link), params, body, opts)
            .await
    }

    /// PATCH the target of `link` with `body`.
    pub async fn patch_by_link<B, R>(
        &self,
        link: &Link,
        params: Option<&Params>,
        body: Option<&B>,
        opts: Option<&RequestOptions>,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.request(Method::PATCH, Target::Link(link), params, body, opts)
            .await
    }

    /// DELETE the target of `link`.
    pub async fn delete_by_link<R: DeserializeOwned>(
        &self,
        link: &Link,
        params: Option<&Params>,
        opts: Option<&RequestOptions>,
    ) -> Result<R> {
        self.request(Method::DELETE, Target::Link(link), params, NO_BODY, opts)
            .await
    }

    // by link name on a resource in hand

    /// GET the relation `name` of `resource`.
    ///
    /// Fails with [`HalError::MissingRelation`] when the resource does not offer it.
    pub async fn get_by_link_name<L, R>(
        &self,
        resource: &L,
        relation: &str,
        params: Option<&Params>,
        opts: Option<&RequestOptions>,
    ) -> Result<R>
    where
        L: Linked + ?Sized,
        R: DeserializeOwned,
    {
        self.get_by_link(resolve_link(resource, relation)?, params, opts)
            .await
    }

    /// POST `body` to the relation `name` of `resource`.
    pub async fn post_by_link_name<L, B, R>(
        &self,
        resource: &L,
        relation: &str,
        params: Option<&Params>,
        body: Option<&B>,
        opts: Option<&RequestOptions>,
    ) -> Result<R>
    where
        L: Linked + ?Sized,
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.post_by_link(resolve_link(resource, relation)?, params, body, opts)
            .await
    }

    /// PUT `body` to the relation `name` of `resource`.
    pub async fn put_by_link_name<L, B, R>(
        &self,
        resource: &L,
        relation: &str,
        params: Option<&Params>,
        body: Option<&B>,
        opts: Option<&RequestOptions>,
    ) -> Result<R>
    where
        L: Linked + ?Sized,
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.put_by_link(resolve_link(resource, relation)?, params, body, opts)
            .await
    }

    /// PATCH the relation `name` of `resource` with `body`.
    pub async fn patch_by_link_name<L, B, R>(
        &self,
        resource: &L,
        relation: &str,
        params: Option<&Params>,
        body: Option<&B>,
        opts: Option<&RequestOptions>,
    ) -> Result<R>
    where
        L: Linked + ?Sized,
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.patch_by_link(resolve_link(resource, relation)?, params, body, opts)
            .await
    }

    /// DELETE the relation `name` of `resource`.
    pub async fn delete_by_link_name<L, R>(
        &self,
        resource: &L,
        relation: &str,
        params: Option<&Params>,
        opts: Option<&RequestOptions>,
    ) -> Result<R>
    where
        L: Linked + ?Sized,
        R: DeserializeOwned,
    {
        self.delete_by_link(resolve_link(resource, relation)?, params, opts)
            .await
    }

    // navigation

    /// Re-read a resource through its `self` relation.
    pub async fn self_resource<T>(&self, resource: &T) -> Result<T>
    where
        T: Linked + DeserializeOwned,
    {
        self.get_by_link_name(resource, "self", None, None).await
    }

    /// Re-read the current page, optionally with new paging parameters.
    pub async fn self_page<P>(&self, page: &P, request: Option<&PageRequest>) -> Result<P>
    where
        P: Paged + DeserializeOwned,
    {
        self.navigate(page, "self", request).await
    }

    /// Follow the page's `first` relation.
    pub async fn first_page<P>(&self, page: &P, request: Option<&PageRequest>) -> Result<P>
    where
        P: Paged + DeserializeOwned,
    {
        self.navigate(page, "first", request).await
    }

    /// Follow the page's `next` relation.
    pub async fn next_page<P>(&self, page: &P, request: Option<&PageRequest>) -> Result<P>
    where
        P: Paged + DeserializeOwned,
    {
        self.navigate(page, "next", request).await
    }

    /// Follow the page's `prev` relation.
    pub async fn prev_page<P>(&self, page: &P, request: Option<&PageRequest>) -> Result<P>
    where
        P: Paged + DeserializeOwned,
    {
        self.navigate(page, "prev", request).await
    }

    /// Follow the page's `last` relation.
    pub async fn last_page<P>(&self, page: &P, request: Option<&PageRequest>) -> Result<P>
    where
        P: Paged + DeserializeOwned,
    {
        self.navigate(page, "last", request).await
    }

    /// Load page `request.page` directly from the `self` link, replacing any paging
    /// values the link already carries.
    pub async fn jump_to_page<P>(&self, page: &P, request: &PageRequest) -> Result<P>
    where
        P: Paged + DeserializeOwned,
    {
        let params = Params::from_serializable(request)?;
        let url = build_url_overriding(resolve_link(page, "self")?, Some(&params))?;
        self.pipeline.get(&url, None).await
    }

    async fn navigate<P>(&self, page: &P, relation: &str, request: Option<&PageRequest>) -> Result<P>
    where
        P: Paged + DeserializeOwned,
    {
        let params = request.map(Params::from_serializable).transpose()?;
        self.get_by_link_name(page, relation, params.as_ref(), None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transport::TransportRequest;
    use crate::error::HalError;
    use crate::types::{HttpResponse, Links, PagedResource};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    struct Routes {
        seen: Mutex<Vec<(Method, String)>>,
    }

    #[async_trait]
    impl HttpTransport for Routes {
        async fn send(&self, request: TransportRequest) -> Result<HttpResponse> {
            self.seen
                .lock()
                .push((request.method.clone(), request.url.clone()));
            let body = if request.url.starts_with("http://host/api?") {
                json!({
                    "apiVersion": 1,
                    "apiName": "test",
                    "_links": {
                        "list": {"href": "http://host/api/items{?page,size,sort}", "templated": true},
                        "item": {"href": "http://host/api/items/{id}", "templated": true}
                    }
                })
            } else {
                json!({"url": request.url})
            };
            Ok(HttpResponse::new(200, body.to_string()))
        }
    }

    fn client() -> (HalClient, Arc<Routes>) {
        let routes = Arc::new(Routes {
            seen: Mutex::new(Vec::new()),
        });
        let config = ClientConfig {
            base_url: "http://host/api".to_string(),
            ..Default::default()
        };
        (HalClient::with_transport(config, routes.clone()), routes)
    }

    #[tokio::test]
    async fn test_endpoint_name_resolves_through_root() {
        let (client, routes) = client();
        let params = Params::new().with("id", 7).with("verbose", true);
        let value: Value = client.get("item", Some(&params), None).await.unwrap();
        assert_eq!(value["url"], "http://host/api/items/7?verbose=true");

        let value: Value = client
            .post("list", Some(&Params::new().with("size", 5)), NO_BODY, None)
            .await
            .unwrap();
        assert_eq!(value["url"], "http://host/api/items?size=5");

        // one root fetch for both calls
        let seen = routes.seen.lock();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2].0, Method::POST);
    }

    #[tokio::test]
    async fn test_missing_relation_makes_no_call() {
        let (client, routes) = client();
        let resource = Links::new()
            .with("self", Link::new("/s"))
            .with("list", Link::new("/l"));
        let err = client
            .get_by_link_name::<_, Value>(&resource, "archive", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, HalError::MissingRelation { .. }));
        assert!(routes.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_endpoint_is_missing_relation() {
        let (client, _) = client();
        let err = client.get::<Value>("archive", None, None).await.unwrap_err();
        assert!(matches!(err, HalError::MissingRelation { .. }));
    }

    #[tokio::test]
    async fn test_jump_overrides_page() {
        let (client, routes) = client();
        let page: PagedResource<Value> = PagedResource {
            links: Links::new().with("self", Link::new("http://host/api/items?page=3&size=10")),
            ..Default::default()
        };
        let request = PageRequest::new().with_page(7).with_size(10);
        // the reply is not a page; only the URL matters here
        let _ = client
            .jump_to_page::<PagedResource<Value>>(&page, &request)
            .await;
        assert_eq!(
            routes.seen.lock()[0].1,
            "http://host/api/items?page=7&size=10"
        );
    }
}
