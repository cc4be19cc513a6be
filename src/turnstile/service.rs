//! Turnstile operations on top of [`HalClient`].

use crate::client::{HalClient, NO_BODY};
use crate::error::Result;
use crate::turnstile::push::{PushChannel, UpdateStream};
use crate::turnstile::types::{TurnstilePage, TurnstileResource};
use crate::types::{PageRequest, Params};
use async_trait::async_trait;
use serde::de::IgnoredAny;

/// Root relation listing turnstiles.
pub const LIST_RELATION: &str = "list";
/// Root relation creating a turnstile.
pub const CREATE_RELATION: &str = "create";
/// Item relation removing a turnstile.
pub const DELETE_RELATION: &str = "delete";
/// Item relation reading a turnstile.
pub const SELF_RELATION: &str = "self";

/// What the live view needs to re-read state from the server.
#[async_trait]
pub trait TurnstileSource: Send + Sync {
    /// Load a page of turnstiles.
    async fn reload(&self, request: PageRequest) -> Result<TurnstilePage>;
    /// Re-read one turnstile.
    async fn refresh(&self, item: TurnstileResource) -> Result<TurnstileResource>;
}

/// Turnstile API service.
#[derive(Clone)]
pub struct TurnstileApi {
    client: HalClient,
}

impl TurnstileApi {
    /// Turnstile operations over `client`.
    pub fn new(client: HalClient) -> Self {
        TurnstileApi { client }
    }

    /// The underlying HAL client.
    pub fn client(&self) -> &HalClient {
        &self.client
    }

    /// GET the `list` relation with `request` as paging parameters.
    pub async fn list(&self, request: &PageRequest) -> Result<TurnstilePage> {
        let params = Params::from_serializable(request)?;
        self.client.get(LIST_RELATION, Some(&params), None).await
    }

    /// POST to the `create` relation with no body.
    pub async fn create(&self) -> Result<TurnstileResource> {
        self.client.post(CREATE_RELATION, None, NO_BODY, None).await
    }

    /// GET the item's `self` relation.
    pub async fn get(&self, item: &TurnstileResource) -> Result<TurnstileResource> {
        self.client
            .get_by_link_name(item, SELF_RELATION, None, None)
            .await
    }

    /// POST to the relation named `event` (e.g. `coin`, `push`, `lock`).
    pub async fn send_event(&self, item: &TurnstileResource, event: &str) -> Result<TurnstileResource> {
        self.client
            .post_by_link_name(item, event, None, NO_BODY, None)
            .await
    }

    /// DELETE the item's `delete` relation.
    pub async fn delete(&self, item: &TurnstileResource) -> Result<()> {
        let _: IgnoredAny = self
            .client
            .delete_by_link_name(item, DELETE_RELATION, None, None)
            .await?;
        Ok(())
    }

    /// Event relations the item currently offers.
    pub fn events<'a>(&self, item: &'a TurnstileResource) -> Vec<&'a str> {
        item.events()
    }

    /// Open the push channel at the configured `ws_url`.
    pub async fn connect_updates(&self) -> Result<(PushChannel, UpdateStream)> {
        PushChannel::connect(&self.client.config().ws_url).await
    }
}

#[async_trait]
impl TurnstileSource for TurnstileApi {
    async fn reload(&self, request: PageRequest) -> Result<TurnstilePage> {
        self.list(&request).await
    }

    async fn refresh(&self, item: TurnstileResource) -> Result<TurnstileResource> {
        self.get(&item).await
    }
}
