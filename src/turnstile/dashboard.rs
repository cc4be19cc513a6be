//! Headless dashboard session.
//!
//! [`Dashboard`] is everything the turnstile screen does, minus rendering: it lists a
//! page of turnstiles, keeps it live from the push channel, pages through it, and runs
//! the create/event/delete actions. Presentation subscribes to two read-only feeds:
//! the page [`Snapshot`] and the transient [`Notice`] message.

use crate::client::{ClientConfig, HalClient, PageEvent, Pager};
use crate::error::{describe_error, HalError, Result};
use crate::turnstile::live_view::{LiveView, LiveViewHandle, ReloadDefaults, Snapshot};
use crate::turnstile::notice::Notice;
use crate::turnstile::push::PushChannel;
use crate::turnstile::service::TurnstileApi;
use crate::turnstile::types::{TurnstilePage, TurnstileResource};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// Automatic session reloads after the server refuses the API version.
pub const MAX_VERSION_RELOADS: u32 = 3;

/// A running dashboard session.
pub struct Dashboard {
    api: TurnstileApi,
    view: LiveViewHandle,
    task: Option<JoinHandle<()>>,
    push: Option<PushChannel>,
    pager: Mutex<Pager>,
    notice: Notice,
}

impl Dashboard {
    /// Build a client from `config` and start a session on it.
    pub async fn start(config: ClientConfig) -> Result<Self> {
        Self::start_with_client(HalClient::new(config)?).await
    }

    /// Start a session: connect the push channel, spawn the live view and request the
    /// first page.
    ///
    /// A push channel that cannot be opened is logged and the session runs without
    /// live updates. When the server refuses the API version the payload is shown,
    /// the view is cleared, and the session reloads after `message_clear_delay`, at
    /// most [`MAX_VERSION_RELOADS`] times.
    pub async fn start_with_client(client: HalClient) -> Result<Self> {
        let config = client.config().clone();
        let notice = Notice::new(config.message_clear_delay());

        // The hook fires from inside the root fetch, before the view exists.
        let view_slot: Arc<OnceLock<LiveViewHandle>> = Arc::new(OnceLock::new());
        let hook_notice = notice.clone();
        let hook_view = view_slot.clone();
        let reloads = Arc::new(AtomicU32::new(0));
        let delay = config.message_clear_delay();
        let client = client.with_reload_hook(Arc::new(move |err: &HalError| {
            tracing::error!("Server refused API version: {}", err);
            hook_notice.show(describe_error(err));
            let Some(view) = hook_view.get().cloned() else {
                return;
            };
            view.clear();

            let attempt = reloads.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt > MAX_VERSION_RELOADS {
                tracing::warn!("Giving up after {} version reloads", MAX_VERSION_RELOADS);
                return;
            }
            let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                return;
            };
            // a failed root fetch leaves the cache empty, so the reload fetches it again
            let notice = hook_notice.clone();
            runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                tracing::info!("Reloading session ({}/{})", attempt, MAX_VERSION_RELOADS);
                notice.clear();
                view.reload();
            });
        }));
        let api = TurnstileApi::new(client);

        let (push, updates): (Option<PushChannel>, BoxStream<'static, _>) =
            match api.connect_updates().await {
                Ok((push, updates)) => (Some(push), updates.boxed()),
                Err(e) => {
                    tracing::warn!("Live updates unavailable: {}", e);
                    (None, stream::pending().boxed())
                }
            };

        let defaults = ReloadDefaults {
            size: config.default_page_size,
            sort: config.sort.clone(),
        };
        let (view, task) = LiveView::spawn(Arc::new(api.clone()), updates, defaults);
        let _ = view_slot.set(view.clone());
        view.reload();

        Ok(Dashboard {
            api,
            view,
            task: Some(task),
            push,
            pager: Mutex::new(Pager::from_config(&config)),
            notice,
        })
    }

    /// Typed API the session runs on.
    pub fn api(&self) -> &TurnstileApi {
        &self.api
    }

    /// Handle of the live view.
    pub fn view(&self) -> &LiveViewHandle {
        &self.view
    }

    /// Transient message feed.
    pub fn notice(&self) -> &Notice {
        &self.notice
    }

    /// The push channel, when one could be opened.
    pub fn push(&self) -> Option<&PushChannel> {
        self.push.as_ref()
    }

    /// Latest page snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.view.snapshot()
    }

    /// Receiver notified after every reconciliation step.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.view.subscribe()
    }

    /// Event relations offered for `item`.
    pub fn events<'a>(&self, item: &'a TurnstileResource) -> Vec<&'a str> {
        self.api.events(item)
    }

    /// Create a turnstile, then reload the page whatever the outcome.
    pub async fn create(&self) -> Result<TurnstileResource> {
        let result = self.api.create().await;
        if let Err(e) = &result {
            tracing::debug!("create failed: {}", e);
            self.notice.flash(describe_error(e));
        }
        self.view.reload();
        result
    }

    /// Trigger `event` on `item`.
    ///
    /// The returned turnstile replaces the displayed one and its message is flashed.
    /// On failure the error text is flashed instead.
    pub async fn send_event(&self, item: &TurnstileResource, event: &str) -> Result<TurnstileResource> {
        match self.api.send_event(item, event).await {
            Ok(updated) => {
                match &updated.message {
                    Some(message) => self.notice.flash(message.clone()),
                    None => self.notice.clear(),
                }
                self.view.updated(updated.clone());
                Ok(updated)
            }
            Err(e) => {
                tracing::error!("sendEvent {} on turnstile {} failed: {}", event, item.id, e);
                self.notice.flash(describe_error(&e));
                Err(e)
            }
        }
    }

    /// Delete `item`, then reload the page.
    pub async fn delete(&self, item: &TurnstileResource) -> Result<()> {
        match self.api.delete(item).await {
            Ok(()) => {
                self.view.reload();
                Ok(())
            }
            Err(e) => {
                self.notice.flash(describe_error(&e));
                Err(e)
            }
        }
    }

    /// Serve a pager event. Returns the page now on display, or `None` when nothing
    /// was loaded (no page yet, or the requested page is already shown).
    pub async fn page_event(&self, event: PageEvent) -> Result<Option<TurnstilePage>> {
        let Some(current) = self.view.snapshot().page else {
            self.view.reload();
            return Ok(None);
        };
        let mut pager = self.pager.lock().await;
        match pager.on_page_event(self.api.client(), event, &*current).await {
            Ok(Some(page)) => {
                self.view.show_page(page.clone());
                Ok(Some(page))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                self.notice.flash(describe_error(&e));
                Err(e)
            }
        }
    }

    /// Wait until the view holds a page or reports a load error.
    pub async fn ready(&self) -> Result<Snapshot> {
        self.view
            .wait_for(|s| s.in_flight == 0 && (s.page.is_some() || s.error.is_some()))
            .await
    }

    /// Stop the live view and close the push channel.
    pub async fn shutdown(mut self) {
        if let Some(push) = &self.push {
            push.close();
        }
        if let Some(task) = self.task.take() {
            task.abort();
            match task.await {
                Err(e) if !e.is_cancelled() => {
                    tracing::warn!("Live view task ended abnormally: {}", e);
                }
                _ => {}
            }
        }
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        // the reload hook keeps a view handle alive, so the task must be stopped here
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{HttpTransport, TransportRequest};
    use crate::types::HttpResponse;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    const BASE: &str = "http://dash.test/api";

    /// Answers the root with queued statuses (417 once the queue is empty).
    struct VersionGate {
        root_statuses: Mutex<VecDeque<u16>>,
        root_calls: AtomicUsize,
    }

    impl VersionGate {
        fn new(statuses: &[u16]) -> Arc<Self> {
            Arc::new(VersionGate {
                root_statuses: Mutex::new(statuses.iter().copied().collect()),
                root_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl HttpTransport for VersionGate {
        async fn send(&self, request: TransportRequest) -> Result<HttpResponse> {
            if request.url.starts_with(&format!("{}?", BASE)) {
                self.root_calls.fetch_add(1, Ordering::SeqCst);
                let status = self.root_statuses.lock().pop_front().unwrap_or(417);
                if status != 200 {
                    let body = json!({"error": {"detail": "Client must reload"}});
                    return Ok(HttpResponse::new(status, body.to_string()));
                }
                let root = json!({
                    "_links": {"list": {"href": format!("{}/turnstiles{{?page,size,sort}}", BASE), "templated": true}}
                });
                return Ok(HttpResponse::new(200, root.to_string()));
            }
            let page = json!({
                "page": {"size": 10, "totalElements": 1, "totalPages": 1, "number": 0},
                "_embedded": {"turnstiles": [
                    {"id": 1, "locked": true, "currentState": "LOCKED", "message": null,
                     "_links": {"self": {"href": format!("{}/turnstiles/1", BASE)}}}
                ]},
                "_links": {"self": {"href": format!("{}/turnstiles?page=0&size=10", BASE)}}
            });
            Ok(HttpResponse::new(200, page.to_string()))
        }
    }

    fn client(gate: &Arc<VersionGate>) -> HalClient {
        let config = ClientConfig {
            base_url: BASE.to_string(),
            ws_url: "ws://127.0.0.1:1/ws".to_string(),
            message_clear_delay_ms: 20,
            ..Default::default()
        };
        HalClient::with_transport(config, gate.clone())
    }

    #[tokio::test]
    async fn test_version_refusal_reloads_session() {
        let gate = VersionGate::new(&[417, 200]);
        let dashboard = Dashboard::start_with_client(client(&gate)).await.unwrap();

        let snapshot = dashboard.ready().await.unwrap();
        assert!(snapshot.page.is_none());
        assert_eq!(snapshot.error.as_deref(), Some("Client must reload"));

        let snapshot = tokio::time::timeout(
            Duration::from_secs(5),
            dashboard.view().wait_for(|s| s.page.is_some()),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(snapshot.item(1).map(|t| t.id), Some(1));
        assert!(snapshot.error.is_none());
        assert_eq!(dashboard.notice().current(), None);
        assert_eq!(gate.root_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_version_reloads_are_capped() {
        let gate = VersionGate::new(&[]);
        let dashboard = Dashboard::start_with_client(client(&gate)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        let calls = gate.root_calls.load(Ordering::SeqCst);
        assert_eq!(calls, 1 + MAX_VERSION_RELOADS as usize);
        assert_eq!(dashboard.notice().current().as_deref(), Some("Client must reload"));
        let snapshot = dashboard.snapshot();
        assert!(snapshot.page.is_none());
        assert_eq!(snapshot.error.as_deref(), Some("Client must reload"));
    }
}
