//! Single-flight cache for the API root resource.
//!
//! The first caller of [`RootCache::get`] starts the root fetch; every caller that
//! arrives while it is pending awaits the same shared future, so concurrent first-time
//! accesses produce exactly one outbound request and all observe the same value or the
//! same error. A successful result is kept for the life of the cache. A failed fetch
//! leaves the slot empty so the next call starts over.
//!
//! ```text
//!   Empty ──get──▶ Pending(shared future) ──ok──▶ Ready(Arc<RootResource>)
//!                        │
//!                        └──err──▶ Empty   (417 also fires the reload hook)
//! ```

use crate::client::pipeline::Pipeline;
use crate::error::{describe_error, HalError, Result};
use crate::protocol::RequestOptions;
use crate::types::RootResource;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::Arc;

/// Callback invoked once per root fetch that fails with HTTP 417.
///
/// It receives the failure so it can surface the server payload before the
/// application restarts its session.
pub type ReloadHook = Arc<dyn Fn(&HalError) + Send + Sync>;

type RootFuture = Shared<BoxFuture<'static, Result<Arc<RootResource>>>>;

enum Slot {
    Empty,
    Pending { generation: u64, future: RootFuture },
    Ready(Arc<RootResource>),
}

/// The default reload hook: log the payload at error level.
pub fn log_reload_hook() -> ReloadHook {
    Arc::new(|err: &HalError| {
        tracing::error!(
            "API version not supported, client must reload: {}",
            describe_error(err)
        );
    })
}

/// Memoized root resource with single-flight fetching.
pub struct RootCache {
    pipeline: Pipeline,
    slot: Mutex<Slot>,
    generation: Mutex<u64>,
    reload_hook: Mutex<ReloadHook>,
}

impl RootCache {
    /// Empty cache; the root is fetched on first use.
    pub fn new(pipeline: Pipeline) -> Self {
        RootCache {
            pipeline,
            slot: Mutex::new(Slot::Empty),
            generation: Mutex::new(0),
            reload_hook: Mutex::new(log_reload_hook()),
        }
    }

    /// Replace the hook fired on a 417 root response.
    pub fn set_reload_hook(&self, hook: ReloadHook) {
        *self.reload_hook.lock() = hook;
    }

    /// The cached root resource, if it has been fetched.
    pub fn cached(&self) -> Option<Arc<RootResource>> {
        match &*self.slot.lock() {
            Slot::Ready(root) => Some(root.clone()),
            _ => None,
        }
    }

    /// Return the root resource, fetching it at most once across concurrent callers.
    pub async fn get(&self) -> Result<Arc<RootResource>> {
        let (generation, future) = {
            let mut slot = self.slot.lock();
            match &*slot {
                Slot::Ready(root) => return Ok(root.clone()),
                Slot::Pending { generation, future } => (*generation, future.clone()),
                Slot::Empty => {
                    let generation = {
                        let mut counter = self.generation.lock();
                        *counter += 1;
                        *counter
                    };
                    let future = self.fetch().boxed().shared();
                    *slot = Slot::Pending {
                        generation,
                        future: future.clone(),
                    };
                    (generation, future)
                }
            }
        };

        let result = future.await;

        let mut slot = self.slot.lock();
        if let Slot::Pending {
            generation: pending, ..
        } = &*slot
        {
            if *pending == generation {
                *slot = match &result {
                    Ok(root) => Slot::Ready(root.clone()),
                    Err(_) => Slot::Empty,
                };
            }
        }
        result
    }

    /// Forget the cached root; the next [`get`](Self::get) fetches again.
    pub fn reset(&self) {
        *self.slot.lock() = Slot::Empty;
    }

    fn fetch(&self) -> impl std::future::Future<Output = Result<Arc<RootResource>>> + Send + 'static {
        let pipeline = self.pipeline.clone();
        let hook = self.reload_hook.lock().clone();
        async move {
            let config = pipeline.config();
            let opts = RequestOptions::new()
                .with_query("requestedVersion", config.requested_version.to_string());
            let base_url = config.base_url.clone();
            match pipeline.get::<RootResource>(&base_url, Some(&opts)).await {
                Ok(root) => {
                    tracing::debug!(
                        "Loaded root resource {} v{} with relations [{}]",
                        root.api_name,
                        root.api_version,
                        root.links.describe()
                    );
                    Ok(Arc::new(root))
                }
                Err(err) => {
                    if err.is_version_mismatch() {
                        hook(&err);
                    }
                    Err(err)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::config::ClientConfig;
    use crate::client::transport::{HttpTransport, TransportRequest};
    use crate::types::HttpResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct SlowRoot {
        calls: AtomicUsize,
        status: u16,
    }

    #[async_trait]
    impl HttpTransport for SlowRoot {
        async fn send(&self, request: TransportRequest) -> Result<HttpResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(request.url.ends_with("?requestedVersion=1"));
            tokio::time::sleep(Duration::from_millis(20)).await;
            let body = if self.status == 200 {
                r#"{"apiVersion": 1, "apiName": "turnstiles", "_links": {"list": {"href": "/api/turnstiles"}}}"#
            } else {
                r#"{"message": "Unsupported version"}"#
            };
            Ok(HttpResponse::new(self.status, body))
        }
    }

    fn cache(status: u16) -> (Arc<RootCache>, Arc<SlowRoot>) {
        let transport = Arc::new(SlowRoot {
            calls: AtomicUsize::new(0),
            status,
        });
        let config = ClientConfig {
            base_url: "http://host/api".to_string(),
            ..Default::default()
        };
        let pipeline = Pipeline::new(transport.clone(), Arc::new(config));
        (Arc::new(RootCache::new(pipeline)), transport)
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let (cache, transport) = cache(200);
        let (a, b, c) = tokio::join!(cache.get(), cache.get(), cache.get());
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
        assert!(a.links.contains("list"));
    }

    #[tokio::test]
    async fn test_cached_value_reused() {
        let (cache, transport) = cache(200);
        let first = cache.get().await.unwrap();
        for _ in 0..5 {
            let again = cache.get().await.unwrap();
            assert_eq!(*again, *first);
        }
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert!(cache.cached().is_some());
    }

    #[tokio::test]
    async fn test_version_mismatch_fires_hook_once_per_fetch() {
        let (cache, transport) = cache(417);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        cache.set_reload_hook(Arc::new(move |err: &HalError| {
            assert!(err.is_version_mismatch());
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let (a, b) = tokio::join!(cache.get(), cache.get());
        assert!(a.unwrap_err().is_version_mismatch());
        assert!(b.unwrap_err().is_version_mismatch());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        // failure is not cached
        assert!(cache.cached().is_none());
        let _ = cache.get().await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }
}
