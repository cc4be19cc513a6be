//! Hypermedia API client.
//!
//! This module provides everything needed to talk to a HAL-style API:
//!
//! - **Discover endpoints** from a root resource fetched once per client
//! - **Call relations by name** on the root or on any resource in hand
//! - **Classify responses** so that a non-`2xx` answer is never mistaken for success
//! - **Page through collections** with a minimal number of requests
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── api       - HalClient facade
//! ├── config    - Client configuration
//! ├── pager     - Page navigation policy
//! ├── pipeline  - Request/response pipeline
//! ├── root      - Single-flight root resource cache
//! ├── transport - HttpTransport seam and reqwest implementation
//! └── utils     - Status helpers and response decoding
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`HalClient`] | Endpoint-name and link-based request facade |
//! | [`ClientConfig`] | Client configuration options |
//! | [`RootCache`] | Memoized root resource |
//! | [`Pipeline`] | Uniform request execution |
//! | [`Pager`] | Page size/sort state and navigation |
//! | [`HttpTransport`] | Pluggable HTTP exchange |
//!
//! # Examples
//!
//! ## Creating a Client
//!
//! ```
//! use turnstile_hal::client::{ClientConfig, HalClient};
//!
//! let config = ClientConfig {
//!     enable_logging: true,
//!     ..ClientConfig::for_origin("http://localhost:8080")
//! };
//! let client = HalClient::new(config).unwrap();
//! assert_eq!(client.config().base_url, "http://localhost:8080/api");
//! ```
//!
//! ## Planning Page Navigation
//!
//! ```
//! use turnstile_hal::client::{plan_navigation, PageEvent, PageNavigation};
//! use turnstile_hal::PageMetadata;
//!
//! let current = PageMetadata { size: 10, total_elements: 100, total_pages: 10, number: 3 };
//! assert_eq!(plan_navigation(&PageEvent::new(4, 10), &current), PageNavigation::Next);
//! assert_eq!(plan_navigation(&PageEvent::new(9, 10), &current), PageNavigation::Last);
//! ```

mod api;
mod config;
mod pager;
mod pipeline;
mod root;
mod transport;
mod utils;

pub use api::{HalClient, Target};
pub use config::{ClientConfig, ENV_API_URL, ENV_ORIGIN, ENV_PAGE_SIZE, ENV_WS_URL};
pub use pager::{plan_navigation, to_page_request, PageEvent, PageNavigation, Pager};
pub use pipeline::{Pipeline, NO_BODY};
pub use root::{log_reload_hook, ReloadHook, RootCache};
pub use transport::{HttpTransport, ReqwestTransport, TransportRequest};
pub use utils::{decode_response, is_access_denied_status, is_success_status, is_version_mismatch_status};
