#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Turnstile HAL: a hypermedia client for the turnstile dashboard
//!
//! The server publishes a root resource whose `_links` name every entry point. Nothing
//! else is hard-coded: collections, items and the events an item currently accepts
//! are all reached by relation name.
//!
//! ## Overview
//!
//! The crate is layered bottom-up:
//!
//! 1. **Links and templates** - resolve a relation, expand its RFC 6570 template and
//!    append the parameters the template did not consume
//! 2. **Request pipeline** - standard headers, full-envelope responses, and a strict
//!    split between `2xx` results and [`HttpFailure`]s
//! 3. **Root cache** - the root resource is fetched once per client, with concurrent
//!    first callers sharing a single request
//! 4. **Facade and pager** - verbs by endpoint name, by link or by link name, plus
//!    page navigation with a fixed tie-break order
//! 5. **Live view** - a task that keeps the displayed page consistent with updates
//!    pushed over a WebSocket, re-fetching only what changed
//!
//! ## Error display
//!
//! Every failure is a [`HalError`]. [`describe_error`](error::describe_error) turns it
//! into the line a user should see, preferring problem-detail fields
//! (`detail`, `title`) over generic messages.
//!
//! ## Client Usage
//!
//! ```ignore
//! use turnstile_hal::{ClientConfig, HalClient, PageRequest, Params};
//! use turnstile_hal::turnstile::TurnstilePage;
//!
//! #[tokio::main]
//! async fn main() -> turnstile_hal::Result<()> {
//!     let client = HalClient::new(ClientConfig::for_origin("http://localhost:8080"))?;
//!
//!     let params = Params::from_serializable(&PageRequest::new().with_size(10))?;
//!     let page: TurnstilePage = client.get("list", Some(&params), None).await?;
//!     println!("{} turnstiles", page.page.total_elements);
//!
//!     if page.links.contains("next") {
//!         let next: TurnstilePage = client.next_page(&page, None).await?;
//!         println!("page {}", next.page.number);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Dashboard Usage
//!
//! ```ignore
//! use turnstile_hal::turnstile::Dashboard;
//! use turnstile_hal::ClientConfig;
//!
//! #[tokio::main]
//! async fn main() -> turnstile_hal::Result<()> {
//!     let dashboard = Dashboard::start(ClientConfig::from_env()?).await?;
//!     let mut snapshots = dashboard.subscribe();
//!     while snapshots.changed().await.is_ok() {
//!         let snapshot = snapshots.borrow().clone();
//!         println!("revision {}: {:?}", snapshot.revision, snapshot.page);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Links, pages, parameters and raw responses
//! - **[error]** - Error types and display strings
//! - **[protocol]** - URI templates, URL building and standard headers
//! - **[client]** - Pipeline, root cache, facade and pager
//! - **[turnstile]** - Turnstile service, push channel and live view

pub mod client;
pub mod error;
pub mod protocol;
pub mod turnstile;
pub mod types;

pub use client::{ClientConfig, HalClient, PageEvent, Pager};
pub use error::{HalError, HttpFailure, Result};
pub use protocol::RequestOptions;
pub use types::{
    HttpResponse, Link, Linked, Links, PageMetadata, PageRequest, Paged, PagedResource, Params,
    RootResource,
};
