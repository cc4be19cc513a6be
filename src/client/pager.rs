//! Page navigation.
//!
//! A user page event carries the requested absolute page index and page size. The
//! decision of how to reach that page is pure ([`plan_navigation`]) and follows a
//! fixed tie-break order, so that paging forward or back costs a single relation
//! hop while random access still works:
//!
//! 1. same index as now: stay
//! 2. index `0`: `first`
//! 3. current + 1: `next`
//! 4. current − 1: `prev`
//! 5. `totalPages - 1`: `last`
//! 6. anything else: direct jump with `page` and `size`
//!
//! A changed page size is adopted for subsequent requests before the decision is made.

use crate::client::api::HalClient;
use crate::error::Result;
use crate::types::{PageMetadata, PageRequest, Paged};
use serde::de::DeserializeOwned;

/// A page change requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageEvent {
    /// Requested zero-based page index.
    pub page_index: u32,
    /// Requested page size.
    pub page_size: u32,
}

impl PageEvent {
    /// Event asking for page `page_index` at `page_size` items per page.
    pub fn new(page_index: u32, page_size: u32) -> Self {
        PageEvent {
            page_index,
            page_size,
        }
    }
}

/// How a page event will be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageNavigation {
    /// Requested page is already displayed.
    Stay,
    /// Follow `first`.
    First,
    /// Follow `next`.
    Next,
    /// Follow `prev`.
    Prev,
    /// Follow `last`.
    Last,
    /// Direct request for an arbitrary page.
    Jump(PageRequest),
}

/// Decide how to reach the page requested by `event` from `current`.
pub fn plan_navigation(event: &PageEvent, current: &PageMetadata) -> PageNavigation {
    let requested = event.page_index;
    let number = current.number;
    if requested == number {
        PageNavigation::Stay
    } else if requested == 0 {
        PageNavigation::First
    } else if Some(requested) == number.checked_add(1) {
        PageNavigation::Next
    } else if Some(requested) == number.checked_sub(1) {
        PageNavigation::Prev
    } else if Some(requested) == current.last_index() {
        PageNavigation::Last
    } else {
        PageNavigation::Jump(
            PageRequest::new()
                .with_page(requested)
                .with_size(event.page_size),
        )
    }
}

/// Sparse page request for `current`: its page number, plus size and sort when given.
pub fn to_page_request(current: &PageMetadata, size: Option<u32>, sort: Option<&str>) -> PageRequest {
    PageRequest {
        sort: sort.map(str::to_string),
        size,
        page: Some(current.number),
    }
}

/// Paging state kept between user interactions: chosen size and sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    size: u32,
    sort: Option<String>,
    page_sizes: Vec<u32>,
}

impl Pager {
    /// Pager with an initial page size, sort and the sizes a user may pick from.
    pub fn new(size: u32, sort: Option<String>, page_sizes: Vec<u32>) -> Self {
        Pager {
            size,
            sort,
            page_sizes,
        }
    }

    /// Pager seeded from the client configuration.
    pub fn from_config(config: &crate::client::ClientConfig) -> Self {
        Self::new(
            config.default_page_size,
            config.sort.clone(),
            config.page_sizes.clone(),
        )
    }

    /// Page size used for the next request.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Sort expression, if any.
    pub fn sort(&self) -> Option<&str> {
        self.sort.as_deref()
    }

    /// Page sizes offered to the user.
    pub fn page_sizes(&self) -> &[u32] {
        &self.page_sizes
    }

    /// Sort applied from the next request on.
    pub fn set_sort(&mut self, sort: Option<String>) {
        self.sort = sort;
    }

    /// Request used for relation navigation from `current`.
    pub fn pageable(&self, current: &PageMetadata) -> PageRequest {
        to_page_request(current, Some(self.size), self.sort())
    }

    /// Request for the very first load, before any page is held.
    pub fn initial_request(&self) -> PageRequest {
        PageRequest {
            sort: self.sort.clone(),
            size: Some(self.size),
            page: Some(0),
        }
    }

    /// Adopt the event's page size, then plan the navigation.
    pub fn plan(&mut self, event: &PageEvent, current: &PageMetadata) -> PageNavigation {
        if event.page_size != self.size {
            if !self.page_sizes.is_empty() && !self.page_sizes.contains(&event.page_size) {
                tracing::debug!("Page size {} is not one of the offered sizes", event.page_size);
            }
            self.size = event.page_size;
        }
        match plan_navigation(event, current) {
            PageNavigation::Jump(request) => PageNavigation::Jump(PageRequest {
                sort: self.sort.clone(),
                ..request
            }),
            other => other,
        }
    }

    /// Serve a page event. Returns `None` when the requested page is already shown.
    pub async fn on_page_event<P>(
        &mut self,
        client: &HalClient,
        event: PageEvent,
        current: &P,
    ) -> Result<Option<P>>
    where
        P: Paged + DeserializeOwned,
    {
        let navigation = self.plan(&event, current.page());
        let request = self.pageable(current.page());
        let page = match navigation {
            PageNavigation::Stay => return Ok(None),
            PageNavigation::First => client.first_page(current, Some(&request)).await?,
            PageNavigation::Next => client.next_page(current, Some(&request)).await?,
            PageNavigation::Prev => client.prev_page(current, Some(&request)).await?,
            PageNavigation::Last => client.last_page(current, Some(&request)).await?,
            PageNavigation::Jump(jump) => client.jump_to_page(current, &jump).await?,
        };
        self.adopt(&page);
        Ok(Some(page))
    }

    /// Load the first page, keeping the current size and sort.
    pub async fn first<P: Paged + DeserializeOwned>(&mut self, client: &HalClient, current: &P) -> Result<P> {
        let page = client.first_page(current, Some(&self.pageable(current.page()))).await?;
        self.adopt(&page);
        Ok(page)
    }

    /// Load the next page.
    pub async fn next<P: Paged + DeserializeOwned>(&mut self, client: &HalClient, current: &P) -> Result<P> {
        let page = client.next_page(current, Some(&self.pageable(current.page()))).await?;
        self.adopt(&page);
        Ok(page)
    }

    /// Load the previous page.
    pub async fn prev<P: Paged + DeserializeOwned>(&mut self, client: &HalClient, current: &P) -> Result<P> {
        let page = client.prev_page(current, Some(&self.pageable(current.page()))).await?;
        self.adopt(&page);
        Ok(page)
    }

    /// Load the last page.
    pub async fn last<P: Paged + DeserializeOwned>(&mut self, client: &HalClient, current: &P) -> Result<P> {
        let page = client.last_page(current, Some(&self.pageable(current.page()))).await?;
        self.adopt(&page);
        Ok(page)
    }

    /// Re-read the current page through `self`.
    pub async fn reload<P: Paged + DeserializeOwned>(&mut self, client: &HalClient, current: &P) -> Result<P> {
        let page = client.self_page(current, Some(&self.pageable(current.page()))).await?;
        self.adopt(&page);
        Ok(page)
    }

    /// Take over the size of a page the server returned.
    pub fn adopt<P: Paged>(&mut self, page: &P) {
        if page.page().size > 0 {
            self.size = page.page().size;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(number: u32, total_pages: u32) -> PageMetadata {
        PageMetadata {
            size: 10,
            total_elements: u64::from(total_pages) * 10,
            total_pages,
            number,
        }
    }

    #[test]
    fn test_tie_break_order() {
        let current = meta(3, 10);
        let plan = |index| plan_navigation(&PageEvent::new(index, 10), &current);
        assert_eq!(plan(3), PageNavigation::Stay);
        assert_eq!(plan(4), PageNavigation::Next);
        assert_eq!(plan(2), PageNavigation::Prev);
        assert_eq!(plan(9), PageNavigation::Last);
        assert_eq!(plan(0), PageNavigation::First);
        assert_eq!(
            plan(7),
            PageNavigation::Jump(PageRequest::new().with_page(7).with_size(10))
        );
    }

    #[test]
    fn test_first_beats_prev() {
        // from page 1, index 0 is both `prev` and `first`
        assert_eq!(
            plan_navigation(&PageEvent::new(0, 10), &meta(1, 5)),
            PageNavigation::First
        );
    }

    #[test]
    fn test_next_beats_last() {
        assert_eq!(
            plan_navigation(&PageEvent::new(4, 10), &meta(3, 5)),
            PageNavigation::Next
        );
    }

    #[test]
    fn test_size_change_adopted_first() {
        let mut pager = Pager::new(10, Some("id".to_string()), vec![5, 10, 20]);
        let nav = pager.plan(&PageEvent::new(3, 20), &meta(3, 10));
        assert_eq!(nav, PageNavigation::Stay);
        assert_eq!(pager.size(), 20);

        let nav = pager.plan(&PageEvent::new(6, 20), &meta(3, 10));
        assert_eq!(
            nav,
            PageNavigation::Jump(PageRequest::new().with_page(6).with_size(20).with_sort("id"))
        );
    }

    #[test]
    fn test_pageable() {
        let pager = Pager::new(5, None, vec![5, 10]);
        assert_eq!(
            pager.pageable(&meta(2, 4)),
            PageRequest::new().with_page(2).with_size(5)
        );
        assert_eq!(
            to_page_request(&meta(1, 4), None, Some("id,desc")),
            PageRequest::new().with_page(1).with_sort("id,desc")
        );
    }
}
