//! Paged collections and page requests.

use crate::types::{Linked, Links};
use serde::{Deserialize, Serialize};

/// Position of a page within a larger ordered result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    /// Requested page size.
    pub size: u32,
    /// Number of elements across all pages.
    pub total_elements: u64,
    /// Number of pages.
    pub total_pages: u32,
    /// Zero-based index of this page.
    pub number: u32,
}

impl PageMetadata {
    /// Index of the last page, if there is any page at all.
    pub fn last_index(&self) -> Option<u32> {
        self.total_pages.checked_sub(1)
    }
}

/// Sparse overrides used to compute the next page request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Sort expression, e.g. `id,desc`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    /// Page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    /// Zero-based page index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl PageRequest {
    /// Empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page size.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Set the page index.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the sort expression.
    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }
}

/// A linked resource that also carries page metadata.
pub trait Paged: Linked {
    /// This page's metadata.
    fn page(&self) -> &PageMetadata;
}

/// Generic paged resource: metadata, an embedded collection and relations
/// (`self`, `first`, `next`, `prev`, `last`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PagedResource<E> {
    /// Page metadata.
    pub page: PageMetadata,
    /// Embedded collection. Servers omit `_embedded` for an empty page.
    #[serde(rename = "_embedded", default)]
    pub embedded: E,
    /// Relations.
    #[serde(rename = "_links", default)]
    pub links: Links,
}

impl<E> Linked for PagedResource<E> {
    fn links(&self) -> &Links {
        &self.links
    }
}

impl<E> Paged for PagedResource<E> {
    fn page(&self) -> &PageMetadata {
        &self.page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_skips_unset_fields() {
        let request = PageRequest::new().with_size(10);
        assert_eq!(serde_json::to_string(&request).unwrap(), r#"{"size":10}"#);
    }

    #[test]
    fn test_last_index() {
        let empty = PageMetadata::default();
        assert_eq!(empty.last_index(), None);
        let ten = PageMetadata {
            total_pages: 10,
            ..Default::default()
        };
        assert_eq!(ten.last_index(), Some(9));
    }

    #[test]
    fn test_paged_resource_without_embedded() {
        let page: PagedResource<Vec<u32>> = serde_json::from_str(
            r#"{"page": {"size": 10, "totalElements": 0, "totalPages": 0, "number": 0}}"#,
        )
        .unwrap();
        assert!(page.embedded.is_empty());
        assert!(page.links.is_empty());
        assert_eq!(page.page().size, 10);
    }
}
