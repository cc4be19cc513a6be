//! Hyperlinks and relation maps.

use crate::error::{HalError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One navigable, possibly parameterized URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Target URI or URI template.
    pub href: String,
    /// Whether `href` is an RFC 6570 template that must be expanded first.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub templated: bool,
}

impl Link {
    /// A plain, non-templated link.
    pub fn new(href: impl Into<String>) -> Self {
        Link {
            href: href.into(),
            templated: false,
        }
    }

    /// A templated link.
    pub fn templated(href: impl Into<String>) -> Self {
        Link {
            href: href.into(),
            templated: true,
        }
    }
}

/// Relation name to [`Link`] mapping, as carried in a resource's `_links` object.
///
/// Relation names are not known statically; they are looked up by whatever string the
/// caller supplies. A missing relation is an error, never an empty result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Links(BTreeMap<String, Link>);

impl Links {
    /// Empty relation map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, relation: impl Into<String>, link: Link) -> Self {
        self.0.insert(relation.into(), link);
        self
    }

    /// Insert or replace a relation.
    pub fn insert(&mut self, relation: impl Into<String>, link: Link) -> Option<Link> {
        self.0.insert(relation.into(), link)
    }

    /// Look up a relation without failing.
    pub fn get(&self, relation: &str) -> Option<&Link> {
        self.0.get(relation)
    }

    /// Whether the relation is present.
    pub fn contains(&self, relation: &str) -> bool {
        self.0.contains_key(relation)
    }

    /// Relation names in sorted order.
    pub fn relations(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of relations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no relation is present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up a relation, failing with [`HalError::MissingRelation`] if absent.
    pub fn require(&self, relation: &str) -> Result<&Link> {
        self.0.get(relation).ok_or_else(|| HalError::MissingRelation {
            relation: relation.to_string(),
            resource: self.describe(),
        })
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        format!(
            "resource with relations [{}]",
            self.relations().collect::<Vec<_>>().join(", ")
        )
    }
}

impl FromIterator<(String, Link)> for Links {
    fn from_iter<I: IntoIterator<Item = (String, Link)>>(iter: I) -> Self {
        Links(iter.into_iter().collect())
    }
}

/// Anything that carries a relation map.
pub trait Linked {
    /// The resource's relations.
    fn links(&self) -> &Links;
}

impl Linked for Links {
    fn links(&self) -> &Links {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_links() {
        let links: Links = serde_json::from_str(
            r#"{"self": {"href": "/a"}, "list": {"href": "/l{?page}", "templated": true}}"#,
        )
        .unwrap();
        assert_eq!(links.len(), 2);
        assert!(!links.require("self").unwrap().templated);
        assert!(links.require("list").unwrap().templated);
    }

    #[test]
    fn test_require_missing_relation() {
        let links = Links::new()
            .with("self", Link::new("/a"))
            .with("list", Link::new("/l"));
        match links.require("archive") {
            Err(HalError::MissingRelation { relation, resource }) => {
                assert_eq!(relation, "archive");
                assert_eq!(resource, "resource with relations [list, self]");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_templated_flag_not_serialized_when_false() {
        let json = serde_json::to_string(&Link::new("/a")).unwrap();
        assert_eq!(json, r#"{"href":"/a"}"#);
    }
}
