//! Link resolution and URL building.
//!
//! Two pure steps turn a relation name into a request target:
//!
//! 1. [`resolve_link`] finds the named [`Link`] on a resource, failing fast with
//!    [`HalError::MissingRelation`].
//! 2. [`build_url`] expands the link's template (when it is templated) and appends the
//!    parameters the template did not consume as query parameters.
//!
//! ```
//! use turnstile_hal::protocol::build_url;
//! use turnstile_hal::{Link, Params};
//!
//! let link = Link::templated("/items/{id}");
//! let url = build_url(&link, Some(&Params::new().with("id", 5).with("verbose", true))).unwrap();
//! assert_eq!(url, "/items/5?verbose=true");
//!
//! let url = build_url(&link, Some(&Params::new().with("id", 5))).unwrap();
//! assert_eq!(url, "/items/5");
//! ```

use crate::error::{HalError, Result};
use crate::protocol::template::expand;
use crate::types::{scalar_text, Link, Linked, Params};
use serde_json::Value;
use std::collections::BTreeSet;
use url::form_urlencoded;

/// How leftover parameters treat keys already present in the URL's query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryMerge {
    /// Keep the URL's value, drop the parameter.
    Skip,
    /// Replace the URL's value with the parameter.
    Override,
}

/// Find relation `relation` on `resource`.
pub fn resolve_link<'a, R: Linked + ?Sized>(resource: &'a R, relation: &str) -> Result<&'a Link> {
    resource.links().require(relation)
}

/// Build a concrete URL from a link and optional parameters.
///
/// A templated link requires parameters ([`HalError::MissingParameters`] otherwise).
/// Parameters that are neither template variables nor already present in the URL's
/// query string are appended in the parameter map's iteration order; `null` values
/// are skipped.
pub fn build_url(link: &Link, params: Option<&Params>) -> Result<String> {
    build(link, params, QueryMerge::Skip)
}

/// Like [`build_url`], but parameters replace same-named query values already present
/// in the URL instead of being dropped.
///
/// Used for direct page jumps, where `page=N` must reach the server even when the
/// link already pins a page.
pub fn build_url_overriding(link: &Link, params: Option<&Params>) -> Result<String> {
    build(link, params, QueryMerge::Override)
}

fn build(link: &Link, params: Option<&Params>, mode: QueryMerge) -> Result<String> {
    let (url, consumed) = if link.templated {
        let params = params.ok_or_else(|| HalError::MissingParameters {
            href: link.href.clone(),
        })?;
        let expansion = expand(&link.href, params)?;
        (expansion.url, expansion.variables)
    } else {
        (link.href.clone(), BTreeSet::new())
    };

    let Some(params) = params else {
        return Ok(url);
    };
    let leftover: Vec<(String, String)> = params
        .iter()
        .filter(|(name, _)| !consumed.contains(*name))
        .flat_map(|(name, value)| query_pairs(name, value))
        .collect();

    Ok(match mode {
        QueryMerge::Skip => merge_skipping(&url, leftover),
        QueryMerge::Override => merge_overriding(&url, leftover),
    })
}

/// Append `pairs` to `url`'s query string unconditionally.
pub(crate) fn append_query(url: &str, pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        return url.to_string();
    }
    let parts = UrlParts::split(url);
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    serializer.extend_pairs(pairs.iter());
    parts.join_with_extra(&serializer.finish())
}

fn query_pairs(name: &str, value: &Value) -> Vec<(String, String)> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| (name.to_string(), scalar_text(item)))
            .collect(),
        other => vec![(name.to_string(), scalar_text(other))],
    }
}

fn merge_skipping(url: &str, leftover: Vec<(String, String)>) -> String {
    let parts = UrlParts::split(url);
    let existing: BTreeSet<String> = parts.query_keys();
    let additions: Vec<(String, String)> = leftover
        .into_iter()
        .filter(|(name, _)| !existing.contains(name))
        .collect();
    if additions.is_empty() {
        return url.to_string();
    }
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    serializer.extend_pairs(additions.iter());
    parts.join_with_extra(&serializer.finish())
}

fn merge_overriding(url: &str, leftover: Vec<(String, String)>) -> String {
    if leftover.is_empty() {
        return url.to_string();
    }
    let parts = UrlParts::split(url);
    let replaced: BTreeSet<&str> = leftover.iter().map(|(name, _)| name.as_str()).collect();
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    if let Some(query) = parts.query {
        serializer.extend_pairs(
            form_urlencoded::parse(query.as_bytes()).filter(|(name, _)| !replaced.contains(&**name)),
        );
    }
    serializer.extend_pairs(leftover.iter());
    let query = serializer.finish();

    let mut out = String::with_capacity(url.len() + query.len() + 1);
    out.push_str(parts.path);
    out.push('?');
    out.push_str(&query);
    out.push_str(parts.fragment);
    out
}

/// A URL cut into path, query and fragment without requiring it to be absolute.
struct UrlParts<'a> {
    path: &'a str,
    query: Option<&'a str>,
    fragment: &'a str,
}

impl<'a> UrlParts<'a> {
    fn split(url: &'a str) -> Self {
        let (rest, fragment) = match url.find('#') {
            Some(pos) => (&url[..pos], &url[pos..]),
            None => (url, ""),
        };
        let (path, query) = match rest.find('?') {
            Some(pos) => (&rest[..pos], Some(&rest[pos + 1..])),
            None => (rest, None),
        };
        UrlParts {
            path,
            query,
            fragment,
        }
    }

    fn query_keys(&self) -> BTreeSet<String> {
        self.query
            .map(|query| {
                form_urlencoded::parse(query.as_bytes())
                    .map(|(name, _)| name.into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn join_with_extra(&self, extra: &str) -> String {
        let mut out = String::from(self.path);
        match self.query {
            Some(query) if !query.is_empty() => {
                out.push('?');
                out.push_str(query);
                if !query.ends_with('&') {
                    out.push('&');
                }
            }
            _ => out.push('?'),
        }
        out.push_str(extra);
        out.push_str(self.fragment);
        out
    }
}
