//! RFC 6570 URI template expansion.
//!
//! Supports every level-4 expression form:
//!
//! | Operator | Example | Result |
//! |----------|---------|--------|
//! | (none) | `{var}` | `value` |
//! | `+` | `{+path}` | `/foo/bar` (reserved characters kept) |
//! | `#` | `{#var}` | `#value` |
//! | `.` | `{.var}` | `.value` |
//! | `/` | `{/var}` | `/value` |
//! | `;` | `{;x,y}` | `;x=1024;y=768` |
//! | `?` | `{?x,y}` | `?x=1024&y=768` |
//! | `&` | `{&x}` | `&x=1024` |
//!
//! Modifiers `:n` (prefix) and `*` (explode) apply per variable. Variables that are
//! missing or `null` expand to nothing.
//!
//! Besides the expanded text, [`expand`] reports every variable name the template
//! mentions, so callers can tell which parameters the template consumed.
//!
//! ```
//! use turnstile_hal::protocol::expand;
//! use turnstile_hal::Params;
//!
//! let params = Params::new().with("page", 2).with("size", 10);
//! let expansion = expand("/turnstiles{?page,size,sort}", &params).unwrap();
//! assert_eq!(expansion.url, "/turnstiles?page=2&size=10");
//! assert!(expansion.variables.contains("sort"));
//! ```

use crate::error::{HalError, Result};
use crate::types::{scalar_text, Params};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Result of expanding a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// The expanded URI.
    pub url: String,
    /// Every variable name mentioned by the template, set or not.
    pub variables: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Simple,
    Reserved,
    Fragment,
    Label,
    Path,
    PathParam,
    Query,
    QueryContinuation,
}

impl Operator {
    fn parse(expression: &str) -> (Operator, &str) {
        let op = match expression.as_bytes().first() {
            Some(b'+') => Operator::Reserved,
            Some(b'#') => Operator::Fragment,
            Some(b'.') => Operator::Label,
            Some(b'/') => Operator::Path,
            Some(b';') => Operator::PathParam,
            Some(b'?') => Operator::Query,
            Some(b'&') => Operator::QueryContinuation,
            _ => return (Operator::Simple, expression),
        };
        (op, &expression[1..])
    }

    fn first(self) -> &'static str {
        match self {
            Operator::Simple | Operator::Reserved => "",
            Operator::Fragment => "#",
            Operator::Label => ".",
            Operator::Path => "/",
            Operator::PathParam => ";",
            Operator::Query => "?",
            Operator::QueryContinuation => "&",
        }
    }

    fn separator(self) -> &'static str {
        match self {
            Operator::Simple | Operator::Reserved | Operator::Fragment => ",",
            Operator::Label => ".",
            Operator::Path => "/",
            Operator::PathParam => ";",
            Operator::Query | Operator::QueryContinuation => "&",
        }
    }

    fn named(self) -> bool {
        matches!(
            self,
            Operator::PathParam | Operator::Query | Operator::QueryContinuation
        )
    }

    fn if_empty(self) -> &'static str {
        match self {
            Operator::Query | Operator::QueryContinuation => "=",
            _ => "",
        }
    }

    fn allow_reserved(self) -> bool {
        matches!(self, Operator::Reserved | Operator::Fragment)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modifier {
    None,
    Prefix(usize),
    Explode,
}

fn expression_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([^{}]*)\}").expect("expression pattern is valid"))
}

/// Expand `template` with `params`.
pub fn expand(template: &str, params: &Params) -> Result<Expansion> {
    let mut url = String::with_capacity(template.len());
    let mut variables = BTreeSet::new();
    let mut last = 0;

    for captures in expression_pattern().captures_iter(template) {
        let whole = captures.get(0).expect("capture 0 is the whole match");
        push_literal(&mut url, &template[last..whole.start()], template)?;
        expand_expression(&mut url, &mut variables, &captures[1], params, template)?;
        last = whole.end();
    }
    push_literal(&mut url, &template[last..], template)?;

    Ok(Expansion { url, variables })
}

fn push_literal(out: &mut String, literal: &str, template: &str) -> Result<()> {
    if literal.contains(['{', '}']) {
        return Err(HalError::InvalidTemplate(format!(
            "unbalanced brace in {}",
            template
        )));
    }
    out.push_str(literal);
    Ok(())
}

fn expand_expression(
    out: &mut String,
    variables: &mut BTreeSet<String>,
    expression: &str,
    params: &Params,
    template: &str,
) -> Result<()> {
    let (op, body) = Operator::parse(expression);
    if body.is_empty() {
        return Err(HalError::InvalidTemplate(format!(
            "empty expression in {}",
            template
        )));
    }

    let mut parts = Vec::new();
    for spec in body.split(',') {
        let (name, modifier) = parse_varspec(spec, template)?;
        variables.insert(name.to_string());
        if let Some(value) = params.get(name) {
            if let Some(part) = expand_variable(op, name, modifier, value) {
                parts.push(part);
            }
        }
    }

    if !parts.is_empty() {
        out.push_str(op.first());
        out.push_str(&parts.join(op.separator()));
    }
    Ok(())
}

fn parse_varspec<'a>(spec: &'a str, template: &str) -> Result<(&'a str, Modifier)> {
    let (name, modifier) = if let Some(name) = spec.strip_suffix('*') {
        (name, Modifier::Explode)
    } else if let Some((name, length)) = spec.split_once(':') {
        let length = length.parse::<usize>().map_err(|_| {
            HalError::InvalidTemplate(format!("bad prefix length in {}", template))
        })?;
        (name, Modifier::Prefix(length))
    } else {
        (spec, Modifier::None)
    };

    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'%'));
    if !valid {
        return Err(HalError::InvalidTemplate(format!(
            "bad variable name '{}' in {}",
            spec, template
        )));
    }
    Ok((name, modifier))
}

fn expand_variable(op: Operator, name: &str, modifier: Modifier, value: &Value) -> Option<String> {
    let reserved = op.allow_reserved();
    match value {
        Value::Null => None,
        Value::Array(items) => {
            let items: Vec<String> = items
                .iter()
                .filter(|item| !item.is_null())
                .map(|item| encode(&scalar_text(item), reserved))
                .collect();
            if items.is_empty() {
                return None;
            }
            if modifier == Modifier::Explode {
                let parts: Vec<String> = items
                    .into_iter()
                    .map(|item| {
                        if op.named() {
                            named_pair(op, name, &item)
                        } else {
                            item
                        }
                    })
                    .collect();
                Some(parts.join(op.separator()))
            } else {
                let joined = items.join(",");
                Some(if op.named() {
                    named_pair(op, name, &joined)
                } else {
                    joined
                })
            }
        }
        Value::Object(entries) => {
            let entries: Vec<(String, String)> = entries
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (encode(k, reserved), encode(&scalar_text(v), reserved)))
                .collect();
            if entries.is_empty() {
                return None;
            }
            if modifier == Modifier::Explode {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| {
                        if op.named() {
                            named_pair(op, k, v)
                        } else {
                            format!("{}={}", k, v)
                        }
                    })
                    .collect();
                Some(parts.join(op.separator()))
            } else {
                let joined = entries
                    .iter()
                    .flat_map(|(k, v)| [k.as_str(), v.as_str()])
                    .collect::<Vec<_>>()
                    .join(",");
                Some(if op.named() {
                    named_pair(op, name, &joined)
                } else {
                    joined
                })
            }
        }
        scalar => {
            let mut text = scalar_text(scalar);
            if let Modifier::Prefix(length) = modifier {
                text = text.chars().take(length).collect();
            }
            let text = encode(&text, reserved);
            Some(if op.named() {
                named_pair(op, name, &text)
            } else {
                text
            })
        }
    }
}

fn named_pair(op: Operator, name: &str, value: &str) -> String {
    if value.is_empty() {
        format!("{}{}", name, op.if_empty())
    } else {
        format!("{}={}", name, value)
    }
}

const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Unreserved plus the RFC 3986 reserved set, for `+` and `#` expansion.
const UNRESERVED_OR_RESERVED: &AsciiSet = &UNRESERVED
    .remove(b':')
    .remove(b'/')
    .remove(b'?')
    .remove(b'#')
    .remove(b'[')
    .remove(b']')
    .remove(b'@')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

fn encode(text: &str, allow_reserved: bool) -> String {
    if !allow_reserved {
        return utf8_percent_encode(text, UNRESERVED).to_string();
    }
    // reserved expansion keeps existing pct-encoded triplets
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('%') {
        let (head, tail) = rest.split_at(pos);
        out.extend(utf8_percent_encode(head, UNRESERVED_OR_RESERVED));
        match tail
            .get(..3)
            .filter(|triplet| triplet.bytes().skip(1).all(|b| b.is_ascii_hexdigit()))
        {
            Some(triplet) => {
                out.push_str(triplet);
                rest = &tail[3..];
            }
            None => {
                out.push_str("%25");
                rest = &tail[1..];
            }
        }
    }
    out.extend(utf8_percent_encode(rest, UNRESERVED_OR_RESERVED));
    out
}
