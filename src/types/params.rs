//! Link parameters.

use crate::error::{HalError, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// Named values used to expand a link template and fill its query string.
///
/// Values are JSON scalars, arrays or objects; `null` means "not set" and is skipped
/// everywhere. Iteration order is the key order of the underlying map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Map<String, Value>);

impl Params {
    /// Empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Build parameters from any serializable struct or map.
    ///
    /// ```
    /// use turnstile_hal::{PageRequest, Params};
    ///
    /// let params = Params::from_serializable(&PageRequest::new().with_size(5)).unwrap();
    /// assert_eq!(params.get("size"), Some(&serde_json::json!(5)));
    /// assert!(params.get("page").is_none());
    /// ```
    pub fn from_serializable<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Params(map)),
            Value::Null => Ok(Params::new()),
            other => Err(HalError::Decode(format!(
                "link parameters must be an object, got {}",
                other
            ))),
        }
    }

    /// Value for `name`, treating `null` as absent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|value| !value.is_null())
    }

    /// Iterate over set (non-null) parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Whether no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Params(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Render a scalar parameter value as text. Arrays and objects render as JSON.
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
