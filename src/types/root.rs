//! The API entry-point resource.

use crate::types::{Linked, Links};
use serde::{Deserialize, Serialize};

/// Name, version and top-level relations (`list`, `create`, ...) of the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootResource {
    /// API version served.
    #[serde(default)]
    pub api_version: u32,
    /// API name.
    #[serde(default)]
    pub api_name: String,
    /// Top-level relations.
    #[serde(rename = "_links", default)]
    pub links: Links,
}

impl Linked for RootResource {
    fn links(&self) -> &Links {
        &self.links
    }
}
