//! Turnstile resources as served by the API and the push channel.

use crate::types::{Linked, Links, PagedResource};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lock state reported by the server's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnstileState {
    /// Coins unlock it.
    Locked,
    /// A push locks it again.
    Unlocked,
}

impl fmt::Display for TurnstileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnstileState::Locked => write!(f, "LOCKED"),
            TurnstileState::Unlocked => write!(f, "UNLOCKED"),
        }
    }
}

/// One turnstile with its relations (`self`, `delete` and one per allowed event).
///
/// Push frames use the same shape; `_links` may be absent there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnstileResource {
    /// Server-assigned id.
    pub id: i64,
    /// Whether the arm is locked.
    pub locked: bool,
    /// Transient message from the last event, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// State machine state.
    pub current_state: TurnstileState,
    /// Self, delete and the event relations currently allowed.
    #[serde(rename = "_links", default)]
    pub links: Links,
}

impl TurnstileResource {
    /// Whether `other` describes the same lock identity: equal `locked` flag and state.
    ///
    /// When it does, only the transient message can differ and the held copy's links
    /// are still valid.
    pub fn same_identity(&self, other: &TurnstileResource) -> bool {
        self.locked == other.locked && self.current_state == other.current_state
    }

    /// Event relations offered for this turnstile, in relation-name order.
    pub fn events(&self) -> Vec<&str> {
        self.links
            .relations()
            .filter(|rel| *rel != "self" && *rel != "delete")
            .collect()
    }
}

impl Linked for TurnstileResource {
    fn links(&self) -> &Links {
        &self.links
    }
}

/// The `_embedded` part of a turnstile page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnstileResources {
    /// Turnstiles on the page, in display order.
    #[serde(default)]
    pub turnstiles: Vec<TurnstileResource>,
}

/// One page of turnstiles.
pub type TurnstilePage = PagedResource<TurnstileResources>;

/// Items of a page, empty when the page carries none.
pub fn page_items(page: &TurnstilePage) -> &[TurnstileResource] {
    &page.embedded.turnstiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_resource() {
        let resource: TurnstileResource = serde_json::from_value(json!({
            "id": 1,
            "locked": true,
            "currentState": "LOCKED",
            "_links": {
                "self": {"href": "/api/turnstiles/1"},
                "coin": {"href": "/api/turnstiles/1/coin"},
                "delete": {"href": "/api/turnstiles/1"}
            }
        }))
        .unwrap();
        assert_eq!(resource.current_state, TurnstileState::Locked);
        assert!(resource.message.is_none());
        assert_eq!(resource.events(), vec!["coin"]);
    }

    #[test]
    fn test_push_frame_without_links() {
        let resource: TurnstileResource = serde_json::from_str(
            r#"{"id": 2, "locked": false, "currentState": "UNLOCKED", "message": "Thank you"}"#,
        )
        .unwrap();
        assert!(resource.links.is_empty());
        assert_eq!(resource.message.as_deref(), Some("Thank you"));
    }

    #[test]
    fn test_same_identity_ignores_message() {
        let a: TurnstileResource = serde_json::from_value(
            json!({"id": 1, "locked": true, "currentState": "LOCKED", "message": "a"}),
        )
        .unwrap();
        let mut b = a.clone();
        b.message = Some("b".to_string());
        assert!(a.same_identity(&b));
        b.locked = false;
        assert!(!a.same_identity(&b));
    }

    #[test]
    fn test_empty_page_without_embedded() {
        let page: TurnstilePage = serde_json::from_value(json!({
            "page": {"size": 10, "totalElements": 0, "totalPages": 0, "number": 0},
            "_links": {"self": {"href": "/api/turnstiles?page=0&size=10"}}
        }))
        .unwrap();
        assert!(page_items(&page).is_empty());
        assert_eq!(page.page.last_index(), None);
    }
}
