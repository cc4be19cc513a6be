//! Reconciliation policy for push updates.
//!
//! Given the page on display and one pushed turnstile, decide the cheapest action
//! that keeps the page consistent:
//!
//! | Held item | Identity (`locked`, `currentState`) | Action |
//! |-----------|-------------------------------------|--------|
//! | found | unchanged | patch the message in place, no request |
//! | found | changed | re-fetch the item through its `self` link |
//! | absent | - | reload the whole page |

use crate::turnstile::types::{page_items, TurnstilePage, TurnstileResource};

/// What to do with one pushed update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Only the transient message changed; patch item `index`.
    PatchMessage { index: usize },
    /// The item's state changed and its links may have too; re-fetch item `index`.
    Refetch { index: usize },
    /// The item is not on display; reload the page.
    Reload,
}

/// Classify `update` against the page on display (if any).
pub fn classify(page: Option<&TurnstilePage>, update: &TurnstileResource) -> Reconciliation {
    let Some(page) = page else {
        return Reconciliation::Reload;
    };
    match page_items(page).iter().position(|item| item.id == update.id) {
        Some(index) if page_items(page)[index].same_identity(update) => {
            Reconciliation::PatchMessage { index }
        }
        Some(index) => Reconciliation::Refetch { index },
        None => Reconciliation::Reload,
    }
}

/// Replace the held copy of `fresh` on `page`. Returns whether a slot was found.
pub fn place(page: &mut TurnstilePage, fresh: &TurnstileResource) -> bool {
    match page
        .embedded
        .turnstiles
        .iter_mut()
        .find(|item| item.id == fresh.id)
    {
        Some(slot) => {
            *slot = fresh.clone();
            true
        }
        None => false,
    }
}

/// Set the message of the item at `index`.
pub fn patch_message(page: &mut TurnstilePage, index: usize, message: Option<String>) {
    if let Some(item) = page.embedded.turnstiles.get_mut(index) {
        item.message = message;
    }
}
