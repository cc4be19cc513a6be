//! Turnstile dashboard domain.
//!
//! ```text
//! turnstile/
//! ├── dashboard - headless session tying everything together
//! ├── live_view - reconciliation task owning the displayed page
//! ├── notice    - auto-clearing user message
//! ├── push      - WebSocket push channel
//! ├── reconcile - pure reconciliation policy
//! ├── service   - TurnstileApi
//! └── types     - resources and pages
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TurnstileApi`] | list / create / get / send_event / delete |
//! | [`PushChannel`] | Outbound half of the WebSocket |
//! | [`UpdateStream`] | Inbound pushed updates |
//! | [`LiveView`] | Task keeping one page consistent with pushes |
//! | [`Dashboard`] | Everything above, wired together |

mod dashboard;
mod live_view;
mod notice;
mod push;
mod reconcile;
mod service;
mod types;

pub use dashboard::{Dashboard, MAX_VERSION_RELOADS};
pub use live_view::{Command, LiveView, LiveViewHandle, ReloadDefaults, Snapshot};
pub use notice::Notice;
pub use push::{PushChannel, UpdateStream};
pub use reconcile::{classify, patch_message, place, Reconciliation};
pub use service::{
    TurnstileApi, TurnstileSource, CREATE_RELATION, DELETE_RELATION, LIST_RELATION, SELF_RELATION,
};
pub use types::{page_items, TurnstilePage, TurnstileResource, TurnstileResources, TurnstileState};
