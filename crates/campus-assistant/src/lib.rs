//! # campus-assistant
//!
//! Keeps the assistant widget usable whatever the identity store holds:
//!
//! - [`Synchronizer`]: polls the store, synthesizes guest sessions from the
//!   hosting page's implied role, drops to local fallback otherwise
//! - [`Assistant`]: routes questions to the chat backend or the
//!   [`LocalResponder`] depending on the synchronizer's mode
//! - [`PollHandle`]: owned, cancellable poll timer
//!
//! Guest and fallback modes are always flagged as degraded in the published
//! [`AssistantView`].

pub mod assistant;
pub mod backend;
pub mod error;
pub mod fallback;
pub mod guest;
pub mod inference;
pub mod poll;
pub mod portal;
pub mod reply;
pub mod sync;

pub use assistant::Assistant;
pub use backend::{ChatAnswer, ChatBackend, HttpChatBackend};
pub use error::AssistantError;
pub use fallback::LocalResponder;
pub use inference::{PageContext, PathHeuristic, RoleInference};
pub use poll::PollHandle;
pub use portal::{Portal, QuickAction};
pub use reply::Reply;
pub use sync::{AssistantView, AuthMode, Evaluation, Synchronizer};
