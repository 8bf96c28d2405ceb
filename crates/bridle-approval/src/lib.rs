//! TTL-bounded single-use confirmation tokens for bridle.
//!
//! When policy decides an action needs a human in the loop, the
//! orchestrator mints a [`PendingConfirmation`] here and hands its id to
//! the agent as an opaque token. A human approves or denies it out of
//! band; the agent then re-invokes the action carrying the token, and the
//! orchestrator consumes it: at most once, and only for the tool that
//! requested it.

pub mod error;
pub mod store;

pub use error::{ConfirmationError, ConfirmationResult};
pub use store::{ConfirmationStore, PendingConfirmation};
