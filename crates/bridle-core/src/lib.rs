//! Shared types for the bridle browser-automation guard.
//!
//! Every other bridle crate depends on this one for identifier newtypes,
//! timestamps, and the per-call [`RequestContext`] the policy layer
//! evaluates. This crate has no internal dependencies and performs no I/O.

pub mod context;
pub mod types;

pub use context::RequestContext;
pub use types::{ActionType, AuditEventId, ConfirmationId, TabId, Timestamp};
