//! Redacting append-only audit log for bridle.
//!
//! Every policy decision and action outcome is recorded as one JSON object
//! per line in a flat file. Secrets never reach the file: URLs pass through
//! query/fragment masking and selectors are logged per the configured
//! [`SelectorLogMode`] **before** serialization.
//!
//! The logger is deliberately fail-open: an audit write failure is reported
//! via `tracing::warn!` and the primary action proceeds. The guard degrades
//! to un-audited rather than unavailable.

pub mod error;
pub mod event;
pub mod logger;
pub mod redact;

pub use error::{AuditError, AuditResult};
pub use event::{AuditEvent, AuditOutcome};
pub use logger::AuditLogger;
pub use redact::{SelectorLogMode, redact_metadata, redact_selector, redact_url};
