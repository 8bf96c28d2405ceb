//! The bridle guard orchestrator.
//!
//! A [`Guard`] wraps one browser session and one policy configuration and
//! exposes the guarded action surface the external agent calls. Every
//! mutating action runs the same pipeline:
//!
//! 1. Resolve the target tab (explicit id → session override → heuristic).
//! 2. Build a [`RequestContext`](bridle_core::RequestContext).
//! 3. Evaluate policy. Denials are audited and returned as
//!    [`GuardError::PolicyBlocked`].
//! 4. Consume an accompanying confirmation token, or mint one and return
//!    [`GuardError::NeedsConfirmation`] without acting.
//! 5. Charge the session step budget.
//! 6. Delegate to the browser collaborator; failures surface as
//!    [`GuardError::ActionFailed`], never retried.
//! 7. Audit the outcome; content results also carry injection-scan
//!    warnings.
//!
//! Guards are plain values over an injected [`Browser`](bridle_browser::Browser)
//! handle, with no process-wide state. Multiple independent guards can
//! coexist, which is also what keeps the tests hermetic.

pub mod error;
pub mod guard;
pub mod response;

pub use error::{GuardError, GuardResult};
pub use guard::Guard;
pub use response::{ActionReceipt, PageContent, Screenshot};
