//! The guard-level error taxonomy.
//!
//! Policy and budget failures are deterministic and recoverable; nothing
//! here is fatal to the guard itself. Browser failures are passed through
//! with their original message and never auto-retried.

use bridle_browser::BrowserError;
use bridle_core::ConfirmationId;

/// Everything that can stop a guarded action.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GuardError {
    /// The allowlist refused the action.
    #[error("action blocked by policy: {}", reasons.join(", "))]
    PolicyBlocked {
        /// Reason codes in check order, never empty.
        reasons: Vec<String>,
    },

    /// The action is parked behind a confirmation token; nothing ran.
    ///
    /// Approve the token via [`Guard::confirm`](crate::Guard::confirm),
    /// then re-invoke the action carrying it.
    #[error("confirmation required: {summary}")]
    NeedsConfirmation {
        /// Opaque single-use token.
        token: ConfirmationId,
        /// Human-readable description of the parked action.
        summary: String,
    },

    /// The presented token is unknown, expired, unapproved, or owned by a
    /// different tool.
    #[error("confirmation token expired or invalid: {token}")]
    ConfirmationExpired {
        /// The presented token, for correlation.
        token: String,
    },

    /// The session step budget is exhausted; reset the session to continue.
    #[error("session step budget exhausted ({max_steps} steps)")]
    MaxStepsExceeded {
        /// The configured budget.
        max_steps: u32,
    },

    /// The browser session has no open tabs.
    #[error("no open tabs")]
    NoTabs,

    /// No open tab carries the requested id.
    #[error("tab not found: {tab_id}")]
    TabNotFound {
        /// The id that failed to resolve.
        tab_id: String,
    },

    /// The underlying browser operation failed. Original message preserved;
    /// never auto-retried by this layer.
    #[error("browser action failed: {message}")]
    ActionFailed {
        /// Backend error message, verbatim.
        message: String,
    },
}

impl From<BrowserError> for GuardError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::NoTabs => Self::NoTabs,
            BrowserError::TabNotFound { tab_id } => Self::TabNotFound { tab_id },
            BrowserError::ActionFailed { message } => Self::ActionFailed { message },
        }
    }
}

/// Result alias for guard operations.
pub type GuardResult<T> = Result<T, GuardError>;
