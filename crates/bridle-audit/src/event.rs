//! Audit event types.

use bridle_core::ActionType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a guarded action, as recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// The action passed policy without needing confirmation and ran.
    Allowed,
    /// The action was refused by policy.
    Denied,
    /// The action was parked behind a confirmation token.
    NeedsConfirmation,
    /// The action ran after a confirmation token was consumed.
    Confirmed,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowed => write!(f, "allowed"),
            Self::Denied => write!(f, "denied"),
            Self::NeedsConfirmation => write!(f, "needs_confirmation"),
            Self::Confirmed => write!(f, "confirmed"),
        }
    }
}

/// One decision or outcome to be recorded.
///
/// The logger assigns the id and timestamp and runs every field through
/// redaction at write time; callers pass raw values.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Tool the external agent invoked.
    pub tool_name: String,
    /// Action classification.
    pub action: ActionType,
    /// What the guard decided or what happened.
    pub outcome: AuditOutcome,
    /// Policy reason codes, in evaluation order. Non-empty for denials.
    pub reason_codes: Vec<String>,
    /// Raw target URL, if the request had one.
    pub url: Option<String>,
    /// Raw selector, if the request had one.
    pub selector: Option<String>,
    /// Free-form structured context (scanner warnings, token ids, ...).
    pub metadata: Option<serde_json::Value>,
}

impl AuditEvent {
    /// Create an event with no target fields.
    #[must_use]
    pub fn new(tool_name: impl Into<String>, action: ActionType, outcome: AuditOutcome) -> Self {
        Self {
            tool_name: tool_name.into(),
            action,
            outcome,
            reason_codes: Vec::new(),
            url: None,
            selector: None,
            metadata: None,
        }
    }

    /// Attach policy reason codes.
    #[must_use]
    pub fn with_reasons(mut self, reasons: impl IntoIterator<Item = String>) -> Self {
        self.reason_codes.extend(reasons);
        self
    }

    /// Attach the raw target URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Attach the raw selector.
    #[must_use]
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Attach structured metadata. Redacted recursively at write time.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
