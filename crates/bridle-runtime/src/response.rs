//! Success payloads for guarded actions.

use bridle_audit::AuditOutcome;
use bridle_core::{ActionType, AuditEventId, TabId};
use serde::{Deserialize, Serialize};

/// Receipt for a completed mutating action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionReceipt {
    /// Tab the action ran against.
    pub tab_id: TabId,
    /// What ran.
    pub action: ActionType,
    /// `allowed` for plain runs, `confirmed` when a token was consumed.
    pub outcome: AuditOutcome,
    /// Audit event recording this action, for correlation.
    pub audit_id: AuditEventId,
}

/// Extracted page content with advisory injection-scan warnings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContent {
    /// Tab the content came from.
    pub tab_id: TabId,
    /// Document URL at extraction time.
    pub url: String,
    /// Document title.
    pub title: String,
    /// Extracted text.
    pub text: String,
    /// Injection-scanner warnings; empty for clean content. Advisory only.
    pub warnings: Vec<String>,
    /// Audit event recording this extraction.
    pub audit_id: AuditEventId,
}

/// A captured screenshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Screenshot {
    /// Tab that was captured.
    pub tab_id: TabId,
    /// Encoded image bytes, as produced by the backend.
    pub data: Vec<u8>,
    /// Audit event recording this capture.
    pub audit_id: AuditEventId,
}
