//! The append-only JSONL audit logger.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use bridle_core::{AuditEventId, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AuditResult;
use crate::event::{AuditEvent, AuditOutcome};
use crate::redact::{SelectorLogMode, redact_metadata, redact_selector, redact_url};

/// The durable, fully redacted form of an event: one JSON object per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AuditRecord {
    id: AuditEventId,
    timestamp: String,
    tool_name: String,
    action_type: String,
    outcome: AuditOutcome,
    reason_codes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
}

/// Appends redacted audit events to a flat JSONL file.
///
/// **Fail-open**: if the line cannot be written (missing permissions,
/// full disk, ...), [`AuditLogger::log`] reports the failure via
/// `tracing::warn!` and returns normally. Guarded actions do not die with
/// their paper trail; an operator who needs hard audit guarantees must
/// watch the warning stream.
#[derive(Debug)]
pub struct AuditLogger {
    path: PathBuf,
    selector_mode: SelectorLogMode,
}

impl AuditLogger {
    /// Create a logger appending to `path`, rendering selectors per `mode`.
    ///
    /// The file and its parent directories are created lazily on first
    /// write, so constructing a logger never touches the filesystem.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, selector_mode: SelectorLogMode) -> Self {
        Self {
            path: path.into(),
            selector_mode,
        }
    }

    /// The log file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Redact and append one event, returning its generated id.
    ///
    /// The id is returned even when the write fails (fail-open), so
    /// callers can still correlate follow-up events.
    pub fn log(&self, event: AuditEvent) -> AuditEventId {
        let record = self.seal(event);
        let id = record.id.clone();
        if let Err(e) = self.append(&record) {
            warn!(path = %self.path.display(), error = %e, "audit write failed; action proceeds unaudited");
        }
        id
    }

    /// Assign id/timestamp and run every field through redaction.
    fn seal(&self, event: AuditEvent) -> AuditRecord {
        AuditRecord {
            id: AuditEventId::new(),
            timestamp: Timestamp::now().to_iso8601(),
            tool_name: event.tool_name,
            action_type: event.action.as_str().to_string(),
            outcome: event.outcome,
            reason_codes: event.reason_codes,
            url: event.url.as_deref().map(redact_url),
            selector: event
                .selector
                .as_deref()
                .map(|s| redact_selector(s, self.selector_mode)),
            metadata: event.metadata.as_ref().map(redact_metadata),
        }
    }

    /// Serialize and append one line, flushed before returning.
    fn append(&self, record: &AuditRecord) -> AuditResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}
