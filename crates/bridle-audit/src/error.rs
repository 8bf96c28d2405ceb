//! Error types for the audit crate.

/// Errors that can occur while writing audit events.
///
/// These never propagate into the primary action path; the logger
/// swallows them after reporting (see [`crate::logger::AuditLogger`]).
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// The log file or its parent directory could not be written.
    #[error("audit log I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// The event could not be serialized to JSON.
    #[error("audit event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;
