//! Error types for the confirmation store.

/// Errors raised while consuming confirmation tokens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfirmationError {
    /// The token is unknown, expired, or owned by a different tool.
    ///
    /// Deliberately one variant for all three: a caller probing with a
    /// stolen or stale token learns nothing about which check failed.
    #[error("confirmation not found or expired: {id}")]
    NotFound {
        /// The presented token id.
        id: String,
    },

    /// The token exists but has not been approved yet.
    #[error("confirmation not yet approved: {id}")]
    NotApproved {
        /// The presented token id.
        id: String,
    },
}

/// Result alias for confirmation operations.
pub type ConfirmationResult<T> = Result<T, ConfirmationError>;
