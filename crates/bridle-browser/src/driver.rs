//! The browser collaborator seam.
//!
//! Implementations wrap a real automation backend and surface its failures
//! as [`BrowserError::ActionFailed`] with the original message preserved.
//! The guard never retries a failed browser call.

use async_trait::async_trait;
use std::sync::Arc;

/// Error type for browser collaborator operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BrowserError {
    /// The browser session has no open tabs.
    #[error("no open tabs")]
    NoTabs,

    /// No open tab carries the requested id.
    #[error("tab not found: {tab_id}")]
    TabNotFound {
        /// The id that failed to resolve.
        tab_id: String,
    },

    /// The underlying browser operation failed (selector never appeared,
    /// navigation error, disconnected target, ...).
    #[error("browser action failed: {message}")]
    ActionFailed {
        /// Backend error message, verbatim.
        message: String,
    },
}

impl BrowserError {
    /// Wrap a backend failure, preserving its message.
    #[must_use]
    pub fn action_failed(message: impl Into<String>) -> Self {
        Self::ActionFailed {
            message: message.into(),
        }
    }
}

/// Result alias for browser collaborator operations.
pub type BrowserResult<T> = Result<T, BrowserError>;

/// One open browser tab.
///
/// Implementations must hand out the **same** `Arc` allocation for the same
/// open page across successive [`Browser::pages`] snapshots; the tab
/// registry keys its memoized ids on handle identity.
#[async_trait]
pub trait Page: Send + Sync {
    /// Protocol-level target identifier, when the backend exposes one
    /// (e.g. a CDP target id). Used in preference to a locally generated
    /// tab id.
    fn target_id(&self) -> Option<String>;

    /// Identifier of the window containing this tab, when known.
    fn window_id(&self) -> Option<u32>;

    /// Current document URL.
    async fn url(&self) -> BrowserResult<String>;

    /// Current document title.
    async fn title(&self) -> BrowserResult<String>;

    /// Best-effort probe: does this page's document currently hold input
    /// focus? Backends typically evaluate `document.hasFocus()`.
    async fn has_focus(&self) -> BrowserResult<bool>;

    /// Navigate the tab to a URL.
    async fn navigate(&self, url: &str) -> BrowserResult<()>;

    /// Click the element matched by `selector`.
    async fn click(&self, selector: &str) -> BrowserResult<()>;

    /// Fill the form field matched by `selector` with `value`.
    async fn fill(&self, selector: &str, value: &str) -> BrowserResult<()>;

    /// Type text into the currently focused element.
    async fn type_text(&self, text: &str) -> BrowserResult<()>;

    /// Press a single key (e.g. `Enter`, `Tab`).
    async fn press_key(&self, key: &str) -> BrowserResult<()>;

    /// Wait until `selector` matches an element or the backend times out.
    async fn wait_for(&self, selector: &str) -> BrowserResult<()>;

    /// Extracted text content of the current document.
    async fn content(&self) -> BrowserResult<String>;

    /// Visible text of the element matched by `selector`, when resolvable.
    async fn element_text(&self, selector: &str) -> BrowserResult<Option<String>>;

    /// Capture a screenshot of the viewport.
    async fn screenshot(&self) -> BrowserResult<Vec<u8>>;
}

/// An attached browser session.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Snapshot of all currently open pages, in the backend's tab order.
    async fn pages(&self) -> BrowserResult<Vec<Arc<dyn Page>>>;
}
