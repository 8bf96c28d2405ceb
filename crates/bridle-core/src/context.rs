//! The per-call request context evaluated by the policy layer.

use serde::{Deserialize, Serialize};

use crate::types::ActionType;

/// Everything the policy engine needs to know about one requested action.
///
/// Built fresh for every call by the orchestrator and discarded afterwards;
/// nothing in here outlives the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Name of the tool the external agent invoked (e.g. `browser_click`).
    pub tool_name: String,
    /// The action classification.
    pub action: ActionType,
    /// Target URL, when the action has one (navigation, or the current
    /// page URL for element actions).
    pub url: Option<String>,
    /// CSS selector the action targets, when applicable.
    pub selector: Option<String>,
    /// Visible text of the targeted element, when known.
    pub element_text: Option<String>,
    /// Key name for `press_key` actions.
    pub key: Option<String>,
    /// Whether this request navigates the tab to a new document.
    pub is_navigation: bool,
    /// Whether this request only observes the page.
    pub is_read_only: bool,
}

impl RequestContext {
    /// Create a context for a tool call, deriving the navigation and
    /// read-only flags from the action type.
    #[must_use]
    pub fn new(tool_name: impl Into<String>, action: ActionType) -> Self {
        Self {
            tool_name: tool_name.into(),
            action,
            url: None,
            selector: None,
            element_text: None,
            key: None,
            is_navigation: action.is_navigation(),
            is_read_only: action.is_read_only(),
        }
    }

    /// Attach a target URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Attach a CSS selector.
    #[must_use]
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Attach the targeted element's visible text.
    #[must_use]
    pub fn with_element_text(mut self, text: impl Into<String>) -> Self {
        self.element_text = Some(text.into());
        self
    }

    /// Attach the key name for a key press.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// A short human-readable summary of the request, used for
    /// confirmation prompts.
    #[must_use]
    pub fn summary(&self) -> String {
        let target = self
            .selector
            .as_deref()
            .or(self.url.as_deref())
            .or(self.key.as_deref())
            .unwrap_or("(no target)");
        format!("{} {target}", self.action)
    }
}
