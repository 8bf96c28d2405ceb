//! Identifier newtypes, timestamps, and action classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identifier for an open browser tab.
///
/// Assigned by the tab registry when a page is first seen and never changes
/// for the lifetime of that page. The inner string is either a
/// protocol-level target identifier or a locally generated `tab-N`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabId(pub String);

impl TabId {
    /// Create a tab ID from a raw string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab:{}", self.0)
    }
}

impl From<&str> for TabId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a pending confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfirmationId(pub Uuid);

impl ConfirmationId {
    /// Create a new random confirmation ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a confirmation ID from a UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse a confirmation ID from its string form.
    ///
    /// Accepts both the bare UUID and the `confirm:` prefixed display form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let raw = s.strip_prefix("confirm:").unwrap_or(s);
        Uuid::parse_str(raw).ok().map(Self)
    }
}

impl Default for ConfirmationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConfirmationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "confirm:{}", self.0)
    }
}

/// Unique identifier for an audit event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditEventId(pub Uuid);

impl AuditEventId {
    /// Create a new random audit event ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AuditEventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuditEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "audit:{}", self.0)
    }
}

/// Timestamp wrapper for consistent handling throughout bridle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Get the current timestamp.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create a timestamp from a `DateTime<Utc>`.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Check if this timestamp is in the past.
    #[must_use]
    pub fn is_past(&self) -> bool {
        self.0 < Utc::now()
    }

    /// Render as RFC 3339 / ISO-8601 with second precision.
    #[must_use]
    pub fn to_iso8601(&self) -> String {
        self.0.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_iso8601())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

/// The kind of browser action a tool call maps to.
///
/// Classification drives both the policy check (read-only actions bypass
/// the allowlist) and the session budget (only mutating/navigating actions
/// consume steps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Load a URL in the target tab.
    Navigate,
    /// Click an element.
    Click,
    /// Fill a form field with a value.
    Fill,
    /// Type text into the focused element.
    TypeText,
    /// Press a single key (possibly with modifiers).
    PressKey,
    /// Submit a form.
    Submit,
    /// Wait for a selector to appear.
    WaitFor,
    /// Extract page content.
    Query,
    /// Capture a screenshot.
    Screenshot,
    /// Enumerate open tabs.
    ListTabs,
    /// Declare the active tab for subsequent unscoped actions.
    SelectTab,
}

impl ActionType {
    /// Whether this action only observes the page.
    ///
    /// Read-only actions bypass the allowlist check and never consume the
    /// session step budget.
    #[must_use]
    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            Self::WaitFor | Self::Query | Self::Screenshot | Self::ListTabs | Self::SelectTab
        )
    }

    /// Whether this action changes the page the tab is on.
    #[must_use]
    pub fn is_navigation(self) -> bool {
        matches!(self, Self::Navigate)
    }

    /// Stable wire name, matching the serde representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::Click => "click",
            Self::Fill => "fill",
            Self::TypeText => "type_text",
            Self::PressKey => "press_key",
            Self::Submit => "submit",
            Self::WaitFor => "wait_for",
            Self::Query => "query",
            Self::Screenshot => "screenshot",
            Self::ListTabs => "list_tabs",
            Self::SelectTab => "select_tab",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
