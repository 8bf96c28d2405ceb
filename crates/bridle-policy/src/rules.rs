//! The declarative sensitivity rule table.
//!
//! Sensitivity is decided by keyword sets per dimension (selector, URL,
//! element text, pressed key) plus two structural rules (submit actions,
//! Enter presses). The table is data, not control flow: tests and embedders
//! can swap in their own sets without touching the engine.

use bridle_core::{ActionType, RequestContext};
use serde::{Deserialize, Serialize};

/// Keyword sets that classify an action as sensitive.
///
/// All matching is case-insensitive substring containment against the
/// relevant request field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityRules {
    /// Keywords matched against the CSS selector.
    pub selector_keywords: Vec<String>,
    /// Keywords matched against the target URL.
    pub url_keywords: Vec<String>,
    /// Keywords matched against the element's visible text.
    pub element_text_keywords: Vec<String>,
    /// Key names (exact match) whose press is sensitive.
    pub sensitive_keys: Vec<String>,
}

impl Default for SensitivityRules {
    fn default() -> Self {
        Self {
            selector_keywords: to_strings(&[
                "submit",
                "confirm",
                "delete",
                "remove",
                "unsubscribe",
                "checkout",
                "purchase",
                "pay",
                "order",
                "transfer",
            ]),
            url_keywords: to_strings(&[
                "checkout",
                "billing",
                "payment",
                "confirm",
                "delete",
                "unsubscribe",
                "order",
            ]),
            element_text_keywords: to_strings(&[
                "submit",
                "confirm",
                "delete",
                "remove",
                "unsubscribe",
                "place order",
                "pay",
                "purchase",
                "checkout",
            ]),
            sensitive_keys: to_strings(&["Enter", "NumpadEnter"]),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn contains_any(haystack: &str, keywords: &[String]) -> bool {
    let lower = haystack.to_lowercase();
    keywords.iter().any(|k| lower.contains(&k.to_lowercase()))
}

impl SensitivityRules {
    /// Classify one request. Adding keywords can only widen the sensitive
    /// set; classification is monotonic in the rule table.
    #[must_use]
    pub fn classify(&self, ctx: &RequestContext) -> bool {
        if ctx.action == ActionType::Submit {
            return true;
        }
        if ctx.action == ActionType::PressKey
            && let Some(key) = &ctx.key
            && self.sensitive_keys.iter().any(|k| k == key)
        {
            return true;
        }
        if let Some(selector) = &ctx.selector
            && contains_any(selector, &self.selector_keywords)
        {
            return true;
        }
        if let Some(url) = &ctx.url
            && contains_any(url, &self.url_keywords)
        {
            return true;
        }
        if let Some(text) = &ctx.element_text
            && contains_any(text, &self.element_text_keywords)
        {
            return true;
        }
        false
    }
}
