//! The pure policy decision function.
//!
//! Check order for one request:
//!
//! 1. Classify sensitivity from the rule table (always computed; a denial
//!    still reports it).
//! 2. When the request carries a URL and is not read-only, check the
//!    domain/path allowlist. A failure here short-circuits to a denial.
//! 3. When allowed, derive the confirmation requirement from sensitivity
//!    and the configured mode.

use std::collections::HashMap;
use std::fmt;

use bridle_core::RequestContext;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::rules::SensitivityRules;

/// Reason codes carried on decisions and audit events, in check order.
pub mod reason {
    /// No domains are configured at all; nothing may act.
    pub const ALLOWLIST_MISSING: &str = "allowlist_missing";
    /// The target host is not on the allowlist.
    pub const ALLOWLIST_BLOCKED: &str = "allowlist_blocked";
    /// The host is listed but the path matches none of its prefixes.
    pub const PATH_PREFIX_BLOCKED: &str = "path_prefix_blocked";
    /// The action classified as sensitive.
    pub const SENSITIVE_ACTION: &str = "sensitive_action";
    /// Human confirmation is required before the action may run.
    pub const CONFIRMATION_REQUIRED: &str = "confirmation_required";
}

/// When the guard demands human confirmation beyond sensitivity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfirmationMode {
    /// Only sensitive actions require confirmation.
    Auto,
    /// Additionally confirm every navigation.
    ConfirmOnNavigation,
    /// Only sensitive actions require confirmation (the default).
    #[default]
    ConfirmOnSensitive,
    /// Confirm every non-read-only action.
    AlwaysConfirm,
}

impl std::str::FromStr for ConfirmationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "confirm-on-navigation" => Ok(Self::ConfirmOnNavigation),
            "confirm-on-sensitive" => Ok(Self::ConfirmOnSensitive),
            "always-confirm" => Ok(Self::AlwaysConfirm),
            other => Err(format!("unknown confirmation mode: {other}")),
        }
    }
}

impl fmt::Display for ConfirmationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::ConfirmOnNavigation => write!(f, "confirm-on-navigation"),
            Self::ConfirmOnSensitive => write!(f, "confirm-on-sensitive"),
            Self::AlwaysConfirm => write!(f, "always-confirm"),
        }
    }
}

/// The allowlist and mode the engine decides against.
///
/// Loaded once at startup and immutable for the process lifetime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Hostnames automation may act on. A listed domain also admits its
    /// subdomains. Empty means nothing is allowed.
    pub allowed_domains: Vec<String>,
    /// Optional per-domain path prefixes. A domain with an entry here only
    /// admits request paths starting with one of its prefixes.
    pub allowed_path_prefixes: HashMap<String, Vec<String>>,
    /// Confirmation mode.
    pub confirmation_mode: ConfirmationMode,
}

impl PolicyConfig {
    /// Whether `host` is admitted by the allowlist, directly or as a
    /// subdomain of a listed domain. Case-insensitive.
    #[must_use]
    pub fn is_host_allowed(&self, host: &str) -> bool {
        self.matching_domain(host).is_some()
    }

    /// The configured domain entry that admits `host`, preferring an exact
    /// match over a parent domain.
    fn matching_domain(&self, host: &str) -> Option<&str> {
        let host = host.to_lowercase();
        let mut parent: Option<&str> = None;
        for domain in &self.allowed_domains {
            let lower = domain.to_lowercase();
            if lower == host {
                return Some(domain.as_str());
            }
            if parent.is_none() && host.ends_with(&format!(".{lower}")) {
                parent = Some(domain.as_str());
            }
        }
        parent
    }

    /// Path prefixes configured for the domain admitting `host`, if any.
    fn prefixes_for(&self, host: &str) -> Option<&[String]> {
        // Exact host key wins over the parent-domain key.
        let host_lower = host.to_lowercase();
        if let Some(prefixes) = self.allowed_path_prefixes.get(&host_lower) {
            return Some(prefixes.as_slice());
        }
        let domain = self.matching_domain(host)?;
        self.allowed_path_prefixes
            .get(&domain.to_lowercase())
            .map(Vec::as_slice)
    }
}

/// Outcome of a policy evaluation. Pure data, no side effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// Whether the action may run (possibly after confirmation).
    pub allowed: bool,
    /// Whether a human must confirm before it runs.
    pub requires_confirmation: bool,
    /// Reason codes in check order. Non-empty for every denial.
    pub reason_codes: Vec<String>,
    /// Whether the action classified as sensitive.
    pub sensitive: bool,
}

impl PolicyDecision {
    fn denied(reason: &str, sensitive: bool) -> Self {
        Self {
            allowed: false,
            requires_confirmation: false,
            reason_codes: vec![reason.to_string()],
            sensitive,
        }
    }

    /// Whether the decision refuses the action outright.
    #[must_use]
    pub fn is_denied(&self) -> bool {
        !self.allowed
    }

    /// Whether the action may run immediately, no confirmation needed.
    #[must_use]
    pub fn is_unconditionally_allowed(&self) -> bool {
        self.allowed && !self.requires_confirmation
    }
}

/// The policy engine: a sensitivity rule table plus the decision function.
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    rules: SensitivityRules,
}

impl PolicyEngine {
    /// Create an engine with the default sensitivity rule table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with a custom rule table.
    #[must_use]
    pub fn with_rules(rules: SensitivityRules) -> Self {
        Self { rules }
    }

    /// Evaluate one request against the configuration.
    ///
    /// Pure: no I/O, no mutation, and well-formed input never panics.
    #[must_use]
    pub fn decide(&self, ctx: &RequestContext, config: &PolicyConfig) -> PolicyDecision {
        // Sensitivity first; denials still report it.
        let sensitive = self.rules.classify(ctx);

        // Allowlist applies to acting requests that carry a URL.
        if let Some(raw_url) = &ctx.url
            && !ctx.is_read_only
            && let Some(denial) = Self::check_allowlist(raw_url, config, sensitive)
        {
            return denial;
        }

        let mut reason_codes = Vec::new();
        let mut requires_confirmation = false;

        if sensitive {
            requires_confirmation = true;
            reason_codes.push(reason::SENSITIVE_ACTION.to_string());
        }
        match config.confirmation_mode {
            ConfirmationMode::AlwaysConfirm if !ctx.is_read_only => {
                requires_confirmation = true;
            },
            ConfirmationMode::ConfirmOnNavigation if ctx.is_navigation => {
                requires_confirmation = true;
            },
            _ => {},
        }
        if requires_confirmation {
            reason_codes.push(reason::CONFIRMATION_REQUIRED.to_string());
        }

        PolicyDecision {
            allowed: true,
            requires_confirmation,
            reason_codes,
            sensitive,
        }
    }

    /// Run the allowlist check, returning the denial if it fails.
    fn check_allowlist(
        raw_url: &str,
        config: &PolicyConfig,
        sensitive: bool,
    ) -> Option<PolicyDecision> {
        if config.allowed_domains.is_empty() {
            return Some(PolicyDecision::denied(reason::ALLOWLIST_MISSING, sensitive));
        }

        // A URL that does not parse cannot be matched against the
        // allowlist, so it is treated as unlisted.
        let Some((host, path)) = Url::parse(raw_url)
            .ok()
            .and_then(|url| Some((url.host_str()?.to_string(), url.path().to_string())))
        else {
            return Some(PolicyDecision::denied(reason::ALLOWLIST_BLOCKED, sensitive));
        };

        if !config.is_host_allowed(&host) {
            return Some(PolicyDecision::denied(reason::ALLOWLIST_BLOCKED, sensitive));
        }

        if let Some(prefixes) = config.prefixes_for(&host)
            && !prefixes.is_empty()
            && !prefixes.iter().any(|prefix| path.starts_with(prefix))
        {
            return Some(PolicyDecision::denied(
                reason::PATH_PREFIX_BLOCKED,
                sensitive,
            ));
        }

        None
    }
}
