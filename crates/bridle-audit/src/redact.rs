//! Redaction of URLs, selectors, and structured metadata.
//!
//! Everything written to the audit log passes through here first. All
//! redaction functions are pure and idempotent: redacting already-redacted
//! output yields the same output.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

/// Placeholder substituted for masked values.
const REDACTED: &str = "REDACTED";

/// Written in place of a URL that could not be parsed at all.
const UNPARSEABLE_URL: &str = "[unparseable-url]";

/// Query/fragment parameter keys are masked when they contain one of
/// these fragments (case-insensitive).
const SENSITIVE_PARAM_FRAGMENTS: &[&str] = &["token", "code", "session", "auth", "key"];

/// Metadata object keys masked outright (case-insensitive exact match).
const SENSITIVE_METADATA_KEYS: &[&str] = &[
    "value",
    "cookie",
    "cookies",
    "authorization",
    "auth",
    "localstorage",
    "sessionstorage",
    "token",
    "code",
    "session",
    "key",
    "password",
];

/// How selectors are rendered into the audit log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorLogMode {
    /// Log the selector unchanged.
    Plaintext,
    /// Log at most 120 characters, with an ellipsis when cut.
    #[default]
    Truncate,
    /// Log a one-way SHA-256 digest of the selector.
    Hash,
}

impl SelectorLogMode {
    /// Maximum selector length retained in `truncate` mode.
    pub const TRUNCATE_AT: usize = 120;
}

impl std::str::FromStr for SelectorLogMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plaintext" => Ok(Self::Plaintext),
            "truncate" => Ok(Self::Truncate),
            "hash" => Ok(Self::Hash),
            other => Err(format!("unknown selector log mode: {other}")),
        }
    }
}

impl fmt::Display for SelectorLogMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plaintext => write!(f, "plaintext"),
            Self::Truncate => write!(f, "truncate"),
            Self::Hash => write!(f, "hash"),
        }
    }
}

/// Whether a query/fragment parameter key warrants masking.
fn is_sensitive_param(key: &str) -> bool {
    let lower = key.to_lowercase();
    SENSITIVE_PARAM_FRAGMENTS
        .iter()
        .any(|fragment| lower.contains(fragment))
}

/// Mask the value of every sensitive query and fragment parameter.
///
/// A URL that does not parse is replaced wholesale; a malformed URL may
/// hide credentials in ways parameter rewriting cannot reach.
#[must_use]
pub fn redact_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return UNPARSEABLE_URL.to_string();
    };

    if url.query().is_some() {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                if is_sensitive_param(&k) {
                    (k.into_owned(), REDACTED.to_string())
                } else {
                    (k.into_owned(), v.into_owned())
                }
            })
            .collect();
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    if let Some(fragment) = url.fragment()
        && fragment.contains('=')
    {
        let rebuilt: Vec<String> = fragment
            .split('&')
            .map(|part| match part.split_once('=') {
                Some((k, _)) if is_sensitive_param(k) => format!("{k}={REDACTED}"),
                _ => part.to_string(),
            })
            .collect();
        url.set_fragment(Some(&rebuilt.join("&")));
    }

    url.to_string()
}

/// Render a selector per the configured log mode.
#[must_use]
pub fn redact_selector(selector: &str, mode: SelectorLogMode) -> String {
    match mode {
        SelectorLogMode::Plaintext => selector.to_string(),
        SelectorLogMode::Truncate => {
            if selector.chars().count() > SelectorLogMode::TRUNCATE_AT {
                let mut cut: String = selector.chars().take(SelectorLogMode::TRUNCATE_AT).collect();
                cut.push('…');
                cut
            } else {
                selector.to_string()
            }
        },
        SelectorLogMode::Hash => {
            let digest = Sha256::digest(selector.as_bytes());
            format!("sha256:{}", hex::encode(digest))
        },
    }
}

/// Recursively mask sensitive keys in structured metadata.
///
/// Keys matching the sensitive set are replaced with the redaction
/// placeholder regardless of value type; string values under a key
/// literally named `url` are run through [`redact_url`].
#[must_use]
pub fn redact_metadata(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, inner) in map {
                let lower = key.to_lowercase();
                if SENSITIVE_METADATA_KEYS.contains(&lower.as_str()) {
                    out.insert(key.clone(), serde_json::Value::String(REDACTED.to_string()));
                } else if key == "url"
                    && let serde_json::Value::String(s) = inner
                {
                    out.insert(key.clone(), serde_json::Value::String(redact_url(s)));
                } else {
                    out.insert(key.clone(), redact_metadata(inner));
                }
            }
            serde_json::Value::Object(out)
        },
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(redact_metadata).collect())
        },
        other => other.clone(),
    }
}
