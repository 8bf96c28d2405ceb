//! Configuration types.
//!
//! Every section implements [`Default`] with production-safe values, so a
//! bare section header in TOML (or no file at all) produces a working and
//! maximally restrictive configuration: an empty allowlist denies every
//! acting request.

use std::path::PathBuf;

use bridle_audit::SelectorLogMode;
use bridle_policy::PolicyConfig;
use serde::{Deserialize, Serialize};

/// Default per-session step budget.
pub const DEFAULT_MAX_STEPS: u32 = 30;

/// Root configuration for a bridle guard instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridleConfig {
    /// Allowlist and confirmation mode.
    pub policy: PolicyConfig,
    /// Audit log destination and selector rendering.
    pub audit: AuditSection,
    /// Session step budget.
    pub session: SessionSection,
}

/// Audit log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSection {
    /// Path of the append-only JSONL log.
    pub log_path: PathBuf,
    /// How selectors are rendered into the log.
    pub selector_mode: SelectorLogMode,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            log_path: std::env::temp_dir().join("bridle").join("audit.jsonl"),
            selector_mode: SelectorLogMode::default(),
        }
    }
}

/// Session budget settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Mutating actions allowed before a reset is required.
    pub max_steps: u32,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}
