//! Layered configuration loading: defaults → file → environment.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use crate::error::{ConfigError, ConfigResult};
use crate::types::BridleConfig;

/// Environment variable names, one per setting.
mod env_keys {
    pub const ALLOWED_DOMAINS: &str = "BRIDLE_ALLOWED_DOMAINS";
    pub const ALLOWED_PATH_PREFIXES: &str = "BRIDLE_ALLOWED_PATH_PREFIXES";
    pub const CONFIRMATION_MODE: &str = "BRIDLE_CONFIRMATION_MODE";
    pub const AUDIT_LOG: &str = "BRIDLE_AUDIT_LOG";
    pub const MAX_STEPS: &str = "BRIDLE_MAX_STEPS";
    pub const SELECTOR_LOG: &str = "BRIDLE_SELECTOR_LOG";
}

/// Load the configuration.
///
/// Starts from built-in defaults, merges `config_file` when given, then
/// applies `BRIDLE_*` environment overrides, and validates the result.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, an
/// override holds an unknown enum value, or validation fails.
pub fn load(config_file: Option<&Path>) -> ConfigResult<BridleConfig> {
    let mut config = BridleConfig::default();

    if let Some(path) = config_file {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "loaded config file");
    }

    let env_vars: HashMap<String, String> = std::env::vars().collect();
    apply_env_overrides(&mut config, &env_vars)?;

    validate(&config)?;
    Ok(config)
}

/// Apply `BRIDLE_*` overrides from an explicit variable map.
///
/// Split out from [`load`] so tests can drive it without mutating process
/// environment.
///
/// # Errors
///
/// Returns a [`ConfigError::InvalidValue`] for unparseable override values.
pub fn apply_env_overrides(
    config: &mut BridleConfig,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<()> {
    if let Some(raw) = env_vars.get(env_keys::ALLOWED_DOMAINS) {
        config.policy.allowed_domains = parse_domains(raw);
    }
    if let Some(raw) = env_vars.get(env_keys::ALLOWED_PATH_PREFIXES) {
        config.policy.allowed_path_prefixes = parse_prefix_pairs(raw)?;
    }
    if let Some(raw) = env_vars.get(env_keys::CONFIRMATION_MODE) {
        config.policy.confirmation_mode = raw
            .parse()
            .map_err(|e: String| ConfigError::invalid("policy.confirmation_mode", e))?;
    }
    if let Some(raw) = env_vars.get(env_keys::AUDIT_LOG) {
        config.audit.log_path = raw.into();
    }
    if let Some(raw) = env_vars.get(env_keys::MAX_STEPS) {
        config.session.max_steps = raw.parse().map_err(|_| {
            ConfigError::invalid("session.max_steps", format!("not a number: {raw}"))
        })?;
    }
    if let Some(raw) = env_vars.get(env_keys::SELECTOR_LOG) {
        config.audit.selector_mode = raw
            .parse()
            .map_err(|e: String| ConfigError::invalid("audit.selector_mode", e))?;
    }
    Ok(())
}

/// Comma-separated hostnames; entries are trimmed and lowercased.
fn parse_domains(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}

/// Semicolon-separated `domain:/prefix` pairs; a domain may repeat.
fn parse_prefix_pairs(raw: &str) -> ConfigResult<HashMap<String, Vec<String>>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for pair in raw.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let Some((domain, prefix)) = pair.split_once(':') else {
            return Err(ConfigError::invalid(
                "policy.allowed_path_prefixes",
                format!("expected domain:/prefix, got: {pair}"),
            ));
        };
        let domain = domain.trim().to_lowercase();
        let prefix = prefix.trim();
        if domain.is_empty() || !prefix.starts_with('/') {
            return Err(ConfigError::invalid(
                "policy.allowed_path_prefixes",
                format!("expected domain:/prefix, got: {pair}"),
            ));
        }
        map.entry(domain).or_default().push(prefix.to_string());
    }
    Ok(map)
}

/// Reject configurations the guard cannot safely run with.
fn validate(config: &BridleConfig) -> ConfigResult<()> {
    if config.session.max_steps == 0 {
        return Err(ConfigError::invalid(
            "session.max_steps",
            "must be at least 1",
        ));
    }
    for (domain, prefixes) in &config.policy.allowed_path_prefixes {
        if domain.trim().is_empty() {
            return Err(ConfigError::invalid(
                "policy.allowed_path_prefixes",
                "empty domain key",
            ));
        }
        for prefix in prefixes {
            if !prefix.starts_with('/') {
                return Err(ConfigError::invalid(
                    "policy.allowed_path_prefixes",
                    format!("prefix must start with '/': {prefix}"),
                ));
            }
        }
    }
    for domain in &config.policy.allowed_domains {
        if domain.trim().is_empty() {
            return Err(ConfigError::invalid(
                "policy.allowed_domains",
                "empty domain entry",
            ));
        }
    }
    Ok(())
}
