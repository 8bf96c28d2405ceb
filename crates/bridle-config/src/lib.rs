//! Configuration loading and validation for bridle.
//!
//! Settings are resolved in three layers, later layers winning:
//! built-in defaults → an optional TOML file → `BRIDLE_*` environment
//! variables. The result is validated once and then immutable for the
//! process lifetime.

pub mod error;
pub mod loader;
pub mod types;

pub use error::{ConfigError, ConfigResult};
pub use loader::load;
pub use types::{AuditSection, BridleConfig, SessionSection};
