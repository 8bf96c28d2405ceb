//! Allowlist policy, sensitivity classification, and injection scanning.
//!
//! The [`PolicyEngine`] is a pure decision function: given a
//! [`RequestContext`](bridle_core::RequestContext) and a [`PolicyConfig`]
//! it answers whether the action may proceed, must be confirmed by a
//! human, or is refused, with ordered reason codes for the audit trail.
//! It performs no I/O and holds no mutable state.
//!
//! The [`InjectionScanner`] is an independent, purely advisory heuristic
//! over extracted page text; its warnings ride along with results and
//! never block anything.

pub mod engine;
pub mod rules;
pub mod scanner;

pub use engine::{ConfirmationMode, PolicyConfig, PolicyDecision, PolicyEngine, reason};
pub use rules::SensitivityRules;
pub use scanner::{InjectionScanner, ScanReport};
