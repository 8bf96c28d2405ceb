//! The session step budget and declared active tab.

use std::sync::{PoisonError, RwLock};

use bridle_core::{TabId, Timestamp};
use tracing::debug;

#[derive(Debug, Default)]
struct SessionState {
    steps_taken: u32,
    active_tab: Option<TabId>,
    last_action_at: Option<Timestamp>,
}

/// Tracks mutating actions against a fixed per-session budget.
///
/// The check and the increment in [`record_step`](Self::record_step) run
/// under a single write lock, so concurrent callers cannot overshoot the
/// budget.
#[derive(Debug)]
pub struct SessionManager {
    max_steps: u32,
    state: RwLock<SessionState>,
}

impl SessionManager {
    /// Create a manager with the given step budget.
    #[must_use]
    pub fn new(max_steps: u32) -> Self {
        Self {
            max_steps,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// The configured budget.
    #[must_use]
    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// Consume one step of the budget.
    ///
    /// Returns `false` without incrementing once the counter has reached
    /// the budget; on success stamps the last-action timestamp.
    pub fn record_step(&self) -> bool {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if state.steps_taken >= self.max_steps {
            debug!(max_steps = self.max_steps, "session step budget exhausted");
            return false;
        }
        state.steps_taken = state.steps_taken.saturating_add(1);
        state.last_action_at = Some(Timestamp::now());
        true
    }

    /// Steps consumed so far.
    #[must_use]
    pub fn steps_taken(&self) -> u32 {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .steps_taken
    }

    /// Steps left before the budget is exhausted.
    #[must_use]
    pub fn steps_remaining(&self) -> u32 {
        self.max_steps.saturating_sub(self.steps_taken())
    }

    /// Declare the active tab. Persists until reset or replaced.
    pub fn set_active_tab(&self, id: TabId) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .active_tab = Some(id);
    }

    /// The caller-declared active tab, if any.
    #[must_use]
    pub fn active_tab(&self) -> Option<TabId> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .active_tab
            .clone()
    }

    /// Drop the declared active tab without touching the budget.
    pub fn clear_active_tab(&self) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .active_tab = None;
    }

    /// When the last budgeted action ran, if any.
    #[must_use]
    pub fn last_action_at(&self) -> Option<Timestamp> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_action_at
    }

    /// Zero the counter and clear the active tab and last-action stamp.
    ///
    /// The orchestrator pairs this with clearing the confirmation store.
    pub fn reset(&self) {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *state = SessionState::default();
    }
}
