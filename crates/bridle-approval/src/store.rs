//! The in-memory confirmation-token ledger.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use bridle_core::{ConfirmationId, Timestamp};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfirmationError, ConfirmationResult};

/// Default maximum number of live entries.
const DEFAULT_CAPACITY: usize = 50;

/// Default token lifetime.
const DEFAULT_TTL_SECS: i64 = 5 * 60;

/// One action parked behind human confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingConfirmation {
    /// Opaque token handed to the agent.
    pub id: ConfirmationId,
    /// Human-readable description shown to the approver.
    pub summary: String,
    /// The tool that requested confirmation; only this tool may consume
    /// the token.
    pub tool_name: String,
    /// When the entry was minted.
    pub created_at: Timestamp,
    /// When the entry stops being consumable.
    pub expires_at: Timestamp,
    /// Set by [`ConfirmationStore::approve`]; consumption requires it.
    pub approved: bool,
}

impl PendingConfirmation {
    /// Whether the entry's lifetime has elapsed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.0 <= chrono::Utc::now()
    }
}

/// Capacity-bounded ledger of pending confirmations.
///
/// Expired entries are purged lazily on every mutation; when the store is
/// full, minting a new entry evicts the single oldest one. All
/// check-then-act sequences (eviction, approve, consume) run under one
/// write lock, so concurrent dispatch cannot double-spend a token.
#[derive(Debug)]
pub struct ConfirmationStore {
    entries: RwLock<HashMap<ConfirmationId, PendingConfirmation>>,
    ttl: Duration,
    capacity: usize,
}

impl ConfirmationStore {
    /// Create a store with the default TTL (5 minutes) and capacity (50).
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(DEFAULT_TTL_SECS),
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Override the token lifetime.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Override the live-entry capacity.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Mint a new pending confirmation.
    ///
    /// Purges expired entries first; if the store is still at capacity,
    /// evicts the oldest entry to make room.
    pub fn create(
        &self,
        summary: impl Into<String>,
        tool_name: impl Into<String>,
    ) -> PendingConfirmation {
        let now = chrono::Utc::now();
        // checked add: DateTime arithmetic panics on overflow, and an absurd
        // TTL must not abort the process.
        let expires_at = now
            .checked_add_signed(self.ttl)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC);
        let entry = PendingConfirmation {
            id: ConfirmationId::new(),
            summary: summary.into(),
            tool_name: tool_name.into(),
            created_at: Timestamp::from_datetime(now),
            expires_at: Timestamp::from_datetime(expires_at),
            approved: false,
        };

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Self::purge_expired(&mut entries);

        if entries.len() >= self.capacity
            && let Some(oldest) = entries
                .values()
                .min_by_key(|e| e.created_at)
                .map(|e| e.id.clone())
        {
            debug!(id = %oldest, "confirmation store full, evicting oldest entry");
            entries.remove(&oldest);
        }

        entries.insert(entry.id.clone(), entry.clone());
        entry
    }

    /// Mark a live entry approved.
    ///
    /// Idempotent: approving an already-approved entry reports success
    /// without changing state, so rapid repeated confirm calls collapse to
    /// one approval. Returns `false` for unknown or expired ids (expired
    /// entries are removed on the way).
    pub fn approve(&self, id: &ConfirmationId) -> bool {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(mut entry) = entries.remove(id) else {
            return false;
        };
        if entry.is_expired() {
            return false;
        }
        entry.approved = true;
        entries.insert(id.clone(), entry);
        true
    }

    /// Consume an approved entry on behalf of `tool_name`.
    ///
    /// Single use: success removes the entry, so a second consumption of
    /// the same token fails. The owner check and the removal happen under
    /// the same write lock.
    ///
    /// # Errors
    ///
    /// [`ConfirmationError::NotFound`] for unknown, expired, or
    /// wrong-tool tokens; [`ConfirmationError::NotApproved`] when the
    /// entry exists but no human has approved it yet.
    pub fn consume_approved(
        &self,
        id: &ConfirmationId,
        tool_name: &str,
    ) -> ConfirmationResult<PendingConfirmation> {
        let not_found = || ConfirmationError::NotFound { id: id.to_string() };

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(entry) = entries.remove(id) else {
            return Err(not_found());
        };
        if entry.is_expired() {
            return Err(not_found());
        }
        if entry.tool_name != tool_name {
            // A wrong-tool probe must not burn the token.
            entries.insert(id.clone(), entry);
            return Err(not_found());
        }
        if !entry.approved {
            entries.insert(id.clone(), entry);
            return Err(ConfirmationError::NotApproved { id: id.to_string() });
        }

        Ok(entry)
    }

    /// Delete an entry, reporting whether anything was removed.
    pub fn deny(&self, id: &ConfirmationId) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    /// Wipe all entries.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Snapshot of live entries, oldest first.
    #[must_use]
    pub fn pending(&self) -> Vec<PendingConfirmation> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut live: Vec<PendingConfirmation> = entries
            .values()
            .filter(|e| !e.is_expired())
            .cloned()
            .collect();
        live.sort_by_key(|e| e.created_at);
        live
    }

    /// Number of live entries.
    #[must_use]
    pub fn count(&self) -> usize {
        self.pending().len()
    }

    fn purge_expired(entries: &mut HashMap<ConfirmationId, PendingConfirmation>) {
        entries.retain(|_, entry| !entry.is_expired());
    }
}

impl Default for ConfirmationStore {
    fn default() -> Self {
        Self::new()
    }
}
