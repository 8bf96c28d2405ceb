//! Stable tab identity and active-tab resolution.
//!
//! Browser backends report pages as an ordered snapshot with no identity of
//! their own, and DOM focus is only a weak proxy for which tab the user
//! considers "current". The [`TabRegistry`] memoizes a stable [`TabId`] per
//! page handle and resolves the active page through an explicit fallback
//! chain:
//!
//! 1. A page reporting input focus via a best-effort probe (pages that
//!    error or are internal/extension pages are skipped).
//! 2. The page most recently marked focused via [`TabRegistry::mark_focused`].
//! 3. The first open page whose URL is not internal or blank.
//! 4. The last page in the snapshot.
//!
//! [`TabRegistry::refresh`] must run against a fresh snapshot before any
//! lookup so that ids of closed pages are dropped.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use bridle_core::{TabId, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::{BrowserError, BrowserResult, Page};

/// One row of [`TabRegistry::list_tabs`] output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabInfo {
    /// Stable tab identifier.
    pub id: TabId,
    /// Document title (empty if the page did not answer).
    pub title: String,
    /// Document URL (empty if the page did not answer).
    pub url: String,
    /// Whether this tab is the resolved active tab. Exactly one row is
    /// active in any non-empty listing.
    pub active: bool,
    /// Window the tab belongs to, when the backend reports one.
    pub window_id: Option<u32>,
}

/// Memoized state for one known page.
#[derive(Debug, Clone)]
struct TabRecord {
    id: TabId,
    last_focused: Option<Timestamp>,
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Keyed by page handle identity (`Arc` allocation address).
    records: HashMap<usize, TabRecord>,
    /// Counter for locally generated `tab-N` ids.
    next_local_id: u64,
}

/// Assigns stable ids to open pages and resolves the active one.
#[derive(Debug, Default)]
pub struct TabRegistry {
    state: RwLock<RegistryState>,
}

/// Handle identity for a page: the address of its `Arc` allocation.
///
/// Backends hand out the same allocation for the same open page (see the
/// [`Page`] contract), so the address is stable for the page's lifetime.
fn page_key(page: &Arc<dyn Page>) -> usize {
    Arc::as_ptr(page).cast::<()>() as usize
}

/// Whether a URL points at browser chrome rather than web content.
fn is_internal_url(url: &str) -> bool {
    url.is_empty()
        || url == "about:blank"
        || [
            "chrome://",
            "chrome-extension://",
            "devtools://",
            "edge://",
            "brave://",
            "moz-extension://",
        ]
        .iter()
        .any(|prefix| url.starts_with(prefix))
}

impl TabRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the stable id for a page, assigning one on first sight.
    ///
    /// Prefers the backend's protocol-level target identifier when the page
    /// exposes one, else generates a locally incrementing `tab-N` id. The
    /// id never changes for the lifetime of the page.
    pub fn id_for(&self, page: &Arc<dyn Page>) -> TabId {
        let key = page_key(page);
        let mut state = self
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(record) = state.records.get(&key) {
            return record.id.clone();
        }

        let id = match page.target_id() {
            Some(target) => TabId::new(target),
            None => {
                state.next_local_id = state.next_local_id.saturating_add(1);
                TabId::new(format!("tab-{}", state.next_local_id))
            },
        };
        state.records.insert(
            key,
            TabRecord {
                id: id.clone(),
                last_focused: None,
            },
        );
        id
    }

    /// Drop memoized ids (and focus recency) for pages no longer present.
    ///
    /// Must run against a fresh snapshot before any lookup.
    pub fn refresh(&self, pages: &[Arc<dyn Page>]) {
        let live: Vec<usize> = pages.iter().map(page_key).collect();
        let mut state = self
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        state.records.retain(|key, _| live.contains(key));
    }

    /// Record that a page was explicitly focused, independent of what the
    /// focus probe later reports.
    pub fn mark_focused(&self, page: &Arc<dyn Page>) {
        // Ensure the page has an id before stamping recency.
        let _ = self.id_for(page);
        let key = page_key(page);
        let mut state = self
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(record) = state.records.get_mut(&key) {
            record.last_focused = Some(Timestamp::now());
        }
    }

    /// Resolve the page an unscoped action applies to.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::NoTabs`] if the snapshot is empty.
    pub async fn active_page(&self, pages: &[Arc<dyn Page>]) -> BrowserResult<Arc<dyn Page>> {
        if pages.is_empty() {
            return Err(BrowserError::NoTabs);
        }

        // (1) Focus probe, best effort. Internal pages and probe failures
        // are skipped.
        for page in pages {
            match page.url().await {
                Ok(url) if is_internal_url(&url) => continue,
                Ok(_) => {},
                Err(e) => {
                    debug!(error = %e, "skipping page that failed the url query");
                    continue;
                },
            }
            match page.has_focus().await {
                Ok(true) => return Ok(Arc::clone(page)),
                Ok(false) => {},
                Err(e) => {
                    debug!(error = %e, "focus probe failed, skipping page");
                },
            }
        }

        // (2) Most recently explicitly focused page still in the snapshot.
        if let Some(page) = self.most_recently_focused(pages) {
            return Ok(page);
        }

        // (3) First page with real web content.
        for page in pages {
            if let Ok(url) = page.url().await
                && !is_internal_url(&url)
            {
                return Ok(Arc::clone(page));
            }
        }

        // (4) Last page in the snapshot.
        pages.last().cloned().ok_or(BrowserError::NoTabs)
    }

    /// The snapshot page with the newest `mark_focused` stamp, if any.
    fn most_recently_focused(&self, pages: &[Arc<dyn Page>]) -> Option<Arc<dyn Page>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut best: Option<(Timestamp, &Arc<dyn Page>)> = None;
        for page in pages {
            let Some(record) = state.records.get(&page_key(page)) else {
                continue;
            };
            let Some(stamp) = record.last_focused else {
                continue;
            };
            if best.is_none_or(|(current, _)| stamp > current) {
                best = Some((stamp, page));
            }
        }
        best.map(|(_, page)| Arc::clone(page))
    }

    /// Find the page carrying a specific tab id.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::NoTabs`] for an empty snapshot and
    /// [`BrowserError::TabNotFound`] when no open page carries the id.
    pub fn find_by_id(
        &self,
        pages: &[Arc<dyn Page>],
        id: &TabId,
    ) -> BrowserResult<Arc<dyn Page>> {
        if pages.is_empty() {
            return Err(BrowserError::NoTabs);
        }
        pages
            .iter()
            .find(|page| &self.id_for(page) == id)
            .cloned()
            .ok_or_else(|| BrowserError::TabNotFound {
                tab_id: id.as_str().to_string(),
            })
    }

    /// Describe every open page. Exactly one row is marked active in any
    /// non-empty listing; an empty snapshot yields an empty listing.
    pub async fn list_tabs(&self, pages: &[Arc<dyn Page>]) -> BrowserResult<Vec<TabInfo>> {
        if pages.is_empty() {
            return Ok(Vec::new());
        }

        let active = self.active_page(pages).await?;
        let active_key = page_key(&active);

        let mut tabs = Vec::with_capacity(pages.len());
        for page in pages {
            let id = self.id_for(page);
            let title = page.title().await.unwrap_or_default();
            let url = page.url().await.unwrap_or_default();
            tabs.push(TabInfo {
                id,
                title,
                url,
                active: page_key(page) == active_key,
                window_id: page.window_id(),
            });
        }
        Ok(tabs)
    }
}
