//! LRU (Least Recently Used) replacement policy.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::common::PageId;

/// Evicts the evictable page whose last access is oldest.
///
/// Every access takes a fresh tick from a logical clock, so no two pages
/// share a timestamp and victim selection is deterministic. Pages dirtied by
/// a live transaction are marked non-evictable by the buffer pool and skipped.
#[derive(Debug, Default)]
pub struct LruReplacer {
    clock: u64,

    /// Last access tick of every tracked page.
    last_access: HashMap<PageId, u64>,

    /// `(tick, page)` ordered oldest first.
    order: BTreeSet<(u64, PageId)>,

    evictable: HashSet<PageId>,
}

impl LruReplacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a page was accessed, making it the most recently used.
    pub fn record_access(&mut self, page_id: PageId) {
        self.clock += 1;
        if let Some(old) = self.last_access.insert(page_id, self.clock) {
            self.order.remove(&(old, page_id));
        }
        self.order.insert((self.clock, page_id));
    }

    /// Mark whether a tracked page may be chosen as a victim.
    pub fn set_evictable(&mut self, page_id: PageId, evictable: bool) {
        if evictable && self.last_access.contains_key(&page_id) {
            self.evictable.insert(page_id);
        } else {
            self.evictable.remove(&page_id);
        }
    }

    /// Remove and return the least recently used evictable page.
    pub fn evict(&mut self) -> Option<PageId> {
        let &(tick, victim) = self
            .order
            .iter()
            .find(|(_, page_id)| self.evictable.contains(page_id))?;

        self.order.remove(&(tick, victim));
        self.last_access.remove(&victim);
        self.evictable.remove(&victim);
        Some(victim)
    }

    /// Stop tracking a page.
    pub fn remove(&mut self, page_id: PageId) {
        if let Some(tick) = self.last_access.remove(&page_id) {
            self.order.remove(&(tick, page_id));
        }
        self.evictable.remove(&page_id);
    }

    /// Number of evictable pages.
    pub fn size(&self) -> usize {
        self.evictable.len()
    }
}
