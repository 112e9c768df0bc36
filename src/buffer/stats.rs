//! Buffer pool statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics tracked by the buffer pool.
///
/// All fields are atomic for lock-free, thread-safe updates.
///
/// # Memory Ordering
/// Every operation uses `Ordering::Relaxed`: counters are independent and
/// only need atomicity, not ordering with each other.
///
/// # Example
/// ```
/// use lockstepdb::BufferPoolStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = BufferPoolStats::new();
/// stats.cache_hits.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.snapshot().cache_hits, 1);
/// ```
#[derive(Debug)]
pub struct BufferPoolStats {
    /// Fetches served from the cache.
    pub cache_hits: AtomicU64,

    /// Fetches that had to load the page from the page store.
    pub cache_misses: AtomicU64,

    /// Clean pages dropped to make room.
    pub evictions: AtomicU64,

    pub pages_read: AtomicU64,

    /// Pages written to the page store, by commit or flush.
    pub pages_written: AtomicU64,

    pub commits: AtomicU64,

    pub aborts: AtomicU64,
}

impl BufferPoolStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self {
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            pages_read: AtomicU64::new(0),
            pages_written: AtomicU64::new(0),
            commits: AtomicU64::new(0),
            aborts: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        self.snapshot().hit_rate()
    }

    /// Get a non-atomic copy for display and comparison.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            pages_read: self.pages_read.load(Ordering::Relaxed),
            pages_written: self.pages_written.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            aborts: self.aborts.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.cache_hits,
            &self.cache_misses,
            &self.evictions,
            &self.pages_read,
            &self.pages_written,
            &self.commits,
            &self.aborts,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for BufferPoolStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of buffer pool statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
    pub pages_read: u64,
    pub pages_written: u64,
    pub commits: u64,
    pub aborts: u64,
}

impl StatsSnapshot {
    /// Cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ hits: {}, misses: {}, evictions: {}, hit_rate: {:.2}%, commits: {}, aborts: {} }}",
            self.cache_hits,
            self.cache_misses,
            self.evictions,
            self.hit_rate() * 100.0,
            self.commits,
            self.aborts
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = BufferPoolStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_stats_snapshot() {
        let stats = BufferPoolStats::new();
        stats.cache_hits.fetch_add(7, Ordering::Relaxed);
        stats.cache_misses.fetch_add(3, Ordering::Relaxed);
        BufferPoolStats::bump(&stats.commits);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.cache_hits, 7);
        assert_eq!(snapshot.cache_misses, 3);
        assert_eq!(snapshot.commits, 1);
        assert_eq!(snapshot.hit_rate(), 0.7);
    }

    #[test]
    fn test_stats_reset() {
        let stats = BufferPoolStats::new();
        stats.cache_hits.fetch_add(100, Ordering::Relaxed);
        BufferPoolStats::bump(&stats.aborts);

        stats.reset();

        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_stats_display() {
        let stats = BufferPoolStats::new();
        stats.cache_hits.fetch_add(80, Ordering::Relaxed);
        stats.cache_misses.fetch_add(20, Ordering::Relaxed);
        stats.evictions.fetch_add(5, Ordering::Relaxed);

        let display = stats.snapshot().to_string();

        assert!(display.contains("hits: 80"));
        assert!(display.contains("misses: 20"));
        assert!(display.contains("80.00%"));
    }
}
