//! Configuration constants and the buffer pool configuration.

use std::time::Duration;

/// Default size of a page in bytes (4KB).
///
/// Matches the OS page size on most systems. A [`Catalog`](crate::storage::Catalog)
/// can be built with a smaller page size; tests do this to force page splits
/// and evictions with only a handful of tuples.
pub const PAGE_SIZE: usize = 4096;

/// Default number of pages the buffer pool caches.
pub const DEFAULT_POOL_PAGES: usize = 50;

/// Default interval after which a blocked lock request re-checks the lock
/// tables, even if no release woke it up.
pub const DEFAULT_LOCK_WAIT_INTERVAL: Duration = Duration::from_millis(50);

/// Tunables for a [`BufferPool`](crate::buffer::BufferPool).
///
/// # Example
/// ```
/// use std::time::Duration;
/// use lockstepdb::BufferPoolConfig;
///
/// let config = BufferPoolConfig::default()
///     .with_capacity(8)
///     .with_lock_wait_interval(Duration::from_millis(10));
/// assert_eq!(config.capacity, 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Maximum number of pages held in the cache.
    pub capacity: usize,

    /// Upper bound on how long a lock waiter sleeps between re-checks.
    pub lock_wait_interval: Duration,
}

impl BufferPoolConfig {
    /// Set the cache capacity in pages.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the lock re-check interval.
    pub fn with_lock_wait_interval(mut self, interval: Duration) -> Self {
        self.lock_wait_interval = interval;
        self
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_POOL_PAGES,
            lock_wait_interval: DEFAULT_LOCK_WAIT_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        assert!(PAGE_SIZE.is_power_of_two());
        assert_eq!(PAGE_SIZE, 4096);
    }

    #[test]
    fn test_default_config() {
        let config = BufferPoolConfig::default();
        assert_eq!(config.capacity, DEFAULT_POOL_PAGES);
        assert_eq!(config.lock_wait_interval, DEFAULT_LOCK_WAIT_INTERVAL);
    }

    #[test]
    fn test_builder_overrides() {
        let config = BufferPoolConfig::default()
            .with_capacity(3)
            .with_lock_wait_interval(Duration::from_millis(5));
        assert_eq!(config.capacity, 3);
        assert_eq!(config.lock_wait_interval, Duration::from_millis(5));
    }
}
