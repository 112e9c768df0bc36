//! Buffer Pool - the transactional page cache.
//!
//! The [`BufferPool`] provides:
//! - Page caching between the page store and memory
//! - Page locking through the [`LockManager`] on every fetch
//! - No-steal LRU eviction of clean pages
//! - Force-at-commit and before-image rollback at abort

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::replacer::LruReplacer;
use crate::buffer::BufferPoolStats;
use crate::common::config::BufferPoolConfig;
use crate::common::{Error, PageId, Permissions, Result, TableId, TransactionId};
use crate::concurrency::{LockManager, LockMode};
use crate::recovery::WriteAheadLog;
use crate::storage::{Catalog, Page, PageStore, Tuple};

/// Everything guarded by the pool mutex.
struct PoolState {
    /// Cached pages, at most `capacity` of them.
    pages: HashMap<PageId, Arc<Page>>,

    /// Recency order; only clean pages are evictable.
    replacer: LruReplacer,

    /// Transactions that have begun or fetched and not yet completed.
    active: HashSet<TransactionId>,

    /// Pages whose stored bytes differ from the cached copy outside the
    /// normal dirty state: uncommitted contents written by a flush (abort
    /// must write the before-image back), or committed contents whose write
    /// failed. Clean members stay pinned until `flush_page` succeeds.
    unsynced: HashSet<PageId>,
}

/// A capacity-bounded, transaction-aware page cache.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                         BufferPool                          │
/// │  ┌─────────────────────────────────────┐  ┌──────────────┐  │
/// │  │ state: Mutex<PoolState>             │  │ lock_manager │  │
/// │  │  pages    PageId → Arc<Page>        │  │ S/X locks +  │  │
/// │  │  replacer LruReplacer               │  │ waits-for    │  │
/// │  │  active   {TransactionId}           │  └──────────────┘  │
/// │  │  unsynced {PageId}                  │  ┌──────────────┐  │
/// │  └─────────────────────────────────────┘  │ catalog      │  │
/// │  ┌──────────────┐  ┌──────────────┐       │ (PageStore)  │  │
/// │  │ log (WAL)    │  │ stats        │       └──────────────┘  │
/// │  └──────────────┘  └──────────────┘                         │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `lock_manager`: page locks; the only place a caller can block
/// - `state`: one `Mutex`; page-store and log I/O happen while it is held
/// - `stats`: atomic counters
///
/// A page lock is always acquired before the pool mutex, never while holding it.
///
/// # Transactions
/// Pages are handed out as immutable `Arc<Page>` snapshots. Table files
/// change private copies and the pool installs them marked dirty by the
/// writing transaction. Dirty pages stay in memory until the transaction
/// completes: commit logs, forces, then writes them; abort restores their
/// before-images. Locks are released only at completion (strict 2PL), unless
/// [`release_lock`](Self::release_lock) is used.
///
/// # Usage
/// ```
/// use std::sync::Arc;
/// use lockstepdb::{BufferPool, BufferPoolConfig, Catalog, InMemoryLog, Tuple};
///
/// let dir = tempfile::tempdir()?;
/// let catalog = Arc::new(Catalog::new(256));
/// let table = catalog.create_heap_table(dir.path().join("t.tbl"), 16)?;
/// let pool = BufferPool::new(catalog, Arc::new(InMemoryLog::new()), BufferPoolConfig::default());
///
/// let tid = pool.begin_transaction();
/// pool.insert_tuple(tid, table, Tuple::new(vec![7; 16]))?;
/// pool.complete_transaction(tid, true)?;
///
/// let reader = pool.begin_transaction();
/// assert_eq!(pool.scan(reader, table)?.len(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct BufferPool {
    state: Mutex<PoolState>,
    lock_manager: LockManager,
    catalog: Arc<Catalog>,
    log: Arc<dyn WriteAheadLog>,
    stats: BufferPoolStats,
    capacity: usize,
    next_tid: AtomicU64,
}

impl BufferPool {
    /// Create a buffer pool over `catalog`, committing through `log`.
    ///
    /// # Panics
    /// Panics if `config.capacity` is 0.
    pub fn new(catalog: Arc<Catalog>, log: Arc<dyn WriteAheadLog>, config: BufferPoolConfig) -> Self {
        assert!(config.capacity > 0, "capacity must be > 0");

        Self {
            state: Mutex::new(PoolState {
                pages: HashMap::with_capacity(config.capacity),
                replacer: LruReplacer::new(),
                active: HashSet::new(),
                unsynced: HashSet::new(),
            }),
            lock_manager: LockManager::new(config.lock_wait_interval),
            catalog,
            log,
            stats: BufferPoolStats::new(),
            capacity: config.capacity,
            next_tid: AtomicU64::new(1),
        }
    }

    /// Start a transaction and return its id.
    pub fn begin_transaction(&self) -> TransactionId {
        let tid = TransactionId(self.next_tid.fetch_add(1, Ordering::Relaxed));
        self.state.lock().active.insert(tid);
        log::debug!("began {}", tid);
        tid
    }

    // ========================================================================
    // Public API: Fetch pages
    // ========================================================================

    /// Lock `pid` for `tid` and return the page.
    ///
    /// Blocks while another transaction holds a conflicting lock. On a miss
    /// with a full cache, the least recently used clean page is evicted. The
    /// lock stays held even if loading the page fails.
    ///
    /// # Errors
    /// - `Error::TransactionAborted` if waiting for the lock would deadlock
    /// - `Error::StorageExhausted` if every cached page is dirty
    /// - page store errors while loading the page
    pub fn fetch(&self, tid: TransactionId, pid: PageId, perm: Permissions) -> Result<Arc<Page>> {
        self.lock_manager.acquire(tid, pid, perm.lock_mode())?;

        let mut state = self.state.lock();
        state.active.insert(tid);

        if let Some(page) = state.pages.get(&pid).cloned() {
            state.replacer.record_access(pid);
            BufferPoolStats::bump(&self.stats.cache_hits);
            log::trace!("{} hit {} ({:?})", tid, pid, perm);
            return Ok(page);
        }

        BufferPoolStats::bump(&self.stats.cache_misses);
        if state.pages.len() >= self.capacity {
            self.evict_page(&mut state)?;
        }

        let page = Arc::new(self.catalog.read_page(pid)?);
        BufferPoolStats::bump(&self.stats.pages_read);
        log::debug!("{} loaded {} ({:?})", tid, pid, perm);

        state.pages.insert(pid, Arc::clone(&page));
        state.replacer.record_access(pid);
        state.replacer.set_evictable(pid, true);
        Ok(page)
    }

    // ========================================================================
    // Public API: Tuple operations
    // ========================================================================

    /// Insert `tuple` into `table_id` on behalf of `tid`.
    pub fn insert_tuple(&self, tid: TransactionId, table_id: TableId, tuple: Tuple) -> Result<()> {
        let table = self.catalog.table(table_id)?;
        let pages = table.insert_tuple(self, tid, tuple)?;
        self.install_dirty(tid, pages)
    }

    /// Delete a stored tuple on behalf of `tid`.
    ///
    /// # Errors
    /// `Error::MissingRecordId` if the tuple was never stored.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        let rid = tuple.record_id().ok_or(Error::MissingRecordId)?;
        let table = self.catalog.table(rid.page_id.table_id)?;
        let pages = table.delete_tuple(self, tid, tuple)?;
        self.install_dirty(tid, pages)
    }

    /// Every tuple of `table_id` as seen by `tid`, taking shared locks.
    pub fn scan(&self, tid: TransactionId, table_id: TableId) -> Result<Vec<Tuple>> {
        self.catalog.table(table_id)?.scan(self, tid)
    }

    /// Mark pages modified by `tid` dirty and swap them into the cache.
    fn install_dirty(&self, tid: TransactionId, pages: Vec<Page>) -> Result<()> {
        let mut state = self.state.lock();

        for mut page in pages {
            let pid = page.id();
            debug_assert_eq!(
                self.lock_manager.lock_mode(tid, pid),
                Some(LockMode::Exclusive),
                "{} modified {} without an exclusive lock",
                tid,
                pid
            );

            if !state.pages.contains_key(&pid) && state.pages.len() >= self.capacity {
                self.evict_page(&mut state)?;
            }

            page.mark_dirty(Some(tid));
            state.pages.insert(pid, Arc::new(page));
            state.replacer.record_access(pid);
            state.replacer.set_evictable(pid, false);
            log::trace!("{} dirtied {}", tid, pid);
        }

        Ok(())
    }

    // ========================================================================
    // Public API: Transaction completion
    // ========================================================================

    /// Commit (`commit == true`) or abort `tid`, then release its locks.
    ///
    /// # Commit
    /// Every page dirtied by `tid` is logged with its before- and after-image,
    /// a commit record is appended and the log forced. Only then are the
    /// pages written to the page store, marked clean, and given their new
    /// contents as before-image.
    ///
    /// Once the commit record is forced the transaction is committed. A page
    /// that then fails to reach the store stays cached as committed and
    /// pinned, and [`flush_page`](Self::flush_page) retries the write.
    ///
    /// # Abort
    /// Every page dirtied by `tid` gets its before-image back. Aborting a
    /// transaction that already completed only releases leftover locks.
    ///
    /// # Errors
    /// - commit, before the log is forced: nothing changes, the locks stay
    ///   held, and the caller should abort
    /// - commit, after the log is forced: the first page-store error, reported
    ///   once the transaction has committed and released its locks
    /// - abort: a failed write-back or abort record, reported after the locks
    ///   are released
    pub fn complete_transaction(&self, tid: TransactionId, commit: bool) -> Result<()> {
        if commit {
            self.commit(tid)
        } else {
            self.abort(tid)
        }
    }

    /// Commit `tid`.
    pub fn transaction_complete(&self, tid: TransactionId) -> Result<()> {
        self.complete_transaction(tid, true)
    }

    fn commit(&self, tid: TransactionId) -> Result<()> {
        let mut state = self.state.lock();
        let dirty = Self::dirtied_by(&state, tid);

        for page in &dirty {
            self.log.log_write(tid, &page.before_image(), page)?;
        }
        self.log.log_commit(tid)?;
        self.log.force()?;

        // Committed from here on. Write failures must not undo any page.
        let mut written = Ok(());
        for page in &dirty {
            let pid = page.id();
            let synced = match self.catalog.write_page(page) {
                Ok(()) => {
                    BufferPoolStats::bump(&self.stats.pages_written);
                    state.unsynced.remove(&pid);
                    true
                }
                Err(e) => {
                    log::warn!("{} committed but {} was not written: {}", tid, pid, e);
                    state.unsynced.insert(pid);
                    if written.is_ok() {
                        written = Err(e);
                    }
                    false
                }
            };

            state.pages.insert(pid, Arc::new(page.committed()));
            state.replacer.set_evictable(pid, synced);
        }

        state.active.remove(&tid);
        drop(state);

        self.lock_manager.release_all(tid);
        BufferPoolStats::bump(&self.stats.commits);
        log::info!("committed {} ({} pages)", tid, dirty.len());
        written
    }

    fn abort(&self, tid: TransactionId) -> Result<()> {
        let mut state = self.state.lock();
        if !state.active.contains(&tid) {
            drop(state);
            self.lock_manager.release_all(tid);
            log::debug!("ignored abort of completed {}", tid);
            return Ok(());
        }
        let dirty = Self::dirtied_by(&state, tid);
        let mut write_back = Ok(());

        for page in &dirty {
            let pid = page.id();
            let restored = page.rolled_back();
            let mut evictable = true;

            if state.unsynced.contains(&pid) {
                match self.catalog.write_page(&restored) {
                    Ok(()) => {
                        BufferPoolStats::bump(&self.stats.pages_written);
                        state.unsynced.remove(&pid);
                    }
                    Err(e) => {
                        // Keep it cached so the store's stale bytes are never
                        // reloaded; flush_page retries the write.
                        log::warn!("{} could not restore {} in the page store: {}", tid, pid, e);
                        evictable = false;
                        if write_back.is_ok() {
                            write_back = Err(e);
                        }
                    }
                }
            }

            state.pages.insert(pid, Arc::new(restored));
            state.replacer.set_evictable(pid, evictable);
        }

        state.active.remove(&tid);
        drop(state);

        let logged = self.log.log_abort(tid);
        self.lock_manager.release_all(tid);
        BufferPoolStats::bump(&self.stats.aborts);
        log::info!("aborted {} ({} pages restored)", tid, dirty.len());

        write_back.and(logged)
    }

    // ========================================================================
    // Public API: Locks
    // ========================================================================

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_manager.holds(tid, pid)
    }

    /// Release one lock before the transaction completes.
    ///
    /// This breaks strict two-phase locking. Only use it for pages the
    /// transaction has neither modified nor depends on, e.g. a full heap page
    /// skipped during insert.
    pub fn release_lock(&self, tid: TransactionId, pid: PageId) {
        self.lock_manager.release(tid, pid);
    }

    // ========================================================================
    // Public API: Flush and discard
    // ========================================================================

    /// Drop a page from the cache without writing it. Unwritten changes are lost.
    pub fn discard_page(&self, pid: PageId) {
        let mut state = self.state.lock();
        if state.pages.remove(&pid).is_some() {
            state.replacer.remove(pid);
            state.unsynced.remove(&pid);
            log::debug!("discarded {}", pid);
        }
    }

    /// Write a cached page to the page store if it is dirty.
    ///
    /// The log is forced first (after an update record if the owner is
    /// still active). A page owned by an active transaction stays dirty and
    /// owned, so abort can still undo it from the store.
    pub fn flush_page(&self, pid: PageId) -> Result<()> {
        let mut state = self.state.lock();
        self.flush_locked(&mut state, pid)
    }

    /// Flush every cached page.
    ///
    /// Under no-steal this can write uncommitted data to the store. It exists
    /// for shutdown and tests.
    pub fn flush_all_pages(&self) -> Result<()> {
        let mut state = self.state.lock();
        let mut pids: Vec<_> = state.pages.keys().copied().collect();
        pids.sort();

        for pid in pids {
            self.flush_locked(&mut state, pid)?;
        }
        Ok(())
    }

    /// Flush only the pages dirtied by `tid`.
    pub fn flush_pages(&self, tid: TransactionId) -> Result<()> {
        let mut state = self.state.lock();
        for page in Self::dirtied_by(&state, tid) {
            self.flush_locked(&mut state, page.id())?;
        }
        Ok(())
    }

    fn flush_locked(&self, state: &mut PoolState, pid: PageId) -> Result<()> {
        let Some(page) = state.pages.get(&pid).cloned() else {
            return Ok(());
        };

        match page.dirtied_by() {
            Some(owner) => {
                let live = state.active.contains(&owner);
                if live {
                    self.log.log_write(owner, &page.before_image(), &page)?;
                }
                self.log.force()?;
                self.catalog.write_page(&page)?;
                BufferPoolStats::bump(&self.stats.pages_written);

                if live {
                    state.unsynced.insert(pid);
                    log::debug!("flushed {} while {} is active", pid, owner);
                } else {
                    state.pages.insert(pid, Arc::new(page.committed()));
                    state.replacer.set_evictable(pid, true);
                    state.unsynced.remove(&pid);
                    log::debug!("flushed {}", pid);
                }
            }
            // Clean, but the store missed a write-back after abort or commit.
            None if state.unsynced.contains(&pid) => {
                self.catalog.write_page(&page)?;
                BufferPoolStats::bump(&self.stats.pages_written);
                state.unsynced.remove(&pid);
                state.replacer.set_evictable(pid, true);
                log::debug!("restored {} in the page store", pid);
            }
            None => {}
        }

        Ok(())
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn cached_page_count(&self) -> usize {
        self.state.lock().pages.len()
    }

    pub fn is_cached(&self, pid: PageId) -> bool {
        self.state.lock().pages.contains_key(&pid)
    }

    /// Cached pages currently dirtied by `tid`, sorted.
    pub fn dirty_pages(&self, tid: TransactionId) -> Vec<PageId> {
        Self::dirtied_by(&self.state.lock(), tid)
            .iter()
            .map(|page| page.id())
            .collect()
    }

    pub fn active_transaction_count(&self) -> usize {
        self.state.lock().active.len()
    }

    pub fn is_active(&self, tid: TransactionId) -> bool {
        self.state.lock().active.contains(&tid)
    }

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    // ========================================================================
    // Internal
    // ========================================================================

    /// Pages dirtied by `tid`, in `PageId` order.
    fn dirtied_by(state: &PoolState, tid: TransactionId) -> Vec<Arc<Page>> {
        let mut pages: Vec<_> = state
            .pages
            .values()
            .filter(|page| page.dirtied_by() == Some(tid))
            .cloned()
            .collect();
        pages.sort_by_key(|page| page.id());
        pages
    }

    /// Drop the least recently used clean page.
    fn evict_page(&self, state: &mut PoolState) -> Result<()> {
        let Some(victim) = state.replacer.evict() else {
            log::warn!("buffer pool exhausted: all {} cached pages are dirty", self.capacity);
            return Err(Error::StorageExhausted {
                capacity: self.capacity,
            });
        };

        state.pages.remove(&victim);
        BufferPoolStats::bump(&self.stats.evictions);
        log::debug!("evicted {}", victim);
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
