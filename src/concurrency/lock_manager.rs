//! Page-level lock manager for strict two-phase locking.
//!
//! Locks are shared or exclusive and keyed by [`PageId`]. A transaction that is
//! the sole shared holder of a page can upgrade in place. Blocked requests wait
//! on a condition variable and are re-checked against a waits-for graph on
//! every pass; a request whose wait would close a cycle fails with
//! [`Error::TransactionAborted`].

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::common::config::DEFAULT_LOCK_WAIT_INTERVAL;
use crate::common::{Error, PageId, Result, TransactionId};
use crate::concurrency::waits_for::WaitsForGraph;

/// Lock modes supported by the lock manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Shared lock for read access.
    Shared,
    /// Exclusive lock for write access.
    Exclusive,
}

impl LockMode {
    /// Whether two different transactions may hold these modes at once.
    pub fn is_compatible_with(&self, other: &LockMode) -> bool {
        matches!((self, other), (LockMode::Shared, LockMode::Shared))
    }
}

/// All lock bookkeeping. Lives behind the manager's single mutex.
#[derive(Debug, Default)]
struct LockTable {
    shared: HashMap<PageId, HashSet<TransactionId>>,
    exclusive: HashMap<PageId, TransactionId>,
    /// Pages locked by each transaction, in either mode.
    owned: HashMap<TransactionId, HashSet<PageId>>,
    /// The request each blocked transaction is waiting on.
    waiting: HashMap<TransactionId, (PageId, LockMode)>,
    graph: WaitsForGraph,
}

impl LockTable {
    /// Transactions whose locks on `pid` prevent granting `mode` to `tid`.
    fn conflicting_holders(
        &self,
        tid: TransactionId,
        pid: PageId,
        mode: LockMode,
    ) -> HashSet<TransactionId> {
        let exclusive = self
            .exclusive
            .get(&pid)
            .map(|&holder| (holder, LockMode::Exclusive));
        let shared = self
            .shared
            .get(&pid)
            .into_iter()
            .flatten()
            .map(|&reader| (reader, LockMode::Shared));

        exclusive
            .into_iter()
            .chain(shared)
            .filter(|&(holder, held)| holder != tid && !mode.is_compatible_with(&held))
            .map(|(holder, _)| holder)
            .collect()
    }

    /// Grant the lock if possible, otherwise return the blocking holders.
    fn try_grant(
        &mut self,
        tid: TransactionId,
        pid: PageId,
        mode: LockMode,
    ) -> std::result::Result<(), HashSet<TransactionId>> {
        if self.exclusive.get(&pid) == Some(&tid) {
            // Already exclusive: covers both modes.
            return Ok(());
        }

        let holders = self.conflicting_holders(tid, pid, mode);
        if !holders.is_empty() {
            return Err(holders);
        }

        match mode {
            LockMode::Shared => {
                self.shared.entry(pid).or_default().insert(tid);
            }
            LockMode::Exclusive => {
                // Either unlocked or an upgrade of our own shared lock.
                self.shared.remove(&pid);
                self.exclusive.insert(pid, tid);
            }
        }
        self.owned.entry(tid).or_default().insert(pid);
        Ok(())
    }

    /// Remove `tid`'s lock on `pid`. Returns whether it held one.
    fn remove_lock(&mut self, tid: TransactionId, pid: PageId) -> bool {
        let mut removed = false;

        if self.exclusive.get(&pid) == Some(&tid) {
            self.exclusive.remove(&pid);
            removed = true;
        }
        if let Some(readers) = self.shared.get_mut(&pid) {
            removed |= readers.remove(&tid);
            if readers.is_empty() {
                self.shared.remove(&pid);
            }
        }
        if let Some(pages) = self.owned.get_mut(&tid) {
            pages.remove(&pid);
            if pages.is_empty() {
                self.owned.remove(&tid);
            }
        }

        removed
    }

    fn stop_waiting(&mut self, tid: TransactionId) {
        self.waiting.remove(&tid);
        self.graph.clear_waits(tid);
    }

    /// Recompute the out-edges of every transaction waiting on `pid`.
    ///
    /// Edges may only shrink here; new holders are picked up, with a cycle
    /// check, on the waiter's next pass.
    fn refresh_waiters(&mut self, pid: PageId) {
        let waiters: Vec<_> = self
            .waiting
            .iter()
            .filter(|(_, &(wpid, _))| wpid == pid)
            .map(|(&tid, &(_, mode))| (tid, mode))
            .collect();

        for (waiter, mode) in waiters {
            let current = self.conflicting_holders(waiter, pid, mode);
            let kept = match self.graph.waits_on(waiter) {
                Some(previous) => current.intersection(previous).copied().collect(),
                None => HashSet::new(),
            };
            self.graph.set_waits(waiter, kept);
        }
    }

    fn mode_of(&self, tid: TransactionId, pid: PageId) -> Option<LockMode> {
        if self.exclusive.get(&pid) == Some(&tid) {
            Some(LockMode::Exclusive)
        } else if self.shared.get(&pid).is_some_and(|r| r.contains(&tid)) {
            Some(LockMode::Shared)
        } else {
            None
        }
    }
}

/// Shared/exclusive page locks with deadlock detection.
///
/// # Thread Safety
/// Every table mutation happens under one `parking_lot::Mutex`. Blocked
/// callers park on a `Condvar` that each release notifies, and wake at least
/// every `wait_interval` to re-check.
///
/// # Example
/// ```
/// use lockstepdb::{LockManager, LockMode, PageId, TableId, TransactionId};
///
/// let locks = LockManager::default();
/// let pid = PageId::new(TableId::new(1), 0);
/// let (t1, t2) = (TransactionId::new(1), TransactionId::new(2));
///
/// locks.acquire(t1, pid, LockMode::Shared)?;
/// locks.acquire(t2, pid, LockMode::Shared)?;
/// assert!(!locks.try_acquire(t1, pid, LockMode::Exclusive));
///
/// locks.release_all(t2);
/// assert!(locks.try_acquire(t1, pid, LockMode::Exclusive));
/// # Ok::<(), lockstepdb::Error>(())
/// ```
pub struct LockManager {
    table: Mutex<LockTable>,
    released: Condvar,
    wait_interval: Duration,
    deadlocks: AtomicU64,
    waits: AtomicU64,
}

impl LockManager {
    pub fn new(wait_interval: Duration) -> Self {
        Self {
            table: Mutex::new(LockTable::default()),
            released: Condvar::new(),
            wait_interval,
            deadlocks: AtomicU64::new(0),
            waits: AtomicU64::new(0),
        }
    }

    /// Block until `tid` holds `pid` in `mode`.
    ///
    /// # Errors
    /// `Error::TransactionAborted(tid)` if waiting would deadlock. The caller
    /// is expected to abort the transaction, which releases its locks.
    pub fn acquire(&self, tid: TransactionId, pid: PageId, mode: LockMode) -> Result<()> {
        let mut table = self.table.lock();

        loop {
            let holders = match table.try_grant(tid, pid, mode) {
                Ok(()) => {
                    table.stop_waiting(tid);
                    log::trace!("{} granted {:?} on {}", tid, mode, pid);
                    return Ok(());
                }
                Err(holders) => holders,
            };

            if table.graph.would_deadlock(tid, &holders) {
                table.stop_waiting(tid);
                self.deadlocks.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "{} aborted: {:?} on {} would deadlock with {:?}",
                    tid,
                    mode,
                    pid,
                    holders
                );
                return Err(Error::TransactionAborted(tid));
            }

            if table.waiting.insert(tid, (pid, mode)).is_none() {
                self.waits.fetch_add(1, Ordering::Relaxed);
                log::debug!("{} waiting for {:?} on {} held by {:?}", tid, mode, pid, holders);
            }
            table.graph.set_waits(tid, holders);

            self.released.wait_for(&mut table, self.wait_interval);
        }
    }

    /// One non-blocking attempt. Never records a wait.
    pub fn try_acquire(&self, tid: TransactionId, pid: PageId, mode: LockMode) -> bool {
        let granted = self.table.lock().try_grant(tid, pid, mode).is_ok();
        if granted {
            log::trace!("{} granted {:?} on {}", tid, mode, pid);
        }
        granted
    }

    /// Drop `tid`'s lock on `pid`. A no-op if it holds none.
    pub fn release(&self, tid: TransactionId, pid: PageId) {
        let mut table = self.table.lock();
        if table.remove_lock(tid, pid) {
            table.refresh_waiters(pid);
            drop(table);
            self.released.notify_all();
        }
    }

    /// Drop every lock `tid` holds and forget it in the waits-for graph.
    pub fn release_all(&self, tid: TransactionId) {
        let mut table = self.table.lock();

        let pages: Vec<_> = table
            .owned
            .get(&tid)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default();
        for &pid in &pages {
            table.remove_lock(tid, pid);
        }

        table.waiting.remove(&tid);
        table.graph.remove_transaction(tid);
        for &pid in &pages {
            table.refresh_waiters(pid);
        }
        drop(table);

        log::trace!("{} released {} locks", tid, pages.len());
        self.released.notify_all();
    }

    pub fn holds(&self, tid: TransactionId, pid: PageId) -> bool {
        self.table
            .lock()
            .owned
            .get(&tid)
            .is_some_and(|pages| pages.contains(&pid))
    }

    pub fn lock_mode(&self, tid: TransactionId, pid: PageId) -> Option<LockMode> {
        self.table.lock().mode_of(tid, pid)
    }

    /// Pages `tid` holds a lock on, sorted.
    pub fn pages_locked(&self, tid: TransactionId) -> Vec<PageId> {
        let mut pages: Vec<_> = self
            .table
            .lock()
            .owned
            .get(&tid)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default();
        pages.sort();
        pages
    }

    /// Number of requests refused because waiting would deadlock.
    pub fn deadlocks_detected(&self) -> u64 {
        self.deadlocks.load(Ordering::Relaxed)
    }

    /// Number of requests that had to wait at least once.
    pub fn lock_waits(&self) -> u64 {
        self.waits.load(Ordering::Relaxed)
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_WAIT_INTERVAL)
    }
}

// ============================================================================
// TESTS
// ============================================================================
