//! Integration tests for commit, abort and eviction through the buffer pool.

mod common;

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use common::{tuple, TestDb, PAGE_SIZE, SLOTS_PER_PAGE, TUPLE_SIZE};
use lockstepdb::{
    BufferPool, Catalog, DiskManager, Error, FileLog, HeapFile, InMemoryLog, LogRecord, Page,
    PageId, PageStore, Permissions, Result, TableFile, TableId, TransactionId, Tuple,
};

fn values(pool: &BufferPool, table: TableId) -> Vec<u8> {
    let tid = pool.begin_transaction();
    let mut values: Vec<u8> = pool
        .scan(tid, table)
        .unwrap()
        .iter()
        .map(|t| t.data()[0])
        .collect();
    pool.complete_transaction(tid, true).unwrap();
    values.sort();
    values
}

/// Committed writes survive eviction and a fresh pool over the same files.
#[test]
fn test_commit_durability_after_eviction_and_reopen() {
    let db = TestDb::new(2);
    let table = db.table_with_pages("a.tbl", 0);
    let filler = db.table_with_pages("z.tbl", 3);

    let t1 = db.pool.begin_transaction();
    for v in 1..=3 {
        db.pool.insert_tuple(t1, table, tuple(v)).unwrap();
    }
    db.pool.complete_transaction(t1, true).unwrap();

    let reader = db.pool.begin_transaction();
    for n in 0..3 {
        db.pool
            .fetch(reader, db.page(filler, n), Permissions::ReadOnly)
            .unwrap();
    }
    db.pool.complete_transaction(reader, true).unwrap();
    assert!(!db.pool.is_cached(db.page(table, 0)));

    assert_eq!(values(&db.pool, table), vec![1, 2, 3]);

    let catalog = Arc::new(Catalog::new(PAGE_SIZE));
    let reopened = catalog.open_heap_table(db.path("a.tbl"), TUPLE_SIZE).unwrap();
    let pool = BufferPool::new(catalog, Arc::new(InMemoryLog::new()), common::config(4));
    assert_eq!(values(&pool, reopened), vec![1, 2, 3]);
}

/// After abort the page is byte-identical to its state before the transaction.
#[test]
fn test_abort_restores_exact_bytes() {
    let db = TestDb::new(4);
    let table = db.table_with_pages("a.tbl", 1);
    let pid = db.page(table, 0);

    let t1 = db.pool.begin_transaction();
    db.pool.insert_tuple(t1, table, tuple(10)).unwrap();
    db.pool.insert_tuple(t1, table, tuple(20)).unwrap();
    db.pool.complete_transaction(t1, true).unwrap();

    let t2 = db.pool.begin_transaction();
    let before = db.pool.fetch(t2, pid, Permissions::ReadOnly).unwrap().data().to_vec();
    db.pool.complete_transaction(t2, true).unwrap();

    let t3 = db.pool.begin_transaction();
    for v in 30..33 {
        db.pool.insert_tuple(t3, table, tuple(v)).unwrap();
    }
    let existing = db.pool.scan(t3, table).unwrap();
    db.pool.delete_tuple(t3, &existing[0]).unwrap();
    assert_ne!(
        db.pool.fetch(t3, pid, Permissions::ReadOnly).unwrap().data(),
        &before[..]
    );
    db.pool.complete_transaction(t3, false).unwrap();

    let t4 = db.pool.begin_transaction();
    let after = db.pool.fetch(t4, pid, Permissions::ReadOnly).unwrap();
    assert_eq!(after.data(), &before[..]);
    assert_eq!(db.catalog.read_page(pid).unwrap().data(), &before[..]);
    db.pool.complete_transaction(t4, true).unwrap();

    assert_eq!(values(&db.pool, table), vec![10, 20]);
}

/// Capacity 1: T1 dirties A, so T2 cannot bring in B until T1 completes.
#[test]
fn test_capacity_one_dirty_page_blocks_loads() {
    let db = TestDb::new(1);
    let a = db.table_with_pages("a.tbl", 1);
    let b = db.table_with_pages("b.tbl", 1);

    let t1 = db.pool.begin_transaction();
    let t2 = db.pool.begin_transaction();

    db.pool.insert_tuple(t1, a, tuple(1)).unwrap();
    let err = db.pool.insert_tuple(t2, b, tuple(2)).unwrap_err();
    assert!(matches!(err, Error::StorageExhausted { capacity: 1 }));
    assert!(db.pool.is_cached(db.page(a, 0)));

    db.pool.complete_transaction(t1, true).unwrap();

    db.pool.insert_tuple(t2, b, tuple(2)).unwrap();
    assert!(!db.pool.is_cached(db.page(a, 0)));
    db.pool.complete_transaction(t2, true).unwrap();

    assert_eq!(db.pool.cached_page_count(), 1);
    assert_eq!(values(&db.pool, a), vec![1]);
    assert_eq!(values(&db.pool, b), vec![2]);
}

/// Capacity 2: T1 dirties A, T2 dirties B; C cannot be loaded until T1 completes.
#[test]
fn test_capacity_two_third_page_waits_for_commit() {
    let db = TestDb::new(2);
    let a = db.table_with_pages("a.tbl", 1);
    let b = db.table_with_pages("b.tbl", 1);
    let c = db.table_with_pages("c.tbl", 1);

    let t1 = db.pool.begin_transaction();
    let t2 = db.pool.begin_transaction();
    db.pool.insert_tuple(t1, a, tuple(1)).unwrap();
    db.pool.insert_tuple(t2, b, tuple(2)).unwrap();

    let t3 = db.pool.begin_transaction();
    let err = db
        .pool
        .fetch(t3, db.page(c, 0), Permissions::ReadOnly)
        .unwrap_err();
    assert!(matches!(err, Error::StorageExhausted { .. }));
    assert_eq!(db.pool.cached_page_count(), 2);

    db.pool.complete_transaction(t1, true).unwrap();

    db.pool.fetch(t3, db.page(c, 0), Permissions::ReadOnly).unwrap();
    assert!(!db.pool.is_cached(db.page(a, 0)));
    assert!(db.pool.is_cached(db.page(b, 0)));
    assert_eq!(db.pool.dirty_pages(t2), vec![db.page(b, 0)]);

    db.pool.complete_transaction(t2, true).unwrap();
    db.pool.complete_transaction(t3, true).unwrap();
}

/// The cache never exceeds capacity and never drops an uncommitted page.
#[test]
fn test_cache_bound_keeps_dirty_pages() {
    let db = TestDb::new(3);
    let hot = db.table_with_pages("hot.tbl", 1);
    let cold = db.table_with_pages("cold.tbl", 10);

    let writer = db.pool.begin_transaction();
    db.pool.insert_tuple(writer, hot, tuple(9)).unwrap();

    let reader = db.pool.begin_transaction();
    for n in 0..10 {
        db.pool
            .fetch(reader, db.page(cold, n), Permissions::ReadOnly)
            .unwrap();
        assert!(db.pool.cached_page_count() <= 3);
        assert!(db.pool.is_cached(db.page(hot, 0)));
    }

    assert_eq!(db.pool.stats().snapshot().evictions, 8);
    db.pool.complete_transaction(writer, false).unwrap();
    db.pool.complete_transaction(reader, true).unwrap();
}

#[test]
fn test_release_lock_is_idempotent() {
    let db = TestDb::new(4);
    let table = db.table_with_pages("a.tbl", 1);
    let pid = db.page(table, 0);

    let tid = db.pool.begin_transaction();
    db.pool.fetch(tid, pid, Permissions::ReadOnly).unwrap();
    assert!(db.pool.holds_lock(tid, pid));

    db.pool.release_lock(tid, pid);
    db.pool.release_lock(tid, pid);
    assert!(!db.pool.holds_lock(tid, pid));
}

/// A failed log force leaves the transaction intact; abort then undoes it.
#[test]
fn test_commit_force_failure_then_abort() {
    let db = TestDb::new(4);
    let table = db.table_with_pages("a.tbl", 1);
    let pid = db.page(table, 0);

    let t1 = db.pool.begin_transaction();
    db.pool.insert_tuple(t1, table, tuple(5)).unwrap();

    db.log.set_fail_force(true);
    let err = db.pool.complete_transaction(t1, true).unwrap_err();
    assert!(matches!(err, Error::LogForceFailed(_)));

    let t2 = db.pool.begin_transaction();
    assert!(db.pool.holds_lock(t1, pid));
    assert!(!db
        .pool
        .lock_manager()
        .try_acquire(t2, pid, lockstepdb::LockMode::Shared));
    assert!(db.log.durable_records().is_empty());

    db.pool.complete_transaction(t1, false).unwrap();
    db.log.set_fail_force(false);

    assert!(values(&db.pool, table).is_empty());
    assert_eq!(db.pool.stats().snapshot().aborts, 1);
}

/// Pages written by a flush before commit are restored in the store on abort.
#[test]
fn test_abort_after_flush_restores_store() {
    let db = TestDb::new(4);
    let table = db.table_with_pages("a.tbl", 1);
    let pid = db.page(table, 0);

    let tid = db.pool.begin_transaction();
    db.pool.insert_tuple(tid, table, tuple(7)).unwrap();
    db.pool.flush_all_pages().unwrap();

    // slot 0 bit of the bitmap header
    assert_eq!(db.catalog.read_page(pid).unwrap().data()[0], 1);
    assert_eq!(db.pool.dirty_pages(tid), vec![pid]);

    db.pool.complete_transaction(tid, false).unwrap();
    assert_eq!(db.catalog.read_page(pid).unwrap().data()[0], 0);
}

#[test]
fn test_inserts_spill_onto_new_pages() {
    let db = TestDb::new(8);
    let table = db.table_with_pages("a.tbl", 0);

    let tid = db.pool.begin_transaction();
    for v in 0..(SLOTS_PER_PAGE * 2 + 1) as u8 {
        db.pool.insert_tuple(tid, table, tuple(v)).unwrap();
    }
    db.pool.complete_transaction(tid, true).unwrap();

    assert_eq!(db.catalog.num_pages(table).unwrap(), 3);
    assert_eq!(values(&db.pool, table).len(), SLOTS_PER_PAGE * 2 + 1);
}

#[test]
fn test_tuple_errors() {
    let db = TestDb::new(4);
    let table = db.table_with_pages("a.tbl", 1);
    let tid = db.pool.begin_transaction();

    let err = db
        .pool
        .insert_tuple(tid, table, Tuple::new(vec![0; TUPLE_SIZE + 1]))
        .unwrap_err();
    assert!(matches!(err, Error::TupleSizeMismatch { .. }));

    let err = db.pool.insert_tuple(tid, TableId(99), tuple(0)).unwrap_err();
    assert!(matches!(err, Error::TableNotFound(TableId(99))));

    db.pool.complete_transaction(tid, false).unwrap();
}

/// A file-backed log records updates before the commit record.
#[test]
fn test_file_log_records_commit_and_abort() {
    common::init_logging();
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("wal.log");

    let catalog = Arc::new(Catalog::new(PAGE_SIZE));
    let table = catalog
        .create_heap_table(dir.path().join("a.tbl"), TUPLE_SIZE)
        .unwrap();
    let log = Arc::new(FileLog::open(&log_path).unwrap());
    let pool = BufferPool::new(catalog, log, common::config(4));

    let t1 = pool.begin_transaction();
    pool.insert_tuple(t1, table, tuple(1)).unwrap();
    pool.complete_transaction(t1, true).unwrap();

    let t2 = pool.begin_transaction();
    pool.insert_tuple(t2, table, tuple(2)).unwrap();
    pool.complete_transaction(t2, false).unwrap();
    pool.flush_all_pages().unwrap();

    let records = FileLog::read_records(&log_path).unwrap();
    assert!(matches!(&records[0], LogRecord::Update { tid, .. } if *tid == t1));
    assert_eq!(records[1], LogRecord::Commit { tid: t1 });
    // The abort record is appended but only durable after the next force.
    assert_eq!(records.len(), 2);
    drop(pool);

    let records = FileLog::read_records(&log_path).unwrap();
    assert_eq!(records.last(), Some(&LogRecord::Abort { tid: t2 }));
}

/// A heap table whose writes to one page fail while `failing` is set.
struct FailingWrites {
    inner: HeapFile,
    page_no: u32,
    failing: AtomicBool,
}

impl TableFile for FailingWrites {
    fn id(&self) -> TableId {
        self.inner.id()
    }

    fn num_pages(&self) -> u32 {
        self.inner.num_pages()
    }

    fn read_page(&self, pid: PageId) -> Result<Page> {
        self.inner.read_page(pid)
    }

    fn write_page(&self, page: &Page) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) && page.id().page_no == self.page_no {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full").into());
        }
        self.inner.write_page(page)
    }

    fn insert_tuple(&self, pool: &BufferPool, tid: TransactionId, tuple: Tuple) -> Result<Vec<Page>> {
        self.inner.insert_tuple(pool, tid, tuple)
    }

    fn delete_tuple(&self, pool: &BufferPool, tid: TransactionId, tuple: &Tuple) -> Result<Vec<Page>> {
        self.inner.delete_tuple(pool, tid, tuple)
    }

    fn scan(&self, pool: &BufferPool, tid: TransactionId) -> Result<Vec<Tuple>> {
        self.inner.scan(pool, tid)
    }
}

/// A page write failing after the commit record is forced leaves the whole
/// transaction committed; a later abort cannot undo part of it.
#[test]
fn test_page_write_failure_after_commit_record() {
    let db = TestDb::new(4);
    let path = db.path("flaky.tbl");
    {
        let mut disk = DiskManager::create(&path, PAGE_SIZE).unwrap();
        disk.allocate_page().unwrap();
        disk.allocate_page().unwrap();
    }
    let table = Arc::new(FailingWrites {
        inner: HeapFile::open(TableId(50), &path, PAGE_SIZE, TUPLE_SIZE).unwrap(),
        page_no: 1,
        failing: AtomicBool::new(false),
    });
    db.catalog.add_table(table.clone());
    let (first, second) = (db.page(TableId(50), 0), db.page(TableId(50), 1));

    let t1 = db.pool.begin_transaction();
    for v in 0..=SLOTS_PER_PAGE as u8 {
        db.pool.insert_tuple(t1, TableId(50), tuple(v)).unwrap();
    }
    assert_eq!(db.pool.dirty_pages(t1), vec![first, second]);

    table.failing.store(true, Ordering::SeqCst);
    let err = db.pool.complete_transaction(t1, true).unwrap_err();
    assert!(matches!(err, Error::Io(_)));

    let durable = db.log.durable_records();
    assert_eq!(durable.len(), 3);
    assert_eq!(durable[2], LogRecord::Commit { tid: t1 });
    assert!(!db.pool.is_active(t1));
    assert!(!db.pool.holds_lock(t1, second));

    db.pool.complete_transaction(t1, false).unwrap();
    assert_eq!(db.pool.stats().snapshot().aborts, 0);
    assert!(db.pool.dirty_pages(t1).is_empty());
    assert!(db.pool.is_cached(second));
    assert_eq!(values(&db.pool, TableId(50)).len(), SLOTS_PER_PAGE + 1);

    // slot 0 bit of page 1 never reached the store
    assert_eq!(db.catalog.read_page(second).unwrap().data()[0], 0);
    table.failing.store(false, Ordering::SeqCst);
    db.pool.flush_page(second).unwrap();
    assert_eq!(db.catalog.read_page(second).unwrap().data()[0], 1);

    let catalog = Arc::new(Catalog::new(PAGE_SIZE));
    let reopened = catalog.open_heap_table(&path, TUPLE_SIZE).unwrap();
    let pool = BufferPool::new(catalog, Arc::new(InMemoryLog::new()), common::config(4));
    assert_eq!(values(&pool, reopened).len(), SLOTS_PER_PAGE + 1);
}
