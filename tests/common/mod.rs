//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use lockstepdb::{
    BufferPool, BufferPoolConfig, Catalog, DiskManager, InMemoryLog, PageId, TableId,
};
use tempfile::{tempdir, TempDir};

pub const PAGE_SIZE: usize = 64;
pub const TUPLE_SIZE: usize = 8;
/// floor(64 * 8 / (8 * 8 + 1))
pub const SLOTS_PER_PAGE: usize = 7;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Pool config with a short lock re-check interval.
pub fn config(capacity: usize) -> BufferPoolConfig {
    BufferPoolConfig::default()
        .with_capacity(capacity)
        .with_lock_wait_interval(Duration::from_millis(5))
}

pub struct TestDb {
    pub dir: TempDir,
    pub catalog: Arc<Catalog>,
    pub log: Arc<InMemoryLog>,
    pub pool: Arc<BufferPool>,
}

impl TestDb {
    pub fn new(capacity: usize) -> Self {
        init_logging();
        let dir = tempdir().unwrap();
        let catalog = Arc::new(Catalog::new(PAGE_SIZE));
        let log = Arc::new(InMemoryLog::new());
        let pool = Arc::new(BufferPool::new(
            catalog.clone(),
            log.clone(),
            config(capacity),
        ));

        Self {
            dir,
            catalog,
            log,
            pool,
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Create a heap table file with `pages` zeroed pages and register it.
    pub fn table_with_pages(&self, name: &str, pages: u32) -> TableId {
        let path = self.path(name);
        {
            let mut disk = DiskManager::create(&path, PAGE_SIZE).unwrap();
            for _ in 0..pages {
                disk.allocate_page().unwrap();
            }
        }
        self.catalog.open_heap_table(&path, TUPLE_SIZE).unwrap()
    }

    pub fn page(&self, table: TableId, page_no: u32) -> PageId {
        PageId::new(table, page_no)
    }
}

/// A tuple whose bytes are all `value`.
pub fn tuple(value: u8) -> lockstepdb::Tuple {
    lockstepdb::Tuple::new(vec![value; TUPLE_SIZE])
}
