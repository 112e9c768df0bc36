//! Catalog - the set of open tables, routed by [`TableId`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result, TableId};
use crate::storage::heap::HeapFile;
use crate::storage::page::Page;
use crate::storage::table::{PageStore, TableFile};

/// Registry of table files sharing one page size.
///
/// The catalog is the buffer pool's [`PageStore`]: page reads and writes are
/// forwarded to the table named by `PageId::table_id`.
///
/// # Example
/// ```no_run
/// use lockstepdb::Catalog;
///
/// let catalog = Catalog::new(4096);
/// let users = catalog.create_heap_table("users.tbl", 64)?;
/// assert!(catalog.table(users).is_ok());
/// # Ok::<(), lockstepdb::Error>(())
/// ```
pub struct Catalog {
    tables: RwLock<HashMap<TableId, Arc<dyn TableFile>>>,
    next_table_id: AtomicU32,
    page_size: usize,
}

impl Catalog {
    pub fn new(page_size: usize) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            next_table_id: AtomicU32::new(1),
            page_size,
        }
    }

    /// Allocate a table id not yet used by this catalog.
    pub fn next_table_id(&self) -> TableId {
        TableId(self.next_table_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a new heap file at `path` and register it.
    pub fn create_heap_table<P: AsRef<Path>>(&self, path: P, tuple_size: usize) -> Result<TableId> {
        let id = self.next_table_id();
        let file = HeapFile::create(id, path, self.page_size, tuple_size)?;
        self.add_table(Arc::new(file));
        Ok(id)
    }

    /// Open an existing heap file at `path` and register it.
    pub fn open_heap_table<P: AsRef<Path>>(&self, path: P, tuple_size: usize) -> Result<TableId> {
        let id = self.next_table_id();
        let file = HeapFile::open(id, path, self.page_size, tuple_size)?;
        self.add_table(Arc::new(file));
        Ok(id)
    }

    /// Register a table file under its own id, replacing any previous entry.
    pub fn add_table(&self, table: Arc<dyn TableFile>) {
        let id = table.id();
        // Keep generated ids clear of externally chosen ones.
        self.next_table_id.fetch_max(id.0 + 1, Ordering::Relaxed);
        log::debug!("registered {}", id);
        self.tables.write().insert(id, table);
    }

    pub fn table(&self, id: TableId) -> Result<Arc<dyn TableFile>> {
        self.tables
            .read()
            .get(&id)
            .cloned()
            .ok_or(Error::TableNotFound(id))
    }

    /// Registered table ids in ascending order.
    pub fn table_ids(&self) -> Vec<TableId> {
        let mut ids: Vec<_> = self.tables.read().keys().copied().collect();
        ids.sort();
        ids
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

impl PageStore for Catalog {
    fn read_page(&self, pid: PageId) -> Result<Page> {
        self.table(pid.table_id)?.read_page(pid)
    }

    fn write_page(&self, page: &Page) -> Result<()> {
        self.table(page.id().table_id)?.write_page(page)
    }

    fn num_pages(&self, table_id: TableId) -> Result<u32> {
        Ok(self.table(table_id)?.num_pages())
    }

    fn page_size(&self) -> usize {
        self.page_size
    }
}
