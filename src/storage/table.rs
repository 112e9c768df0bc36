//! Interfaces between the buffer pool and durable storage.
//!
//! - [`PageStore`] - what the buffer pool needs to load and write back pages
//! - [`TableFile`] - one table's file plus its tuple-level access methods

use crate::buffer::BufferPool;
use crate::common::{PageId, Result, TableId, TransactionId};
use crate::storage::page::Page;
use crate::storage::tuple::Tuple;

/// Durable page storage addressed by [`PageId`].
///
/// The unit of I/O is one fixed-size page. Implementations must be safe to
/// call from several threads.
pub trait PageStore: Send + Sync {
    /// Read the current on-disk contents of a page.
    fn read_page(&self, pid: PageId) -> Result<Page>;

    /// Write a page's current bytes to its slot.
    fn write_page(&self, page: &Page) -> Result<()>;

    /// Number of pages stored for a table.
    fn num_pages(&self, table_id: TableId) -> Result<u32>;

    /// Size of every page in bytes.
    fn page_size(&self) -> usize;
}

/// One table's backing file.
///
/// Tuple mutations never write to disk. They fetch pages through the pool
/// (taking exclusive locks), change private copies, and return the modified
/// pages so the pool can mark them dirty and cache them.
pub trait TableFile: Send + Sync {
    fn id(&self) -> TableId;

    fn num_pages(&self) -> u32;

    fn read_page(&self, pid: PageId) -> Result<Page>;

    fn write_page(&self, page: &Page) -> Result<()>;

    /// Insert a tuple on behalf of `tid`, returning every page it modified.
    fn insert_tuple(&self, pool: &BufferPool, tid: TransactionId, tuple: Tuple)
        -> Result<Vec<Page>>;

    /// Delete a stored tuple on behalf of `tid`, returning every page it modified.
    fn delete_tuple(&self, pool: &BufferPool, tid: TransactionId, tuple: &Tuple)
        -> Result<Vec<Page>>;

    /// Read every tuple visible to `tid`, taking shared locks page by page.
    fn scan(&self, pool: &BufferPool, tid: TransactionId) -> Result<Vec<Tuple>>;
}
