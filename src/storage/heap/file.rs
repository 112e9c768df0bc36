//! HeapFile - an unordered table of fixed-width tuples.

use std::path::Path;

use parking_lot::Mutex;

use crate::buffer::BufferPool;
use crate::common::{Error, PageId, Permissions, Result, TableId, TransactionId};
use crate::storage::disk_manager::DiskManager;
use crate::storage::heap::page::HeapPageLayout;
use crate::storage::page::Page;
use crate::storage::table::TableFile;
use crate::storage::tuple::{RecordId, Tuple};

/// A heap table backed by one file of slotted pages.
///
/// Tuple operations go through the buffer pool for every page they touch, so
/// they take page locks and see uncommitted writes of their own transaction.
/// The disk mutex only guards raw file I/O and is never held across a call
/// into the pool.
pub struct HeapFile {
    id: TableId,
    layout: HeapPageLayout,
    disk: Mutex<DiskManager>,
}

impl HeapFile {
    /// Create a new, empty heap file at `path`.
    pub fn create<P: AsRef<Path>>(
        id: TableId,
        path: P,
        page_size: usize,
        tuple_size: usize,
    ) -> Result<Self> {
        let layout = HeapPageLayout::new(page_size, tuple_size)?;
        let disk = DiskManager::create(path, page_size)?;
        Ok(Self::with_disk(id, layout, disk))
    }

    /// Open an existing heap file at `path`.
    pub fn open<P: AsRef<Path>>(
        id: TableId,
        path: P,
        page_size: usize,
        tuple_size: usize,
    ) -> Result<Self> {
        let layout = HeapPageLayout::new(page_size, tuple_size)?;
        let disk = DiskManager::open(path, page_size)?;
        Ok(Self::with_disk(id, layout, disk))
    }

    fn with_disk(id: TableId, layout: HeapPageLayout, disk: DiskManager) -> Self {
        Self {
            id,
            layout,
            disk: Mutex::new(disk),
        }
    }

    #[inline]
    pub fn tuple_size(&self) -> usize {
        self.layout.tuple_size()
    }

    /// Tuple slots per page.
    #[inline]
    pub fn slots_per_page(&self) -> usize {
        self.layout.num_slots()
    }

    fn page_id(&self, page_no: u32) -> PageId {
        PageId::new(self.id, page_no)
    }

    fn check_page(&self, pid: PageId) -> Result<()> {
        if pid.table_id != self.id {
            return Err(Error::PageNotFound(pid));
        }
        Ok(())
    }

    /// Place `data` in the first free slot of `page`, returning the modified
    /// copy and its record id.
    fn place(&self, page: &Page, data: &[u8]) -> Option<(Page, RecordId)> {
        let slot = self.layout.free_slot(page.data())?;
        let mut copy = page.clone();
        self.layout.write_tuple(copy.data_mut(), slot, data);
        Some((copy, RecordId::new(page.id(), slot)))
    }
}

impl TableFile for HeapFile {
    fn id(&self) -> TableId {
        self.id
    }

    fn num_pages(&self) -> u32 {
        self.disk.lock().page_count()
    }

    fn read_page(&self, pid: PageId) -> Result<Page> {
        self.check_page(pid)?;
        let data = self.disk.lock().read_page(pid.page_no)?;
        Ok(Page::new(pid, data))
    }

    fn write_page(&self, page: &Page) -> Result<()> {
        self.check_page(page.id())?;
        self.disk.lock().write_page(page.id().page_no, page.data())
    }

    fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: Tuple,
    ) -> Result<Vec<Page>> {
        if tuple.data().len() != self.tuple_size() {
            return Err(Error::TupleSizeMismatch {
                expected: self.tuple_size(),
                actual: tuple.data().len(),
            });
        }

        let mut page_no = 0;
        loop {
            {
                // Check and grow under one guard so racing inserters share the new page.
                let mut disk = self.disk.lock();
                if page_no >= disk.page_count() {
                    let allocated = disk.allocate_page()?;
                    log::debug!("{} grew to {} pages for {}", self.id, allocated + 1, tid);
                    page_no = allocated;
                }
            }

            let pid = self.page_id(page_no);
            let held_before = pool.holds_lock(tid, pid);
            let page = pool.fetch(tid, pid, Permissions::ReadWrite)?;

            if let Some((modified, rid)) = self.place(&page, tuple.data()) {
                log::trace!("{} placed tuple at {}", tid, rid);
                return Ok(vec![modified]);
            }

            // Full page. Keep the lock if it was ours before this scan.
            if !held_before {
                pool.release_lock(tid, pid);
            }
            page_no += 1;
        }
    }

    fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<Page>> {
        let rid = tuple.record_id().ok_or(Error::MissingRecordId)?;
        let pid = rid.page_id;
        self.check_page(pid)?;
        if pid.page_no >= self.num_pages() {
            return Err(Error::PageNotFound(pid));
        }

        let page = pool.fetch(tid, pid, Permissions::ReadWrite)?;
        if !self.layout.is_slot_used(page.data(), rid.slot) {
            return Err(Error::TupleNotFound(rid));
        }

        let mut modified = (*page).clone();
        self.layout.clear_tuple(modified.data_mut(), rid.slot);
        Ok(vec![modified])
    }

    fn scan(&self, pool: &BufferPool, tid: TransactionId) -> Result<Vec<Tuple>> {
        let mut tuples = Vec::new();
        for page_no in 0..self.num_pages() {
            let page = pool.fetch(tid, self.page_id(page_no), Permissions::ReadOnly)?;
            for slot in self.layout.used_slots(page.data()) {
                let data = self.layout.read_tuple(page.data(), slot).to_vec();
                tuples.push(Tuple::stored(data, RecordId::new(page.id(), slot)));
            }
        }
        Ok(tuples)
    }
}
