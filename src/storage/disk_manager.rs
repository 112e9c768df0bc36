//! Disk Manager - low-level file I/O for one table file.
//!
//! The [`DiskManager`] handles all direct file operations:
//! - Reading and writing pages
//! - Allocating new pages
//! - Managing the table file

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::{Error, Result};

/// Manages disk I/O for a single table file.
///
/// # File Layout
/// The table is stored as a single file with pages laid out sequentially:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0     S        2S      ...       N×S      (S = page_size)
/// ```
///
/// # Thread Safety
/// `DiskManager` is **single-threaded**. The owning table file wraps it in a
/// mutex.
///
/// # Durability
/// Writes and allocations are followed by `sync_data()`.
pub struct DiskManager {
    file: File,
    page_size: usize,
    /// Number of pages in the file.
    page_count: u32,
}

impl DiskManager {
    /// Create a new table file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            page_size,
            page_count: 0,
        })
    }

    /// Open an existing table file.
    ///
    /// A trailing partial page (from a torn allocation) is ignored.
    pub fn open<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let file_size = file.metadata()?.len();
        let page_count = (file_size / page_size as u64) as u32;

        Ok(Self {
            file,
            page_size,
            page_count,
        })
    }

    /// Open an existing table file, or create it if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path, page_size)
        } else {
            Self::create(path, page_size)
        }
    }

    /// Read page `page_no` from disk.
    ///
    /// # Errors
    /// Returns `Error::PageOutOfRange` if the page doesn't exist.
    pub fn read_page(&mut self, page_no: u32) -> Result<Vec<u8>> {
        self.check_range(page_no)?;

        self.file.seek(SeekFrom::Start(self.offset(page_no)))?;
        let mut data = vec![0u8; self.page_size];
        self.file.read_exact(&mut data)?;

        Ok(data)
    }

    /// Write page `page_no` to disk.
    ///
    /// The page must have been previously allocated with `allocate_page()`.
    pub fn write_page(&mut self, page_no: u32, data: &[u8]) -> Result<()> {
        self.check_range(page_no)?;
        if data.len() != self.page_size {
            return Err(Error::PageSizeMismatch {
                expected: self.page_size,
                actual: data.len(),
            });
        }

        self.file.seek(SeekFrom::Start(self.offset(page_no)))?;
        self.file.write_all(data)?;
        self.file.sync_data()?;

        Ok(())
    }

    /// Append a zero-filled page to the file and return its page number.
    pub fn allocate_page(&mut self) -> Result<u32> {
        let page_no = self.page_count;

        self.file.seek(SeekFrom::Start(self.offset(page_no)))?;
        self.file.write_all(&vec![0u8; self.page_size])?;
        self.file.sync_data()?;

        self.page_count += 1;
        log::debug!("allocated page {} ({} pages in file)", page_no, self.page_count);
        Ok(page_no)
    }

    /// Get the number of pages in the file.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Get the total size of the file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        (self.page_count as u64) * (self.page_size as u64)
    }

    fn offset(&self, page_no: u32) -> u64 {
        (page_no as u64) * (self.page_size as u64)
    }

    fn check_range(&self, page_no: u32) -> Result<()> {
        if page_no >= self.page_count {
            return Err(Error::PageOutOfRange {
                page_no,
                page_count: self.page_count,
            });
        }
        Ok(())
    }
}
