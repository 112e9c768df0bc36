//! Page - the in-memory image of one on-disk page.
//!
//! A [`Page`] carries the raw bytes of a page together with the bookkeeping the
//! buffer pool needs for transactions: which transaction last dirtied it and a
//! before-image of its last committed contents.

use std::fmt;
use std::sync::Arc;

use crate::common::{PageId, TransactionId};

/// A page of data plus its transactional bookkeeping.
///
/// # Snapshots
/// The buffer pool hands out pages as `Arc<Page>`. A cached page is never
/// mutated in place; a table file that wants to change a page clones it,
/// edits the clone through [`data_mut`](Page::data_mut) and returns the clone,
/// which the pool then swaps into its cache while the writer holds the
/// exclusive lock. Readers holding an older `Arc` keep a consistent snapshot.
///
/// # Before-image
/// The before-image is the page as of its last load or successful commit. It
/// is shared (`Arc<[u8]>`) between clones, so cloning a page copies only the
/// current bytes. Only the buffer pool can refresh it or set the dirty owner.
///
/// # Example
/// ```
/// use lockstepdb::{Page, PageId, TableId};
///
/// let pid = PageId::new(TableId::new(1), 0);
/// let mut page = Page::new(pid, vec![0u8; 64]);
/// page.data_mut()[0] = 0xFF;
///
/// assert_eq!(page.data()[0], 0xFF);
/// assert_eq!(page.before_image_data()[0], 0);
/// assert!(page.dirtied_by().is_none());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Page {
    id: PageId,
    data: Box<[u8]>,
    before_image: Arc<[u8]>,
    dirtied_by: Option<TransactionId>,
}

impl Page {
    /// Wrap freshly loaded bytes. The before-image starts equal to `data`.
    pub fn new(id: PageId, data: Vec<u8>) -> Self {
        let data = data.into_boxed_slice();
        let before_image = Arc::from(&data[..]);
        Self {
            id,
            data,
            before_image,
            dirtied_by: None,
        }
    }

    /// Create a zero-filled page of `size` bytes.
    pub fn zeroed(id: PageId, size: usize) -> Self {
        Self::new(id, vec![0u8; size])
    }

    #[inline]
    pub fn id(&self) -> PageId {
        self.id
    }

    /// Current page bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable page bytes. Only meaningful on a private clone.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Size of the page in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// The transaction that last dirtied this page, if it is dirty.
    #[inline]
    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirtied_by.is_some()
    }

    /// Bytes of the page as of its last load or commit.
    #[inline]
    pub fn before_image_data(&self) -> &[u8] {
        &self.before_image
    }

    /// The before-image as a clean page of its own, e.g. for a log record.
    pub fn before_image(&self) -> Page {
        Page {
            id: self.id,
            data: Box::from(&self.before_image[..]),
            before_image: Arc::clone(&self.before_image),
            dirtied_by: None,
        }
    }

    /// Set or clear the dirty owner.
    pub(crate) fn mark_dirty(&mut self, tid: Option<TransactionId>) {
        self.dirtied_by = tid;
    }

    /// Capture the current bytes as the new before-image.
    pub(crate) fn set_before_image(&mut self) {
        self.before_image = Arc::from(&self.data[..]);
    }

    /// This page after a successful commit: clean, with its current bytes as
    /// the before-image.
    pub(crate) fn committed(&self) -> Page {
        let mut page = self.clone();
        page.set_before_image();
        page.mark_dirty(None);
        page
    }

    /// This page rolled back to its before-image and marked clean.
    pub(crate) fn rolled_back(&self) -> Page {
        self.before_image()
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("size", &self.data.len())
            .field("dirtied_by", &self.dirtied_by)
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
