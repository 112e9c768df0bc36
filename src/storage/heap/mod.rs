//! Heap tables: fixed-width tuples in slotted pages.
//!
//! - [`HeapFile`] - the table file
//! - [`HeapPageLayout`] - slot bitmap and offsets within one page

mod file;
mod page;

pub use file::HeapFile;
pub use page::HeapPageLayout;
