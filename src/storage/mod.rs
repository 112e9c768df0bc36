//! Storage layer - disk I/O, page formats and tables.
//!
//! This module handles persistent storage:
//! - [`DiskManager`] - Low-level file I/O for one table file
//! - [`Page`] - In-memory page image with before-image and dirty owner
//! - [`PageStore`] / [`TableFile`] - What the buffer pool reads from and writes to
//! - [`heap`] - Fixed-width heap tables
//! - [`Catalog`] - Table registry, routing page I/O by table id

mod catalog;
mod disk_manager;
pub mod heap;
pub mod page;
mod table;
mod tuple;

pub use catalog::Catalog;
pub use disk_manager::DiskManager;
pub use heap::HeapFile;
pub use page::Page;
pub use table::{PageStore, TableFile};
pub use tuple::{RecordId, Tuple};
