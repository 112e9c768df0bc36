//! lockstepdb - A transactional buffer pool with page-level two-phase locking.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           lockstepdb                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │        Table Files (storage/heap)  HeapFile              │   │
//! │  │   insert / delete / scan through the buffer pool         │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Buffer Pool (buffer/)                       │   │
//! │  │   fetch → lock → cache hit | load (evict LRU clean)      │   │
//! │  │   commit: log + force + write │ abort: before-images     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │           ↓                    ↓                    ↓           │
//! │  ┌────────────────┐  ┌──────────────────┐  ┌────────────────┐  │
//! │  │ concurrency/   │  │ recovery/        │  │ storage/       │  │
//! │  │ LockManager    │  │ WriteAheadLog    │  │ Catalog        │  │
//! │  │ WaitsForGraph  │  │ FileLog          │  │ DiskManager    │  │
//! │  └────────────────┘  └──────────────────┘  └────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, TransactionId, Error, config)
//! - [`buffer`] - The buffer pool, its replacer and statistics
//! - [`concurrency`] - Page locks and deadlock detection
//! - [`recovery`] - Write-ahead logging
//! - [`storage`] - Disk I/O, pages, heap tables and the catalog
//!
//! # Quick Start
//! ```no_run
//! use std::sync::Arc;
//! use lockstepdb::{BufferPool, BufferPoolConfig, Catalog, FileLog, Tuple};
//!
//! let catalog = Arc::new(Catalog::default());
//! let users = catalog.create_heap_table("users.tbl", 64)?;
//! let log = Arc::new(FileLog::open("lockstep.log")?);
//! let pool = BufferPool::new(catalog, log, BufferPoolConfig::default());
//!
//! let tid = pool.begin_transaction();
//! match pool.insert_tuple(tid, users, Tuple::new(vec![0; 64])) {
//!     Ok(()) => pool.complete_transaction(tid, true)?,
//!     Err(e) if e.is_transaction_aborted() => pool.complete_transaction(tid, false)?,
//!     Err(e) => return Err(e),
//! }
//! # Ok::<(), lockstepdb::Error>(())
//! ```

pub mod buffer;
pub mod common;
pub mod concurrency;
pub mod recovery;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{BufferPoolConfig, PAGE_SIZE};
pub use common::{Error, PageId, Permissions, Result, TableId, TransactionId};

pub use buffer::{BufferPool, BufferPoolStats, StatsSnapshot};
pub use concurrency::{LockManager, LockMode};
pub use recovery::{FileLog, InMemoryLog, LogRecord, WriteAheadLog};
pub use storage::{Catalog, DiskManager, HeapFile, Page, PageStore, RecordId, TableFile, Tuple};
