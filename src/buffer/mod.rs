//! Buffer pool management.
//!
//! The buffer pool is the transactional cache layer between table files and
//! disk. Every page access takes a page lock, and dirty pages stay in memory
//! until their transaction commits or aborts.
//!
//! # Components
//! - [`BufferPool`] - The page cache and commit/abort protocol
//! - [`BufferPoolStats`] - Performance statistics
//! - [`replacer`] - Eviction policy implementations

mod buffer_pool;
pub mod replacer;
mod stats;

pub use buffer_pool::BufferPool;
pub use stats::{BufferPoolStats, StatsSnapshot};
