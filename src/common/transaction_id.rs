//! Transaction identifier type.

use std::fmt;

/// Identifies a transaction.
///
/// A `TransactionId` is an opaque value with no state of its own: the locks a
/// transaction holds live in the [`LockManager`](crate::concurrency::LockManager)
/// and the pages it dirtied are the cached pages carrying its id as owner.
/// Ids are handed out by [`BufferPool::begin_transaction`](crate::buffer::BufferPool::begin_transaction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Create a new TransactionId.
    #[inline]
    pub fn new(id: u64) -> Self {
        TransactionId(id)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txn({})", self.0)
    }
}
