//! The write-ahead log interface the buffer pool commits through.

use crate::common::{Result, TransactionId};
use crate::storage::Page;

/// Append-only log of page changes and transaction outcomes.
///
/// Appends may be buffered; nothing is durable until [`force`](Self::force)
/// returns `Ok`. The buffer pool forces the log before writing any page of a
/// committing transaction to the page store.
pub trait WriteAheadLog: Send + Sync {
    /// Record that `tid` changed `before` into `after`. Both pages share an id.
    fn log_write(&self, tid: TransactionId, before: &Page, after: &Page) -> Result<()>;

    fn log_commit(&self, _tid: TransactionId) -> Result<()> {
        Ok(())
    }

    fn log_abort(&self, _tid: TransactionId) -> Result<()> {
        Ok(())
    }

    /// Make every appended record durable.
    fn force(&self) -> Result<()>;
}
