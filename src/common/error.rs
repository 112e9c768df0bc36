//! Error types for lockstepdb.

use thiserror::Error;

use super::{PageId, TableId, TransactionId};
use crate::storage::RecordId;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in lockstepdb.
///
/// A single error type keeps propagation uniform between the lock manager,
/// the buffer pool and the storage collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from a table file or the log file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page does not exist in its table.
    #[error("{0} not found")]
    PageNotFound(PageId),

    /// A disk manager was asked for a page beyond the end of its file.
    #[error("page {page_no} out of range (file has {page_count} pages)")]
    PageOutOfRange { page_no: u32, page_count: u32 },

    /// Page bytes handed to the store do not match the configured page size.
    #[error("page size mismatch: expected {expected} bytes, got {actual}")]
    PageSizeMismatch { expected: usize, actual: usize },

    /// No table with this id is registered in the catalog.
    #[error("{0} not found in catalog")]
    TableNotFound(TableId),

    /// Tuples of this width cannot fit on a page.
    #[error("invalid tuple size {tuple_size} for page size {page_size}")]
    InvalidTupleSize { tuple_size: usize, page_size: usize },

    /// Tuple width does not match the table's fixed width.
    #[error("tuple size mismatch: table stores {expected} bytes, got {actual}")]
    TupleSizeMismatch { expected: usize, actual: usize },

    /// A delete was requested for a tuple that was never stored.
    #[error("tuple has no record id")]
    MissingRecordId,

    /// The slot named by a record id is empty.
    #[error("tuple {0} not found")]
    TupleNotFound(RecordId),

    /// The lock manager aborted the transaction to break a deadlock.
    ///
    /// Callers must roll back with
    /// `complete_transaction(tid, false)`; the core never retries.
    #[error("{0} aborted: waiting would deadlock")]
    TransactionAborted(TransactionId),

    /// Every cached page is dirty, so nothing can be evicted without
    /// stealing uncommitted work.
    #[error("buffer pool exhausted: all {capacity} cached pages are dirty")]
    StorageExhausted { capacity: usize },

    /// A log file record failed framing or checksum validation.
    #[error("log corrupted at offset {offset}: {reason}")]
    LogCorrupted { offset: u64, reason: String },

    /// The log could not be made durable.
    #[error("log force failed: {0}")]
    LogForceFailed(String),
}

impl Error {
    /// Whether this error means the transaction must be rolled back.
    pub fn is_transaction_aborted(&self) -> bool {
        matches!(self, Error::TransactionAborted(_))
    }
}
