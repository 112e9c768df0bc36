//! Write-ahead logging.
//!
//! - [`WriteAheadLog`] - what the buffer pool logs through at commit
//! - [`FileLog`] - append-only, checksummed log file
//! - [`InMemoryLog`] - log kept in memory, with injectable force failures
//! - [`LogRecord`] - record types and their encoding
//!
//! Recovery replay is not implemented; [`FileLog::read_records`] decodes a
//! log for inspection.

mod log_file;
mod log_record;
mod memory;
mod wal;

pub use log_file::FileLog;
pub use log_record::LogRecord;
pub use memory::InMemoryLog;
pub use wal::WriteAheadLog;
