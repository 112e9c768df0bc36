//! FileLog - a write-ahead log stored in one append-only file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::common::{Result, TransactionId};
use crate::recovery::log_record::LogRecord;
use crate::recovery::wal::WriteAheadLog;
use crate::storage::Page;

struct LogWriter {
    writer: BufWriter<File>,
    /// Bytes appended since the file was opened, durable or not.
    appended: u64,
}

/// Append-only log file.
///
/// Records are encoded as described in [`LogRecord`] and go through a
/// buffered writer; [`force`](WriteAheadLog::force) flushes the buffer and
/// calls `sync_data`.
///
/// # Example
/// ```no_run
/// use lockstepdb::{FileLog, LogRecord, TransactionId, WriteAheadLog};
///
/// let log = FileLog::open("db.log")?;
/// log.log_commit(TransactionId::new(1))?;
/// log.force()?;
///
/// let records = FileLog::read_records("db.log")?;
/// assert_eq!(records.last(), Some(&LogRecord::Commit { tid: TransactionId::new(1) }));
/// # Ok::<(), lockstepdb::Error>(())
/// ```
pub struct FileLog {
    path: PathBuf,
    inner: Mutex<LogWriter>,
}

impl FileLog {
    /// Open `path` for appending, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;

        Ok(Self {
            path: path.as_ref().to_path_buf(),
            inner: Mutex::new(LogWriter {
                writer: BufWriter::new(file),
                appended: 0,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes appended through this handle.
    pub fn appended_bytes(&self) -> u64 {
        self.inner.lock().appended
    }

    fn append(&self, record: &LogRecord) -> Result<()> {
        let bytes = record.encode();
        let mut inner = self.inner.lock();
        inner.writer.write_all(&bytes)?;
        inner.appended += bytes.len() as u64;
        Ok(())
    }

    /// Decode every record in the log at `path`.
    ///
    /// # Errors
    /// `Error::LogCorrupted` at the first record that fails framing or its
    /// checksum.
    pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<LogRecord>> {
        let bytes = std::fs::read(path)?;
        let mut records = Vec::new();
        let mut offset = 0;

        while offset < bytes.len() {
            let (record, used) = LogRecord::decode(&bytes[offset..], offset as u64)?;
            records.push(record);
            offset += used;
        }

        Ok(records)
    }
}

impl WriteAheadLog for FileLog {
    fn log_write(&self, tid: TransactionId, before: &Page, after: &Page) -> Result<()> {
        self.append(&LogRecord::Update {
            tid,
            page_id: after.id(),
            before: before.data().to_vec(),
            after: after.data().to_vec(),
        })
    }

    fn log_commit(&self, tid: TransactionId) -> Result<()> {
        self.append(&LogRecord::Commit { tid })
    }

    fn log_abort(&self, tid: TransactionId) -> Result<()> {
        self.append(&LogRecord::Abort { tid })
    }

    fn force(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.writer.flush()?;
        inner.writer.get_ref().sync_data()?;
        log::debug!("forced log {} ({} bytes)", self.path.display(), inner.appended);
        Ok(())
    }
}
