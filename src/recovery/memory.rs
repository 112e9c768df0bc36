//! In-memory write-ahead log for testing.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::common::{Error, Result, TransactionId};
use crate::recovery::log_record::LogRecord;
use crate::recovery::wal::WriteAheadLog;
use crate::storage::Page;

#[derive(Debug, Default)]
struct Records {
    appended: Vec<LogRecord>,
    /// Length of the prefix of `appended` made durable by `force`.
    durable: usize,
}

/// A log that keeps records in a `Vec`.
///
/// It tracks which prefix has been forced, and can be told to fail every
/// `force` so that commit failure paths can be exercised.
#[derive(Debug, Default)]
pub struct InMemoryLog {
    records: Mutex<Records>,
    fail_force: AtomicBool,
}

impl InMemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `force` calls fail (or succeed again).
    pub fn set_fail_force(&self, fail: bool) {
        self.fail_force.store(fail, Ordering::Relaxed);
    }

    /// Every appended record, durable or not.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().appended.clone()
    }

    /// Records covered by a successful `force`.
    pub fn durable_records(&self) -> Vec<LogRecord> {
        let records = self.records.lock();
        records.appended[..records.durable].to_vec()
    }

    fn append(&self, record: LogRecord) {
        self.records.lock().appended.push(record);
    }
}

impl WriteAheadLog for InMemoryLog {
    fn log_write(&self, tid: TransactionId, before: &Page, after: &Page) -> Result<()> {
        self.append(LogRecord::Update {
            tid,
            page_id: after.id(),
            before: before.data().to_vec(),
            after: after.data().to_vec(),
        });
        Ok(())
    }

    fn log_commit(&self, tid: TransactionId) -> Result<()> {
        self.append(LogRecord::Commit { tid });
        Ok(())
    }

    fn log_abort(&self, tid: TransactionId) -> Result<()> {
        self.append(LogRecord::Abort { tid });
        Ok(())
    }

    fn force(&self) -> Result<()> {
        if self.fail_force.load(Ordering::Relaxed) {
            return Err(Error::LogForceFailed("injected failure".to_string()));
        }
        let mut records = self.records.lock();
        records.durable = records.appended.len();
        Ok(())
    }
}
