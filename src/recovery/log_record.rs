//! Log record types and their on-disk encoding.
//!
//! # Record Format
//! All integers are little-endian.
//! ```text
//! ┌──────┬─────┬───────┬──────┬────────────┬────────┬───────────┬───────┬───────┐
//! │ kind │ tid │ table │ page │ before_len │ before │ after_len │ after │ crc32 │
//! │ u8   │ u64 │ u32   │ u32  │ u32        │ bytes  │ u32       │ bytes │ u32   │
//! └──────┴─────┴───────┴──────┴────────────┴────────┴───────────┴───────┴───────┘
//! ```
//! The CRC covers every byte before it. Commit and abort records carry a zero
//! page id and empty images.

use crate::common::{Error, PageId, Result, TableId, TransactionId};

const KIND_UPDATE: u8 = 1;
const KIND_COMMIT: u8 = 2;
const KIND_ABORT: u8 = 3;

/// kind + tid + table + page + before_len
const HEADER_LEN: usize = 1 + 8 + 4 + 4 + 4;
const CRC_LEN: usize = 4;

/// One entry in the write-ahead log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    /// A page changed from `before` to `after` on behalf of `tid`.
    Update {
        tid: TransactionId,
        page_id: PageId,
        before: Vec<u8>,
        after: Vec<u8>,
    },
    Commit {
        tid: TransactionId,
    },
    Abort {
        tid: TransactionId,
    },
}

impl LogRecord {
    pub fn tid(&self) -> TransactionId {
        match self {
            LogRecord::Update { tid, .. } | LogRecord::Commit { tid } | LogRecord::Abort { tid } => {
                *tid
            }
        }
    }

    fn kind(&self) -> u8 {
        match self {
            LogRecord::Update { .. } => KIND_UPDATE,
            LogRecord::Commit { .. } => KIND_COMMIT,
            LogRecord::Abort { .. } => KIND_ABORT,
        }
    }

    /// Serialize into the on-disk format, checksum included.
    pub fn encode(&self) -> Vec<u8> {
        let empty: &[u8] = &[];
        let (page_id, before, after) = match self {
            LogRecord::Update {
                page_id,
                before,
                after,
                ..
            } => (*page_id, before.as_slice(), after.as_slice()),
            _ => (PageId::new(TableId(0), 0), empty, empty),
        };

        let mut buf = Vec::with_capacity(HEADER_LEN + before.len() + 4 + after.len() + CRC_LEN);
        buf.push(self.kind());
        buf.extend_from_slice(&self.tid().0.to_le_bytes());
        buf.extend_from_slice(&page_id.table_id.0.to_le_bytes());
        buf.extend_from_slice(&page_id.page_no.to_le_bytes());
        buf.extend_from_slice(&(before.len() as u32).to_le_bytes());
        buf.extend_from_slice(before);
        buf.extend_from_slice(&(after.len() as u32).to_le_bytes());
        buf.extend_from_slice(after);

        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        buf
    }

    /// Decode one record from the front of `buf`.
    ///
    /// `offset` is the position of `buf` in the log and is only used in
    /// error reports. Returns the record and the number of bytes consumed.
    pub fn decode(buf: &[u8], offset: u64) -> Result<(LogRecord, usize)> {
        let corrupted = |reason: &str| Error::LogCorrupted {
            offset,
            reason: reason.to_string(),
        };

        let mut reader = Reader { buf, pos: 0 };
        let kind = reader.u8().ok_or_else(|| corrupted("truncated header"))?;
        let tid = reader.u64().ok_or_else(|| corrupted("truncated header"))?;
        let table = reader.u32().ok_or_else(|| corrupted("truncated header"))?;
        let page_no = reader.u32().ok_or_else(|| corrupted("truncated header"))?;

        let before_len = reader.u32().ok_or_else(|| corrupted("truncated header"))?;
        let before = reader
            .bytes(before_len as usize)
            .ok_or_else(|| corrupted("truncated before-image"))?;
        let after_len = reader
            .u32()
            .ok_or_else(|| corrupted("truncated after-image length"))?;
        let after = reader
            .bytes(after_len as usize)
            .ok_or_else(|| corrupted("truncated after-image"))?;

        let body_len = reader.pos;
        let stored_crc = reader.u32().ok_or_else(|| corrupted("truncated checksum"))?;
        if crc32fast::hash(&buf[..body_len]) != stored_crc {
            return Err(corrupted("checksum mismatch"));
        }

        let tid = TransactionId(tid);
        let record = match kind {
            KIND_UPDATE => LogRecord::Update {
                tid,
                page_id: PageId::new(TableId(table), page_no),
                before: before.to_vec(),
                after: after.to_vec(),
            },
            KIND_COMMIT => LogRecord::Commit { tid },
            KIND_ABORT => LogRecord::Abort { tid },
            other => return Err(corrupted(&format!("unknown record kind {}", other))),
        };

        Ok((record, reader.pos))
    }
}

/// Bounds-checked little-endian cursor.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let slice = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn u8(&mut self) -> Option<u8> {
        self.bytes(1).map(|b| b[0])
    }

    fn u32(&mut self) -> Option<u32> {
        self.bytes(4)
            .and_then(|b| b.try_into().ok())
            .map(u32::from_le_bytes)
    }

    fn u64(&mut self) -> Option<u64> {
        self.bytes(8)
            .and_then(|b| b.try_into().ok())
            .map(u64::from_le_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update() -> LogRecord {
        LogRecord::Update {
            tid: TransactionId(7),
            page_id: PageId::new(TableId(2), 11),
            before: vec![0; 16],
            after: vec![0xAB; 16],
        }
    }

    #[test]
    fn test_update_layout() {
        let bytes = update().encode();

        assert_eq!(bytes.len(), HEADER_LEN + 16 + 4 + 16 + CRC_LEN);
        assert_eq!(bytes[0], KIND_UPDATE);
        assert_eq!(&bytes[1..9], &7u64.to_le_bytes());
        assert_eq!(&bytes[9..13], &2u32.to_le_bytes());
        assert_eq!(&bytes[13..17], &11u32.to_le_bytes());

        let (decoded, used) = LogRecord::decode(&bytes, 0).unwrap();
        assert_eq!(decoded, update());
        assert_eq!(used, bytes.len());
    }

    #[test]
    fn test_commit_record_is_minimal() {
        let bytes = LogRecord::Commit { tid: TransactionId(3) }.encode();
        assert_eq!(bytes.len(), HEADER_LEN + 4 + CRC_LEN);

        let (decoded, _) = LogRecord::decode(&bytes, 0).unwrap();
        assert_eq!(decoded.tid(), TransactionId(3));
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut bytes = update().encode();
        bytes[HEADER_LEN + 3] ^= 0xFF;

        let err = LogRecord::decode(&bytes, 128).unwrap_err();
        assert!(matches!(err, Error::LogCorrupted { offset: 128, .. }));
    }

    #[test]
    fn test_truncated_record() {
        let bytes = update().encode();
        let err = LogRecord::decode(&bytes[..bytes.len() - 2], 0).unwrap_err();
        assert!(matches!(err, Error::LogCorrupted { .. }));
    }

    #[test]
    fn test_unknown_kind() {
        let mut bytes = LogRecord::Abort { tid: TransactionId(1) }.encode();
        bytes[0] = 9;
        let body = bytes.len() - CRC_LEN;
        let crc = crc32fast::hash(&bytes[..body]);
        bytes[body..].copy_from_slice(&crc.to_le_bytes());

        let err = LogRecord::decode(&bytes, 0).unwrap_err();
        assert!(err.to_string().contains("unknown record kind 9"));
    }
}
