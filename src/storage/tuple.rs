//! Tuples and record identifiers.
//!
//! Tuples are opaque fixed-width byte records; schema typing lives above
//! this crate.

use std::fmt;

use crate::common::PageId;

/// Location of a stored tuple: its page and slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: u16,
}

impl RecordId {
    #[inline]
    pub fn new(page_id: PageId, slot: u16) -> Self {
        Self { page_id, slot }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.page_id, self.slot)
    }
}

/// A tuple: raw bytes plus where it lives, once stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    data: Vec<u8>,
    record_id: Option<RecordId>,
}

impl Tuple {
    /// A tuple that has not been stored yet.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            record_id: None,
        }
    }

    pub(crate) fn stored(data: Vec<u8>, record_id: RecordId) -> Self {
        Self {
            data,
            record_id: Some(record_id),
        }
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }
}
