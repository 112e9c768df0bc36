//! Slotted layout for fixed-width heap pages.
//!
//! # Layout
//! ```text
//! ┌──────────────────────┬─────────┬─────────┬─────┬──────────┬─────────┐
//! │ used-slot bitmap     │ slot 0  │ slot 1  │ ... │ slot n-1 │ padding │
//! │ ceil(n / 8) bytes    │ width w │ width w │     │          │         │
//! └──────────────────────┴─────────┴─────────┴─────┴──────────┴─────────┘
//! n = floor(page_size * 8 / (w * 8 + 1))
//! ```
//! Slot `i` is used when bit `i % 8` (LSB first) of bitmap byte `i / 8` is set.

use crate::common::{Error, Result};

/// Geometry of a heap page for one tuple width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapPageLayout {
    tuple_size: usize,
    num_slots: usize,
    header_len: usize,
}

impl HeapPageLayout {
    /// Compute the layout for `tuple_size`-byte tuples on `page_size`-byte pages.
    ///
    /// # Errors
    /// `Error::InvalidTupleSize` if not even one tuple fits, or the slot
    /// count would not fit a `u16` slot number.
    pub fn new(page_size: usize, tuple_size: usize) -> Result<Self> {
        let invalid = Error::InvalidTupleSize {
            tuple_size,
            page_size,
        };
        if tuple_size == 0 {
            return Err(invalid);
        }

        let num_slots = (page_size * 8) / (tuple_size * 8 + 1);
        if num_slots == 0 || num_slots > u16::MAX as usize {
            return Err(invalid);
        }

        Ok(Self {
            tuple_size,
            num_slots,
            header_len: num_slots.div_ceil(8),
        })
    }

    #[inline]
    pub fn tuple_size(&self) -> usize {
        self.tuple_size
    }

    #[inline]
    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    pub fn is_slot_used(&self, data: &[u8], slot: u16) -> bool {
        let slot = slot as usize;
        slot < self.num_slots && data[slot / 8] & (1 << (slot % 8)) != 0
    }

    fn set_slot_used(&self, data: &mut [u8], slot: u16, used: bool) {
        let slot = slot as usize;
        if used {
            data[slot / 8] |= 1 << (slot % 8);
        } else {
            data[slot / 8] &= !(1 << (slot % 8));
        }
    }

    /// First unused slot, if any.
    pub fn free_slot(&self, data: &[u8]) -> Option<u16> {
        (0..self.num_slots as u16).find(|&slot| !self.is_slot_used(data, slot))
    }

    pub fn free_slot_count(&self, data: &[u8]) -> usize {
        (0..self.num_slots as u16)
            .filter(|&slot| !self.is_slot_used(data, slot))
            .count()
    }

    /// Slots currently holding tuples, in slot order.
    pub fn used_slots<'a>(&'a self, data: &'a [u8]) -> impl Iterator<Item = u16> + 'a {
        (0..self.num_slots as u16).filter(move |&slot| self.is_slot_used(data, slot))
    }

    pub fn read_tuple<'a>(&self, data: &'a [u8], slot: u16) -> &'a [u8] {
        let start = self.slot_offset(slot);
        &data[start..start + self.tuple_size]
    }

    /// Store `tuple` in `slot` and mark the slot used.
    pub fn write_tuple(&self, data: &mut [u8], slot: u16, tuple: &[u8]) {
        debug_assert_eq!(tuple.len(), self.tuple_size);
        let start = self.slot_offset(slot);
        data[start..start + self.tuple_size].copy_from_slice(tuple);
        self.set_slot_used(data, slot, true);
    }

    /// Zero `slot` and mark it unused.
    pub fn clear_tuple(&self, data: &mut [u8], slot: u16) {
        let start = self.slot_offset(slot);
        data[start..start + self.tuple_size].fill(0);
        self.set_slot_used(data, slot, false);
    }

    fn slot_offset(&self, slot: u16) -> usize {
        self.header_len + slot as usize * self.tuple_size
    }
}
