//! Table and page identifier types.

use std::fmt;

/// Identifies a table (one backing file) in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl TableId {
    /// Create a new TableId.
    #[inline]
    pub fn new(id: u32) -> Self {
        TableId(id)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Table({})", self.0)
    }
}

/// Identifies a page on disk: the owning table plus the page number within
/// that table's file.
///
/// `PageId` is the key of both the page cache and the lock tables, so it is
/// `Copy` and compared/hashed by value. The derived ordering (table first,
/// then page number) gives commit and flush a deterministic page order.
///
/// # Example
/// ```
/// use lockstepdb::{PageId, TableId};
///
/// let pid = PageId::new(TableId::new(1), 42);
/// assert_eq!(pid.page_no, 42);
/// assert_eq!(pid.to_string(), "Page(1:42)");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    /// Table the page belongs to.
    pub table_id: TableId,
    /// Offset of the page within the table file, in pages.
    pub page_no: u32,
}

impl PageId {
    /// Create a new PageId.
    #[inline]
    pub fn new(table_id: TableId, page_no: u32) -> Self {
        Self { table_id, page_no }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page({}:{})", self.table_id.0, self.page_no)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_page_id_new() {
        let pid = PageId::new(TableId::new(3), 42);
        assert_eq!(pid.table_id, TableId(3));
        assert_eq!(pid.page_no, 42);
    }

    #[test]
    fn test_page_id_value_equality() {
        let a = PageId::new(TableId::new(1), 7);
        let b = PageId::new(TableId::new(1), 7);
        let c = PageId::new(TableId::new(2), 7);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<PageId> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_page_id_ordering() {
        assert!(PageId::new(TableId(1), 9) < PageId::new(TableId(2), 0));
        assert!(PageId::new(TableId(1), 1) < PageId::new(TableId(1), 2));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", TableId::new(5)), "Table(5)");
        assert_eq!(format!("{}", PageId::new(TableId(5), 0)), "Page(5:0)");
    }
}
