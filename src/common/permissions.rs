//! Page access permissions.

use crate::concurrency::LockMode;

/// Access level a transaction asks for when fetching a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permissions {
    /// Read access; takes a shared lock.
    ReadOnly,
    /// Read and write access; takes an exclusive lock.
    ReadWrite,
}

impl Permissions {
    /// The lock mode needed to satisfy this permission.
    #[inline]
    pub fn lock_mode(self) -> LockMode {
        match self {
            Permissions::ReadOnly => LockMode::Shared,
            Permissions::ReadWrite => LockMode::Exclusive,
        }
    }
}

impl From<Permissions> for LockMode {
    fn from(perm: Permissions) -> Self {
        perm.lock_mode()
    }
}
