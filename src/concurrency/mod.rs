//! Concurrency control.
//!
//! - [`LockManager`] - shared/exclusive page locks for strict two-phase locking
//! - [`WaitsForGraph`] - deadlock detection over blocked lock requests

mod lock_manager;
mod waits_for;

pub use lock_manager::{LockManager, LockMode};
pub use waits_for::WaitsForGraph;
