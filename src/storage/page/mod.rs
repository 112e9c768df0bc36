//! Page types.
//!
//! This module contains:
//! - [`Page`] - page bytes plus dirty owner and before-image

#[allow(clippy::module_inception)]
mod page;

pub use page::Page;
