//! Eviction policy implementations (replacers).
//!
//! Currently implements:
//! - [`LruReplacer`] - least recently used among clean pages

mod lru;

pub use lru::LruReplacer;
