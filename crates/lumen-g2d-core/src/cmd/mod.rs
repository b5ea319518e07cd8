//! Command-buffer storage and in-flight tracking.
//!
//! `pool` owns the backing memory (a word ring plus a slot table with an
//! explicit free list); `tracker` owns the most-recent-first chain of
//! submitted buffers awaiting hardware completion.

pub mod pool;
pub mod tracker;

pub use pool::{ArenaStats, ALLOC_FLOOR_WORDS};
