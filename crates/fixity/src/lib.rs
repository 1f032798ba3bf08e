//! File fixity service for Darkroom.
//!
//! Wraps the core digest engine with the policy that decides when a
//! file's digests are computed, backfilled, or recomputed, and provides
//! duplicate lookup over a file index collaborator.

pub mod hasher;
pub mod index;

pub use hasher::FileHasher;
pub use index::{DuplicateQuery, FileIndex, MemoryFileIndex};
