//! Core domain types and shared logic for Darkroom.
//!
//! This crate defines the canonical data model used across all other
//! crates:
//! - Hash algorithms and incremental digest states
//! - The single-pass streaming digest engine
//! - File records and their digest columns
//! - Configuration for fixity, storage schemes, locks, and derivatives

pub mod algorithm;
pub mod config;
pub mod engine;
pub mod error;
pub mod record;

pub use algorithm::{Algorithm, Digest, HashState, Mechanism};
pub use engine::{DEFAULT_CHUNK_SIZE, compute_digests, digest_single};
pub use error::{Error, Result};
pub use record::{FileId, FileRecord, FileStatus};
