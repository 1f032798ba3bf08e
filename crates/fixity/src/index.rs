//! File index collaborator for duplicate lookup.
//!
//! Persistence of file records belongs to the host application; this
//! crate only needs a lookup seam plus an in-memory implementation for
//! single-process use and tests.

use async_trait::async_trait;
use darkroom_core::{Algorithm, Digest, FileId, FileRecord};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Parameters for a duplicate search.
#[derive(Clone, Debug)]
pub struct DuplicateQuery {
    /// The digest column to match.
    pub algorithm: Algorithm,
    /// The digest value to search for.
    pub digest: Digest,
    /// Also match the original digest column.
    pub match_original: bool,
    /// Restrict matches to permanent files.
    pub permanent_only: bool,
    /// Record to exclude from the match set (the file being checked).
    pub exclude: FileId,
}

/// Lookup seam over the host application's file records.
#[async_trait]
pub trait FileIndex: Send + Sync {
    /// Find any other file matching the query, returning its id.
    async fn find_duplicate(&self, query: &DuplicateQuery) -> Option<FileId>;
}

/// In-memory file index.
#[derive(Default)]
pub struct MemoryFileIndex {
    files: Mutex<HashMap<FileId, FileRecord>>,
}

impl MemoryFileIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    pub fn upsert(&self, record: FileRecord) {
        self.lock().insert(record.id, record);
    }

    /// Remove a record.
    pub fn remove(&self, id: FileId) {
        self.lock().remove(&id);
    }

    /// Fetch a copy of a record.
    pub fn get(&self, id: FileId) -> Option<FileRecord> {
        self.lock().get(&id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<FileId, FileRecord>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl FileIndex for MemoryFileIndex {
    async fn find_duplicate(&self, query: &DuplicateQuery) -> Option<FileId> {
        let files = self.lock();
        files
            .values()
            .find(|record| {
                record.id != query.exclude
                    && (!query.permanent_only || record.status.is_permanent())
                    && (record.hash(query.algorithm) == Some(&query.digest)
                        || (query.match_original
                            && record.original_hash(query.algorithm) == Some(&query.digest)))
            })
            .map(|record| record.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use darkroom_core::FileStatus;

    fn record_with_sha1(digest: &str, status: FileStatus) -> FileRecord {
        let mut record = FileRecord::new("local://a.bin", "application/octet-stream");
        record.status = status;
        record.set_hash(
            Algorithm::Sha1,
            Some(Digest::from_hex(digest).unwrap()),
        );
        record
    }

    const D1: &str = "f48dd853820860816c75d54d0f584dc863327a7c";

    #[tokio::test]
    async fn test_find_duplicate_excludes_self() {
        let index = MemoryFileIndex::new();
        let record = record_with_sha1(D1, FileStatus::Permanent);
        index.upsert(record.clone());

        let query = DuplicateQuery {
            algorithm: Algorithm::Sha1,
            digest: Digest::from_hex(D1).unwrap(),
            match_original: false,
            permanent_only: true,
            exclude: record.id,
        };
        assert_eq!(index.find_duplicate(&query).await, None);

        let other = record_with_sha1(D1, FileStatus::Permanent);
        index.upsert(other.clone());
        assert_eq!(index.find_duplicate(&query).await, Some(other.id));
    }

    #[tokio::test]
    async fn test_permanent_only_skips_temporary() {
        let index = MemoryFileIndex::new();
        let temporary = record_with_sha1(D1, FileStatus::Temporary);
        index.upsert(temporary.clone());

        let mut query = DuplicateQuery {
            algorithm: Algorithm::Sha1,
            digest: Digest::from_hex(D1).unwrap(),
            match_original: false,
            permanent_only: true,
            exclude: FileId::new(),
        };
        assert_eq!(index.find_duplicate(&query).await, None);

        query.permanent_only = false;
        assert_eq!(index.find_duplicate(&query).await, Some(temporary.id));
    }

    #[tokio::test]
    async fn test_match_original_column() {
        let index = MemoryFileIndex::new();
        let mut record = FileRecord::new("local://b.bin", "application/octet-stream");
        record.status = FileStatus::Permanent;
        record.set_original_hash(Algorithm::Sha1, Some(Digest::from_hex(D1).unwrap()));
        index.upsert(record.clone());

        let mut query = DuplicateQuery {
            algorithm: Algorithm::Sha1,
            digest: Digest::from_hex(D1).unwrap(),
            match_original: false,
            permanent_only: true,
            exclude: FileId::new(),
        };
        assert_eq!(index.find_duplicate(&query).await, None);

        query.match_original = true;
        assert_eq!(index.find_duplicate(&query).await, Some(record.id));
    }
}
