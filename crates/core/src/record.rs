//! File record types.
//!
//! A [`FileRecord`] mirrors the host application's managed-file entity:
//! the fixity service only ever touches its digest columns, everything
//! else is owned by the uploading side.

use crate::algorithm::{Algorithm, Digest};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

/// Unique identifier for a managed file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(Uuid);

impl FileId {
    /// Generate a new random file ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from a string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::Error::InvalidFileId(format!("{s}: {e}")))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// File persistence status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Newly uploaded, may still be garbage collected.
    Temporary,
    /// Referenced and kept.
    Permanent,
}

impl FileStatus {
    /// Check whether the file is permanently kept.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent)
    }
}

/// A managed file with per-algorithm digest columns.
///
/// A digest column holds `Some` once a full-stream pass succeeded and
/// `None` while the value is unknown (never computed, or the stream was
/// unreadable on the last pass). The separately tracked original
/// digests are written once, on first save, and never overwritten.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileRecord {
    /// Unique identifier.
    pub id: FileId,
    /// Source URI, `scheme://path`. Absent for records without content.
    pub uri: Option<String>,
    /// MIME type reported by the uploader.
    pub mime_type: String,
    /// Persistence status.
    pub status: FileStatus,
    /// Creation time.
    pub created: OffsetDateTime,
    is_new: bool,
    hashes: HashMap<Algorithm, Option<Digest>>,
    original_hashes: HashMap<Algorithm, Option<Digest>>,
}

impl FileRecord {
    /// Create a new, unsaved record.
    pub fn new(uri: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: FileId::new(),
            uri: Some(uri.into()),
            mime_type: mime_type.into(),
            status: FileStatus::Temporary,
            created: OffsetDateTime::now_utc(),
            is_new: true,
            hashes: HashMap::new(),
            original_hashes: HashMap::new(),
        }
    }

    /// Create a record with no content URI.
    pub fn without_uri(mime_type: impl Into<String>) -> Self {
        let mut record = Self::new("", mime_type);
        record.uri = None;
        record
    }

    /// Whether the record has never been saved.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Mark the record as persisted. Called by the owning store after a
    /// successful save; later passes stop treating it as first-save.
    pub fn mark_saved(&mut self) {
        self.is_new = false;
    }

    /// Get the stored digest for an algorithm, if known.
    pub fn hash(&self, algorithm: Algorithm) -> Option<&Digest> {
        self.hashes.get(&algorithm).and_then(|d| d.as_ref())
    }

    /// Get the stored original digest for an algorithm, if known.
    pub fn original_hash(&self, algorithm: Algorithm) -> Option<&Digest> {
        self.original_hashes.get(&algorithm).and_then(|d| d.as_ref())
    }

    /// Set (or clear, with `None`) the digest column for an algorithm.
    pub fn set_hash(&mut self, algorithm: Algorithm, digest: Option<Digest>) {
        self.hashes.insert(algorithm, digest);
    }

    /// Set (or clear, with `None`) the original digest column.
    pub fn set_original_hash(&mut self, algorithm: Algorithm, digest: Option<Digest>) {
        self.original_hashes.insert(algorithm, digest);
    }
}
