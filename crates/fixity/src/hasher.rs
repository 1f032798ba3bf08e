//! The fixity service: decides when files get hashed and applies the
//! results to their records.

use darkroom_core::config::FixityConfig;
use darkroom_core::{Algorithm, Digest, FileId, FileRecord, Mechanism, compute_digests, digest_single};
use darkroom_storage::SchemeRegistry;
use futures::TryStreamExt;
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::io::StreamReader;
use tracing::warn;

use crate::index::{DuplicateQuery, FileIndex};

/// Computes and maintains per-file digests according to configuration.
///
/// All stream problems (missing file, unreadable backend, read error
/// mid-stream) are recovered into `None` digest columns; only
/// configuration mistakes propagate as errors elsewhere.
pub struct FileHasher {
    config: FixityConfig,
    registry: Arc<SchemeRegistry>,
    /// Files already auto-hashed during this process run.
    autohashed: Mutex<HashSet<FileId>>,
}

impl FileHasher {
    /// Create a fixity service over the given scheme registry.
    pub fn new(config: FixityConfig, registry: Arc<SchemeRegistry>) -> Self {
        Self {
            config,
            registry,
            autohashed: Mutex::new(HashSet::new()),
        }
    }

    /// The enabled algorithm set.
    pub fn enabled_algorithms(&self) -> &[Algorithm] {
        &self.config.algorithms
    }

    /// Whether a record is eligible for hashing at all: it must have a
    /// URI, and a non-empty MIME allowlist must include its type.
    pub fn should_hash(&self, record: &FileRecord) -> bool {
        if record.uri.as_deref().is_none_or(|uri| uri.is_empty()) {
            return false;
        }
        self.config.allows_mime_type(&record.mime_type)
    }

    /// Pre-save hook: recompute everything when rehash is on, otherwise
    /// backfill only the missing digest columns. Records ruled out by
    /// [`Self::should_hash`] are left untouched.
    pub async fn presave(&self, record: &mut FileRecord) {
        if !self.should_hash(record) {
            return;
        }
        // The original columns are written on first save only.
        let original = self.config.original && record.is_new();
        if self.config.rehash {
            self.hash(record, None, original).await;
        } else {
            let missing: Vec<Algorithm> = self
                .config
                .algorithms
                .iter()
                .copied()
                .filter(|&algorithm| record.hash(algorithm).is_none())
                .collect();
            if !missing.is_empty() {
                self.hash(record, Some(&missing), original).await;
            }
        }
    }

    /// Post-load hook: when autohash is enabled, compute digests for
    /// loaded records that are missing any. Each file is auto-hashed at
    /// most once per process run. Returns the ids of records that were
    /// updated so the caller can persist them.
    pub async fn load(&self, records: &mut [FileRecord]) -> Vec<FileId> {
        if !self.config.autohash {
            return Vec::new();
        }
        let mut updated = Vec::new();
        for record in records.iter_mut() {
            let missing = self
                .config
                .algorithms
                .iter()
                .any(|&algorithm| record.hash(algorithm).is_none());
            if missing && self.should_hash(record) && self.mark_autohashed(record.id) {
                self.presave(record).await;
                updated.push(record.id);
            }
        }
        updated
    }

    /// Compute digests for a record and write them to its columns.
    ///
    /// `algorithms` restricts the pass to a subset of the enabled set;
    /// `None` means all enabled algorithms. When the stream cannot be
    /// read, every requested column is set to `None` together, so a
    /// record never holds a partial mix of old and new values. With
    /// `original`, the same values go to the original columns.
    pub async fn hash(
        &self,
        record: &mut FileRecord,
        algorithms: Option<&[Algorithm]>,
        original: bool,
    ) {
        let requested: Vec<Algorithm> = match algorithms {
            Some(subset) => self
                .config
                .algorithms
                .iter()
                .copied()
                .filter(|algorithm| subset.contains(algorithm))
                .collect(),
            None => self.config.algorithms.clone(),
        };
        if requested.is_empty() {
            return;
        }

        let computed = match record.uri.as_deref() {
            Some(uri) if !uri.is_empty() => self.compute_for_uri(uri, &requested).await,
            _ => None,
        };

        for &algorithm in &requested {
            let value = computed
                .as_ref()
                .and_then(|digests| digests.get(&algorithm).cloned());
            record.set_hash(algorithm, value.clone());
            if original {
                record.set_original_hash(algorithm, value);
            }
        }
    }

    /// Find another file with the same digest value.
    ///
    /// `strict` includes temporary files in the match set; `original`
    /// also matches against the original digest columns (when original
    /// tracking is configured). The record's own row never matches.
    pub async fn duplicate_lookup(
        &self,
        index: &dyn FileIndex,
        algorithm: Algorithm,
        record: &FileRecord,
        strict: bool,
        original: bool,
    ) -> Option<FileId> {
        let digest = record.hash(algorithm)?.clone();
        index
            .find_duplicate(&DuplicateQuery {
                algorithm,
                digest,
                match_original: original && self.config.original,
                permanent_only: !strict,
                exclude: record.id,
            })
            .await
    }

    async fn compute_for_uri(
        &self,
        uri: &str,
        algorithms: &[Algorithm],
    ) -> Option<HashMap<Algorithm, Digest>> {
        let stream = match self.registry.get_stream(uri).await {
            Ok(stream) => stream,
            Err(e) => {
                if !self.config.suppress_warnings {
                    warn!(uri, error = %e, "file unreadable, clearing digests");
                }
                return None;
            }
        };
        let reader = StreamReader::new(stream.map_err(io::Error::other));

        // Single native-digest algorithm: one-shot monomorphic pass.
        let result = if algorithms.len() == 1 && algorithms[0].mechanism() == Mechanism::Digest {
            digest_single(reader, algorithms[0], self.config.chunk_size)
                .await
                .map(|digest| HashMap::from([(algorithms[0], digest)]))
        } else {
            compute_digests(reader, algorithms, self.config.chunk_size).await
        };

        match result {
            Ok(digests) => Some(digests),
            Err(e) => {
                if !self.config.suppress_warnings {
                    warn!(uri, error = %e, "read failed mid-stream, clearing digests");
                }
                None
            }
        }
    }

    fn mark_autohashed(&self, id: FileId) -> bool {
        self.autohashed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id)
    }
}
