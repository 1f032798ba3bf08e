//! Cache-tag invalidation collaborator.

use sha2::{Digest, Sha256};
use tracing::debug;

/// Invalidates cache entries associated with a set of tags after a
/// derivative reaches the remote store.
pub trait CacheTagInvalidator: Send + Sync {
    /// Invalidate all cache entries carrying any of the given tags.
    fn invalidate(&self, tags: &[String]);
}

/// Invalidator that only records the invalidation in the log. Suitable
/// when no page cache sits in front of the derivative URLs.
#[derive(Default)]
pub struct LoggingInvalidator;

impl CacheTagInvalidator for LoggingInvalidator {
    fn invalidate(&self, tags: &[String]) {
        debug!(?tags, "cache tags invalidated");
    }
}

/// The cache tag carried by everything rendered from a source file.
pub fn file_cache_tag(source_uri: &str) -> String {
    format!("file:{}", source_token(source_uri))
}

/// Stable, filesystem- and lock-name-safe token for a source URI.
pub(crate) fn source_token(source_uri: &str) -> String {
    hex::encode(Sha256::digest(source_uri.as_bytes()))
}
