//! Derivative generation collaborator.

use crate::error::{DerivativeError, DerivativeResult};
use async_trait::async_trait;
use darkroom_storage::SchemeRegistry;
use std::sync::Arc;

/// Produces a derivative of a source file at a destination URI.
///
/// Implementations own the actual transformation (resize, recompress,
/// watermark, ...). The pipeline only requires that a successful call
/// leaves a complete object at `destination_uri`.
#[async_trait]
pub trait DerivativeGenerator: Send + Sync {
    /// Generate the derivative for `source_uri` at `destination_uri`.
    async fn generate(&self, source_uri: &str, destination_uri: &str) -> DerivativeResult<()>;
}

/// Generator that copies source bytes unchanged.
///
/// Useful for styles that only relocate content (and as the baseline in
/// tests); image transformations plug in through their own
/// [`DerivativeGenerator`] implementations.
pub struct PassthroughGenerator {
    registry: Arc<SchemeRegistry>,
}

impl PassthroughGenerator {
    /// Create a passthrough generator over the given registry.
    pub fn new(registry: Arc<SchemeRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl DerivativeGenerator for PassthroughGenerator {
    async fn generate(&self, source_uri: &str, destination_uri: &str) -> DerivativeResult<()> {
        self.registry
            .copy(source_uri, destination_uri)
            .await
            .map_err(|e| DerivativeError::GenerationFailed(format!("{source_uri}: {e}")))
    }
}
