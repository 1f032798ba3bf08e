//! The deliver state machine for derivative requests.

use crate::copier::{CopyTask, DerivativeCopier};
use crate::error::{DerivativeError, DerivativeResult};
use crate::generator::DerivativeGenerator;
use crate::style::DerivativeStyle;
use crate::tags::source_token;
use darkroom_core::config::DerivativeConfig;
use darkroom_storage::{LockManager, SchemeRegistry};
use std::sync::Arc;
use tracing::{debug, instrument};

/// How a derivative request is satisfied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliverOutcome {
    /// The derivative already exists on its durable store; point the
    /// client there.
    RedirectToRemote {
        /// Durable derivative URI.
        uri: String,
    },
    /// Serve the local temporary derivative; the durable copy is (or
    /// will be) pushed by a queued copy task.
    ServeLocal {
        /// Temporary derivative URI.
        uri: String,
    },
}

/// Lock name serializing generation of one (style, source) pair.
pub(crate) fn generate_lock_name(style: &DerivativeStyle, source_uri: &str) -> String {
    format!(
        "derivative_generate:{}:{}",
        style.id(),
        source_token(source_uri)
    )
}

/// Serves derivatives: remote when present, freshly generated local
/// temp otherwise, with cross-process exclusion around generation.
pub struct DerivativePipeline {
    registry: Arc<SchemeRegistry>,
    locks: Arc<dyn LockManager>,
    generator: Arc<dyn DerivativeGenerator>,
    copier: Arc<DerivativeCopier>,
    config: DerivativeConfig,
}

impl DerivativePipeline {
    /// Create a pipeline.
    pub fn new(
        registry: Arc<SchemeRegistry>,
        locks: Arc<dyn LockManager>,
        generator: Arc<dyn DerivativeGenerator>,
        copier: Arc<DerivativeCopier>,
        config: DerivativeConfig,
    ) -> Self {
        Self {
            registry,
            locks,
            generator,
            copier,
            config,
        }
    }

    /// The copier holding this request's queued copy tasks. The
    /// embedding application flushes it after the response is sent.
    pub fn copier(&self) -> &Arc<DerivativeCopier> {
        &self.copier
    }

    /// Resolve a derivative request for (style, source).
    ///
    /// In order:
    /// 1. Missing source short-circuits to [`DerivativeError::SourceMissing`]
    ///    before any lock is taken.
    /// 2. A derivative already on the durable store redirects there.
    /// 3. An existing local temporary derivative is served as is (a copy
    ///    task from the request that generated it may still be pending).
    /// 4. Otherwise this request tries to win the generation lock and
    ///    generate into temp storage; losers poll for the winner's
    ///    output on a bounded schedule and surface
    ///    [`DerivativeError::LockBusy`] when the budget runs out.
    #[instrument(skip(self), fields(style = %style))]
    pub async fn deliver(
        &self,
        style: &DerivativeStyle,
        source_uri: &str,
    ) -> DerivativeResult<DeliverOutcome> {
        if !self.registry.exists(source_uri).await? {
            return Err(DerivativeError::SourceMissing(source_uri.to_string()));
        }

        let derivative_uri = style.derivative_uri(source_uri)?;
        if self.registry.exists(&derivative_uri).await? {
            return Ok(DeliverOutcome::RedirectToRemote {
                uri: derivative_uri,
            });
        }

        let temp_uri = style.temp_uri(source_uri, &self.config.temp_scheme)?;
        if self.registry.exists(&temp_uri).await? {
            return Ok(DeliverOutcome::ServeLocal { uri: temp_uri });
        }

        match self
            .locks
            .try_acquire(&generate_lock_name(style, source_uri))
            .await?
        {
            Some(_guard) => {
                // Another request may have generated (and another flush
                // not yet uploaded) the temp while we raced for the lock.
                if !self.registry.exists(&temp_uri).await? {
                    self.generator.generate(source_uri, &temp_uri).await?;
                    debug!(temp = %temp_uri, "derivative generated");
                }
                self.copier.enqueue(CopyTask {
                    temporary_uri: temp_uri.clone(),
                    source_uri: source_uri.to_string(),
                    style: style.clone(),
                });
                Ok(DeliverOutcome::ServeLocal { uri: temp_uri })
            }
            None => self.poll_for_winner(&temp_uri).await,
        }
    }

    /// Bounded wait for the lock winner's temporary derivative.
    ///
    /// Local generation should be fast, so the budget is short; when it
    /// runs out the caller gets a retry hint instead of an unbounded
    /// wait.
    async fn poll_for_winner(&self, temp_uri: &str) -> DerivativeResult<DeliverOutcome> {
        for _ in 0..self.config.poll_attempts {
            if self.registry.exists(temp_uri).await? {
                return Ok(DeliverOutcome::ServeLocal {
                    uri: temp_uri.to_string(),
                });
            }
            tokio::time::sleep(self.config.poll_interval()).await;
        }
        Err(DerivativeError::LockBusy {
            retry_after: self.config.retry_after(),
        })
    }
}
