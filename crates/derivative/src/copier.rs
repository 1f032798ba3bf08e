//! Deferred copy of generated derivatives to their durable store.
//!
//! Requests never wait on the remote upload: they serve the local
//! temporary derivative and enqueue a [`CopyTask`]. The embedding
//! application calls [`DerivativeCopier::flush`] once the response has
//! been sent; there is no implicit end-of-request hook.

use crate::error::{DerivativeError, DerivativeResult};
use crate::style::DerivativeStyle;
use crate::tags::{CacheTagInvalidator, file_cache_tag, source_token};
use darkroom_storage::{LockManager, SchemeRegistry, StorageError};
use std::mem;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

/// One pending remote upload of a generated derivative.
#[derive(Clone, Debug)]
pub struct CopyTask {
    /// Local temporary derivative to upload.
    pub temporary_uri: String,
    /// The derivative's source file.
    pub source_uri: String,
    /// The style the derivative was generated for.
    pub style: DerivativeStyle,
}

/// Lock name serializing remote copies of one (style, source) pair.
/// Distinct from the generation lock so a generator and a copier for
/// the same derivative never contend with each other.
pub(crate) fn copy_lock_name(style: &DerivativeStyle, source_uri: &str) -> String {
    format!("derivative_copy:{}:{}", style.id(), source_token(source_uri))
}

/// Queues copy tasks during a request and pushes them to the remote
/// store when flushed.
///
/// The queue is request-scoped: build one copier per request, flush it
/// after the response. Cross-request and cross-process exclusion comes
/// from the copy lock, not from the queue.
pub struct DerivativeCopier {
    registry: Arc<SchemeRegistry>,
    locks: Arc<dyn LockManager>,
    invalidator: Arc<dyn CacheTagInvalidator>,
    tasks: Mutex<Vec<CopyTask>>,
}

impl DerivativeCopier {
    /// Create a copier.
    pub fn new(
        registry: Arc<SchemeRegistry>,
        locks: Arc<dyn LockManager>,
        invalidator: Arc<dyn CacheTagInvalidator>,
    ) -> Self {
        Self {
            registry,
            locks,
            invalidator,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Queue a derivative for remote upload.
    pub fn enqueue(&self, task: CopyTask) {
        self.lock_tasks().push(task);
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.lock_tasks().len()
    }

    /// Execute all queued tasks in enqueue order.
    ///
    /// Returns how many derivatives actually reached the remote store.
    /// A task whose copy lock is held elsewhere is skipped (another
    /// request is uploading the same derivative); a task whose upload
    /// fails is logged and abandoned — the local response this request
    /// produced is unaffected, and the derivative regenerates on a
    /// later request.
    pub async fn flush(&self) -> usize {
        let tasks = mem::take(&mut *self.lock_tasks());
        let mut copied = 0;
        for task in tasks {
            match self.copy_to_remote(&task).await {
                Ok(true) => copied += 1,
                Ok(false) => {}
                Err(e) => {
                    error!(
                        source = %task.source_uri,
                        temporary = %task.temporary_uri,
                        error = %e,
                        "abandoning derivative copy"
                    );
                }
            }
        }
        copied
    }

    /// Copy one derivative to its durable location.
    ///
    /// Holds the copy lock for the whole operation. Whatever the copy's
    /// outcome, the temporary file is deleted and the source file's
    /// cache tags are invalidated before the lock is released.
    async fn copy_to_remote(&self, task: &CopyTask) -> DerivativeResult<bool> {
        let derivative_uri = task.style.derivative_uri(&task.source_uri)?;
        let lock_name = copy_lock_name(&task.style, &task.source_uri);

        let Some(_guard) = self.locks.try_acquire(&lock_name).await? else {
            info!(
                temporary = %task.temporary_uri,
                destination = %derivative_uri,
                "another copy of this derivative is in progress"
            );
            return Ok(false);
        };

        // The temporary file disappears once any flush uploads it; a
        // second overlapping task then has nothing left to do.
        if !self.registry.exists(&task.temporary_uri).await? {
            debug!(temporary = %task.temporary_uri, "temporary derivative already copied");
            return Ok(false);
        }

        let result: Result<(), StorageError> = async {
            self.registry.ensure_directory(&derivative_uri).await?;
            self.registry
                .copy(&task.temporary_uri, &derivative_uri)
                .await
        }
        .await;

        // Cleanup runs on success and failure alike; the lock guard
        // releases on drop.
        match self.registry.delete(&task.temporary_uri).await {
            Ok(()) | Err(StorageError::NotFound(_)) => {}
            Err(e) => warn!(temporary = %task.temporary_uri, error = %e, "failed to delete temporary derivative"),
        }
        self.invalidator
            .invalidate(&[file_cache_tag(&task.source_uri)]);

        match result {
            Ok(()) => Ok(true),
            Err(e) => Err(DerivativeError::Storage(e)),
        }
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<CopyTask>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
