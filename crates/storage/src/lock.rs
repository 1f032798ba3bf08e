//! Named cross-process locks.
//!
//! Locks are try-acquire only: contention is reported immediately and
//! callers run their own bounded retry. A [`LockGuard`] releases on
//! drop, so a panicking or early-returning holder cannot leak a lock.

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use fs4::FileExt;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Named mutual-exclusion backend.
#[async_trait]
pub trait LockManager: Send + Sync + 'static {
    /// Try to acquire the named lock without blocking.
    ///
    /// Returns `None` when another holder has the lock; the guard
    /// releases it on drop.
    async fn try_acquire(&self, name: &str) -> StorageResult<Option<LockGuard>>;
}

/// Holds a named lock until dropped.
pub struct LockGuard {
    inner: GuardInner,
}

enum GuardInner {
    Memory {
        name: String,
        held: Arc<Mutex<HashSet<String>>>,
    },
    // The open descriptor holds the advisory lock; the OS releases it
    // when the descriptor closes, including on process death.
    File {
        _file: std::fs::File,
    },
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let GuardInner::Memory { name, held } = &self.inner {
            held.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(name);
        }
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.inner {
            GuardInner::Memory { .. } => "memory",
            GuardInner::File { .. } => "file",
        };
        f.debug_struct("LockGuard").field("backend", &kind).finish()
    }
}

/// In-process lock manager.
///
/// Correct only when every request handler shares one process; use
/// [`FileLockManager`] for multi-process deployments.
#[derive(Clone, Default)]
pub struct MemoryLockManager {
    held: Arc<Mutex<HashSet<String>>>,
}

impl MemoryLockManager {
    /// Create a new in-process lock manager.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockManager for MemoryLockManager {
    async fn try_acquire(&self, name: &str) -> StorageResult<Option<LockGuard>> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if !held.insert(name.to_string()) {
            return Ok(None);
        }
        Ok(Some(LockGuard {
            inner: GuardInner::Memory {
                name: name.to_string(),
                held: Arc::clone(&self.held),
            },
        }))
    }
}

/// Advisory file locks under a shared directory.
///
/// Every process on the host contending for the same lock name opens
/// the same lock file, so exclusion spans processes. A crashed holder's
/// locks are released by the OS when its descriptors close; no expiry
/// bookkeeping is needed.
pub struct FileLockManager {
    dir: PathBuf,
}

impl FileLockManager {
    /// Create a file lock manager storing lock files under `dir`.
    pub fn new(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Lock file path for a name. Names are hashed so arbitrary lock
    /// names (which embed URIs) stay filesystem-safe.
    fn lock_path(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.lock", hex::encode(Sha256::digest(name))))
    }
}

#[async_trait]
impl LockManager for FileLockManager {
    async fn try_acquire(&self, name: &str) -> StorageResult<Option<LockGuard>> {
        let path = self.lock_path(name);
        let result = tokio::task::spawn_blocking(move || -> StorageResult<Option<std::fs::File>> {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .read(true)
                .write(true)
                .open(&path)?;
            match file.try_lock_exclusive() {
                Ok(()) => Ok(Some(file)),
                Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(None),
                Err(err) => Err(err.into()),
            }
        })
        .await
        .map_err(|e| StorageError::Lock(format!("lock task failed: {e}")))??;

        Ok(result.map(|file| LockGuard {
            inner: GuardInner::File { _file: file },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn exercise_mutual_exclusion(manager: &dyn LockManager) {
        let guard = manager.try_acquire("style:a").await.unwrap();
        assert!(guard.is_some());

        // Same name is contended, other names are independent.
        assert!(manager.try_acquire("style:a").await.unwrap().is_none());
        assert!(manager.try_acquire("style:b").await.unwrap().is_some());

        drop(guard);
        assert!(manager.try_acquire("style:a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_memory_lock_mutual_exclusion() {
        exercise_mutual_exclusion(&MemoryLockManager::new()).await;
    }

    #[tokio::test]
    async fn test_file_lock_mutual_exclusion() {
        let dir = tempfile::tempdir().unwrap();
        exercise_mutual_exclusion(&FileLockManager::new(dir.path()).unwrap()).await;
    }

    #[tokio::test]
    async fn test_file_lock_contended_across_managers() {
        // Two managers over the same directory model two processes.
        let dir = tempfile::tempdir().unwrap();
        let a = FileLockManager::new(dir.path()).unwrap();
        let b = FileLockManager::new(dir.path()).unwrap();

        let guard = a.try_acquire("copy:style:deadbeef").await.unwrap();
        assert!(guard.is_some());
        assert!(b.try_acquire("copy:style:deadbeef").await.unwrap().is_none());

        drop(guard);
        assert!(b.try_acquire("copy:style:deadbeef").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_guard_releases_on_drop_mid_scope() {
        let manager = MemoryLockManager::new();
        {
            let _guard = manager.try_acquire("scoped").await.unwrap();
        }
        assert!(manager.try_acquire("scoped").await.unwrap().is_some());
    }
}
