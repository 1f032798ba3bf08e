//! Shared mocks for derivative pipeline tests.

use async_trait::async_trait;
use bytes::Bytes;
use darkroom_derivative::{CacheTagInvalidator, DerivativeError, DerivativeGenerator, DerivativeResult};
use darkroom_storage::error::{StorageError, StorageResult};
use darkroom_storage::traits::{ByteStream, ObjectMeta, ObjectStore, StreamingUpload};
use darkroom_storage::{LockGuard, LockManager, MemoryLockManager, SchemeRegistry};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Records every invalidation it is asked to perform.
#[derive(Default)]
pub struct CountingInvalidator {
    pub calls: std::sync::Mutex<Vec<Vec<String>>>,
}

impl CountingInvalidator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl CacheTagInvalidator for CountingInvalidator {
    fn invalidate(&self, tags: &[String]) {
        self.calls.lock().unwrap().push(tags.to_vec());
    }
}

/// Lock manager wrapper counting acquisition attempts.
pub struct CountingLockManager {
    inner: MemoryLockManager,
    pub attempts: AtomicUsize,
}

impl CountingLockManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryLockManager::new(),
            attempts: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LockManager for CountingLockManager {
    async fn try_acquire(&self, name: &str) -> StorageResult<Option<LockGuard>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.inner.try_acquire(name).await
    }
}

/// Generator that counts invocations and copies source bytes after an
/// optional delay, so races between concurrent requests are observable.
pub struct CountingGenerator {
    registry: Arc<SchemeRegistry>,
    pub invocations: AtomicUsize,
    delay: Duration,
}

impl CountingGenerator {
    pub fn new(registry: Arc<SchemeRegistry>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            registry,
            invocations: AtomicUsize::new(0),
            delay,
        })
    }
}

#[async_trait]
impl DerivativeGenerator for CountingGenerator {
    async fn generate(&self, source_uri: &str, destination_uri: &str) -> DerivativeResult<()> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.registry
            .copy(source_uri, destination_uri)
            .await
            .map_err(|e| DerivativeError::GenerationFailed(e.to_string()))
    }
}

/// Generator that blocks until the test releases it.
pub struct GatedGenerator {
    registry: Arc<SchemeRegistry>,
    pub gate: Arc<Semaphore>,
}

impl GatedGenerator {
    pub fn new(registry: Arc<SchemeRegistry>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            gate: Arc::new(Semaphore::new(0)),
        })
    }
}

#[async_trait]
impl DerivativeGenerator for GatedGenerator {
    async fn generate(&self, source_uri: &str, destination_uri: &str) -> DerivativeResult<()> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| DerivativeError::GenerationFailed(e.to_string()))?;
        self.registry
            .copy(source_uri, destination_uri)
            .await
            .map_err(|e| DerivativeError::GenerationFailed(e.to_string()))
    }
}

/// Generator that always fails.
pub struct BrokenGenerator;

#[async_trait]
impl DerivativeGenerator for BrokenGenerator {
    async fn generate(&self, _source_uri: &str, _destination_uri: &str) -> DerivativeResult<()> {
        Err(DerivativeError::GenerationFailed("toolkit exploded".to_string()))
    }
}

/// Store wrapper whose write operations can be switched to fail, while
/// reads keep working. Models a remote store rejecting uploads.
pub struct FlakyStore {
    inner: Arc<dyn ObjectStore>,
    pub fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_writes: AtomicBool::new(false),
        })
    }

    fn write_error(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StorageError::Io(std::io::Error::other(
                "remote store rejected the write",
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ObjectStore for FlakyStore {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        self.inner.head(key).await
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.inner.get(key).await
    }

    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream> {
        self.inner.get_stream(key).await
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        self.write_error()?;
        self.inner.put(key, data).await
    }

    async fn put_stream(&self, key: &str) -> StorageResult<Box<dyn StreamingUpload>> {
        self.write_error()?;
        self.inner.put_stream(key).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.inner.delete(key).await
    }

    async fn copy(&self, from: &str, to: &str) -> StorageResult<()> {
        self.write_error()?;
        self.inner.copy(from, to).await
    }

    async fn ensure_directory(&self, key: &str) -> StorageResult<()> {
        self.inner.ensure_directory(key).await
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}
