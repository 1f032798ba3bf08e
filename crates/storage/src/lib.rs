//! Scheme-addressed object storage and locking for Darkroom.
//!
//! This crate provides:
//! - The `ObjectStore` abstraction with filesystem and S3 backends
//! - A `SchemeRegistry` routing `scheme://path` URIs to backends
//! - Try-acquire named locks shared across processes

pub mod backends;
pub mod error;
pub mod lock;
pub mod registry;
pub mod traits;

pub use backends::{filesystem::FilesystemBackend, s3::S3Backend};
pub use error::{StorageError, StorageResult};
pub use lock::{FileLockManager, LockGuard, LockManager, MemoryLockManager};
pub use registry::{SchemeRegistry, split_uri};
pub use traits::{ByteStream, ObjectMeta, ObjectStore, StreamingUpload};

use darkroom_core::config::{AppConfig, LockConfig, StorageConfig};
use std::sync::Arc;

/// Create an object store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    config.validate().map_err(StorageError::Config)?;

    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
        StorageConfig::S3 {
            bucket,
            endpoint,
            region,
            prefix,
            access_key_id,
            secret_access_key,
            force_path_style,
        } => {
            let backend = S3Backend::new(
                bucket,
                endpoint.clone(),
                region.clone(),
                prefix.clone(),
                access_key_id.clone(),
                secret_access_key.clone(),
                *force_path_style,
            )
            .await?;
            Ok(Arc::new(backend))
        }
    }
}

/// Build the scheme registry from application configuration.
pub async fn registry_from_config(config: &AppConfig) -> StorageResult<SchemeRegistry> {
    let mut registry = SchemeRegistry::new();
    for (scheme, storage) in &config.schemes {
        registry.register(scheme.clone(), from_config(storage).await?);
    }
    Ok(registry)
}

/// Create a lock manager from configuration.
pub fn locks_from_config(config: &LockConfig) -> StorageResult<Arc<dyn LockManager>> {
    match config {
        LockConfig::Memory => Ok(Arc::new(MemoryLockManager::new())),
        LockConfig::File { path } => Ok(Arc::new(FileLockManager::new(path)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use darkroom_core::config::StorageConfig;
    use tempfile::tempdir;

    #[tokio::test]
    async fn from_config_filesystem_ok() {
        let temp = tempdir().unwrap();
        let config = StorageConfig::Filesystem {
            path: temp.path().join("store"),
        };

        let store = from_config(&config).await.unwrap();
        store
            .put("hello.txt", Bytes::from_static(b"hi"))
            .await
            .unwrap();
        assert!(store.exists("hello.txt").await.unwrap());
    }

    #[tokio::test]
    async fn from_config_s3_ok() {
        let config = StorageConfig::S3 {
            bucket: "bucket".to_string(),
            endpoint: Some("minio:9000".to_string()),
            region: Some("us-east-1".to_string()),
            prefix: Some("media".to_string()),
            access_key_id: None,
            secret_access_key: None,
            force_path_style: true,
        };

        let store = from_config(&config).await.unwrap();
        assert_eq!(store.backend_name(), "s3");
    }

    #[tokio::test]
    async fn from_config_rejects_partial_credentials() {
        let config = StorageConfig::S3 {
            bucket: "bucket".to_string(),
            endpoint: None,
            region: None,
            prefix: None,
            access_key_id: Some("access".to_string()),
            secret_access_key: None,
            force_path_style: false,
        };

        match from_config(&config).await {
            Ok(_) => panic!("expected error"),
            Err(StorageError::Config(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn registry_from_app_config() {
        let temp = tempdir().unwrap();
        let config = darkroom_core::config::AppConfig::for_testing(temp.path());
        let registry = registry_from_config(&config).await.unwrap();

        registry
            .put("temp://scratch.bin", Bytes::from_static(b"x"))
            .await
            .unwrap();
        assert!(registry.exists("temp://scratch.bin").await.unwrap());
        assert!(!registry.exists("local://nothing").await.unwrap());
    }
}
