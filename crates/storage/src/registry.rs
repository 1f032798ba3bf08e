//! Scheme registry mapping URI schemes to storage backends.
//!
//! The registry is an explicit object built at startup and passed by
//! `Arc` to every component that resolves `scheme://path` URIs. There
//! is deliberately no process-global adapter table; the caller owns the
//! registry's lifetime.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ByteStream, ObjectStore, StreamingUpload};
use bytes::Bytes;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;

/// Split a `scheme://path` URI into its scheme and key parts.
///
/// The key (path) part may be empty; the scheme may not.
pub fn split_uri(uri: &str) -> StorageResult<(&str, &str)> {
    let (scheme, key) = uri
        .split_once("://")
        .ok_or_else(|| StorageError::InvalidUri(format!("missing scheme separator: {uri}")))?;
    if !darkroom_core::config::is_valid_scheme(scheme) {
        return Err(StorageError::InvalidUri(format!("invalid scheme: {uri}")));
    }
    Ok((scheme, key))
}

/// Maps URI schemes to object store backends.
pub struct SchemeRegistry {
    schemes: HashMap<String, Arc<dyn ObjectStore>>,
}

impl SchemeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            schemes: HashMap::new(),
        }
    }

    /// Register a backend for a scheme, replacing any previous one.
    pub fn register(&mut self, scheme: impl Into<String>, store: Arc<dyn ObjectStore>) {
        self.schemes.insert(scheme.into(), store);
    }

    /// Registered scheme names.
    pub fn schemes(&self) -> impl Iterator<Item = &str> {
        self.schemes.keys().map(String::as_str)
    }

    /// Resolve a URI to its backend and key.
    pub fn resolve(&self, uri: &str) -> StorageResult<(Arc<dyn ObjectStore>, String)> {
        let (scheme, key) = split_uri(uri)?;
        let store = self
            .schemes
            .get(scheme)
            .ok_or_else(|| StorageError::UnknownScheme(scheme.to_string()))?;
        Ok((Arc::clone(store), key.to_string()))
    }

    /// Check if the object behind a URI exists.
    pub async fn exists(&self, uri: &str) -> StorageResult<bool> {
        let (store, key) = self.resolve(uri)?;
        store.exists(&key).await
    }

    /// Open the object behind a URI as a byte stream.
    pub async fn get_stream(&self, uri: &str) -> StorageResult<ByteStream> {
        let (store, key) = self.resolve(uri)?;
        store.get_stream(&key).await
    }

    /// Get the full content of the object behind a URI.
    pub async fn get(&self, uri: &str) -> StorageResult<Bytes> {
        let (store, key) = self.resolve(uri)?;
        store.get(&key).await
    }

    /// Put an object at a URI.
    pub async fn put(&self, uri: &str, data: Bytes) -> StorageResult<()> {
        let (store, key) = self.resolve(uri)?;
        store.put(&key, data).await
    }

    /// Start a streaming upload to a URI.
    pub async fn put_stream(&self, uri: &str) -> StorageResult<Box<dyn StreamingUpload>> {
        let (store, key) = self.resolve(uri)?;
        store.put_stream(&key).await
    }

    /// Delete the object behind a URI.
    pub async fn delete(&self, uri: &str) -> StorageResult<()> {
        let (store, key) = self.resolve(uri)?;
        store.delete(&key).await
    }

    /// Prepare the directory that would hold a URI.
    pub async fn ensure_directory(&self, uri: &str) -> StorageResult<()> {
        let (store, key) = self.resolve(uri)?;
        store.ensure_directory(&key).await
    }

    /// Copy an object between two URIs, possibly across backends.
    ///
    /// Same-backend copies use the store's native copy; cross-backend
    /// copies stream chunks from source to destination without
    /// buffering the whole object.
    pub async fn copy(&self, from_uri: &str, to_uri: &str) -> StorageResult<()> {
        let (from_store, from_key) = self.resolve(from_uri)?;
        let (to_store, to_key) = self.resolve(to_uri)?;

        if Arc::ptr_eq(&from_store, &to_store) {
            return from_store.copy(&from_key, &to_key).await;
        }

        let mut source = from_store.get_stream(&from_key).await?;
        let mut upload = to_store.put_stream(&to_key).await?;
        while let Some(chunk) = source.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    upload.abort().await?;
                    return Err(e);
                }
            };
            if let Err(e) = upload.write(chunk).await {
                upload.abort().await?;
                return Err(e);
            }
        }
        upload.finish().await?;
        Ok(())
    }
}

impl Default for SchemeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
