//! Configuration types shared across crates.

use crate::algorithm::Algorithm;
use crate::engine::DEFAULT_CHUNK_SIZE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Fixity (file hashing) configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FixityConfig {
    /// Enabled hash algorithms.
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<Algorithm>,
    /// Hash files with missing digests when they are loaded.
    #[serde(default)]
    pub autohash: bool,
    /// Recompute all enabled digests on every save instead of only
    /// backfilling missing ones.
    #[serde(default)]
    pub rehash: bool,
    /// Track the first-computed digest per algorithm in a separate,
    /// never-overwritten column.
    #[serde(default)]
    pub original: bool,
    /// MIME type allowlist. Empty means all types are hashed.
    #[serde(default)]
    pub mime_types: Vec<String>,
    /// Suppress the warning logged for unreadable files. The digest
    /// columns are still cleared either way.
    #[serde(default)]
    pub suppress_warnings: bool,
    /// Read chunk size in bytes for the streaming digest pass.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_algorithms() -> Vec<Algorithm> {
    vec![Algorithm::Sha256]
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for FixityConfig {
    fn default() -> Self {
        Self {
            algorithms: default_algorithms(),
            autohash: false,
            rehash: false,
            original: false,
            mime_types: Vec::new(),
            suppress_warnings: false,
            chunk_size: default_chunk_size(),
        }
    }
}

impl FixityConfig {
    /// Validate fixity configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("fixity.chunk_size must be a positive byte count".to_string());
        }
        Ok(())
    }

    /// Check whether a MIME type passes the allowlist.
    pub fn allows_mime_type(&self, mime_type: &str) -> bool {
        self.mime_types.is_empty() || self.mime_types.iter().any(|t| t == mime_type)
    }
}

/// Storage backend configuration for one scheme.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
    /// S3-compatible storage.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Optional endpoint URL (for MinIO, etc.).
        endpoint: Option<String>,
        /// AWS region.
        region: Option<String>,
        /// Optional key prefix.
        prefix: Option<String>,
        /// AWS access key ID. Falls back to AWS_ACCESS_KEY_ID env var if not set.
        /// WARNING: Prefer env vars or IAM roles over storing secrets in config files.
        access_key_id: Option<String>,
        /// AWS secret access key. Falls back to AWS_SECRET_ACCESS_KEY env var if not set.
        /// WARNING: Prefer env vars or IAM roles over storing secrets in config files.
        secret_access_key: Option<String>,
        /// Force path-style URLs (`endpoint/bucket/key` instead of
        /// `bucket.endpoint/key`). Required for MinIO and some
        /// S3-compatible services; AWS S3 requires virtual-hosted style
        /// (false).
        #[serde(default)]
        force_path_style: bool,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/files"),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StorageConfig::S3 {
                access_key_id,
                secret_access_key,
                ..
            } => match (access_key_id.as_ref(), secret_access_key.as_ref()) {
                (Some(_), Some(_)) | (None, None) => Ok(()),
                _ => Err(
                    "s3 config requires both access_key_id and secret_access_key when either is set"
                        .to_string(),
                ),
            },
            _ => Ok(()),
        }
    }
}

/// Lock backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LockConfig {
    /// In-process locks. Only correct for single-process deployments.
    Memory,
    /// Advisory file locks visible to every process on the host.
    File {
        /// Directory holding the lock files.
        path: PathBuf,
    },
}

impl Default for LockConfig {
    fn default() -> Self {
        Self::File {
            path: PathBuf::from("./data/locks"),
        }
    }
}

/// Derivative pipeline configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DerivativeConfig {
    /// Scheme used for locally generated temporary derivatives.
    #[serde(default = "default_temp_scheme")]
    pub temp_scheme: String,
    /// How many times a request that lost the generation lock re-checks
    /// for the winner's output before giving up.
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,
    /// Delay between those re-checks, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Retry hint returned to callers when the poll budget is exhausted,
    /// in seconds.
    #[serde(default = "default_retry_after_secs")]
    pub retry_after_secs: u64,
}

fn default_temp_scheme() -> String {
    "temp".to_string()
}

fn default_poll_attempts() -> u32 {
    4
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_retry_after_secs() -> u64 {
    3
}

impl Default for DerivativeConfig {
    fn default() -> Self {
        Self {
            temp_scheme: default_temp_scheme(),
            poll_attempts: default_poll_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
            retry_after_secs: default_retry_after_secs(),
        }
    }
}

impl DerivativeConfig {
    /// Get the poll interval as a Duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Get the retry hint as a Duration.
    pub fn retry_after(&self) -> Duration {
        Duration::from_secs(self.retry_after_secs)
    }

    /// Validate derivative configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_scheme(&self.temp_scheme) {
            return Err(format!(
                "derivative.temp_scheme is not a valid scheme: {}",
                self.temp_scheme
            ));
        }
        Ok(())
    }
}

/// Check that a scheme name is lowercase alphanumeric (plus `-`),
/// starting with a letter.
pub fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Fixity configuration.
    #[serde(default)]
    pub fixity: FixityConfig,
    /// Storage backends keyed by scheme.
    #[serde(default = "default_schemes")]
    pub schemes: BTreeMap<String, StorageConfig>,
    /// Lock backend configuration.
    #[serde(default)]
    pub locks: LockConfig,
    /// Derivative pipeline configuration.
    #[serde(default)]
    pub derivative: DerivativeConfig,
}

fn default_schemes() -> BTreeMap<String, StorageConfig> {
    let mut schemes = BTreeMap::new();
    schemes.insert("local".to_string(), StorageConfig::default());
    schemes.insert(
        "temp".to_string(),
        StorageConfig::Filesystem {
            path: PathBuf::from("./data/temp"),
        },
    );
    schemes
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fixity: FixityConfig::default(),
            schemes: default_schemes(),
            locks: LockConfig::default(),
            derivative: DerivativeConfig::default(),
        }
    }
}

impl AppConfig {
    /// Validate the complete configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.fixity.validate()?;
        self.derivative.validate()?;
        for (scheme, storage) in &self.schemes {
            if !is_valid_scheme(scheme) {
                return Err(format!("invalid scheme name: {scheme}"));
            }
            storage.validate()?;
        }
        if !self.schemes.contains_key(&self.derivative.temp_scheme) {
            return Err(format!(
                "derivative.temp_scheme {:?} has no configured backend",
                self.derivative.temp_scheme
            ));
        }
        Ok(())
    }

    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses filesystem storage rooted below the
    /// given directory for both the `local` and `temp` schemes.
    pub fn for_testing(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let mut schemes = BTreeMap::new();
        schemes.insert(
            "local".to_string(),
            StorageConfig::Filesystem {
                path: root.join("files"),
            },
        );
        schemes.insert(
            "temp".to_string(),
            StorageConfig::Filesystem {
                path: root.join("temp"),
            },
        );
        Self {
            fixity: FixityConfig::default(),
            schemes,
            locks: LockConfig::Memory,
            derivative: DerivativeConfig::default(),
        }
    }
}
