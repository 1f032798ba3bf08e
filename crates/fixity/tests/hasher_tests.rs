//! End-to-end fixity scenarios through a real filesystem backend.

use bytes::Bytes;
use darkroom_core::config::FixityConfig;
use darkroom_core::{Algorithm, Digest, FileRecord, FileStatus};
use darkroom_fixity::{FileHasher, MemoryFileIndex};
use darkroom_storage::{FilesystemBackend, SchemeRegistry};
use std::sync::Arc;

const CONTENTS: &[u8] = b"test data";
const CONTENTS_SHA1: &str = "f48dd853820860816c75d54d0f584dc863327a7c";
const DIFFERENT_CONTENTS: &[u8] = b"different test data";

async fn setup() -> (tempfile::TempDir, Arc<SchemeRegistry>) {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = SchemeRegistry::new();
    let backend = FilesystemBackend::new(dir.path().join("files")).await.unwrap();
    registry.register("temp", Arc::new(backend));
    (dir, Arc::new(registry))
}

fn sha1_config() -> FixityConfig {
    FixityConfig {
        algorithms: vec![Algorithm::Sha1],
        ..FixityConfig::default()
    }
}

async fn write_file(registry: &SchemeRegistry, uri: &str, contents: &[u8]) {
    registry.put(uri, Bytes::copy_from_slice(contents)).await.unwrap();
}

#[tokio::test]
async fn presave_sets_sha1_column() {
    let (_dir, registry) = setup().await;
    write_file(&registry, "temp://druplicon.txt", CONTENTS).await;

    let hasher = FileHasher::new(sha1_config(), Arc::clone(&registry));
    let mut record = FileRecord::new("temp://druplicon.txt", "text/plain");

    hasher.presave(&mut record).await;
    assert_eq!(record.hash(Algorithm::Sha1).unwrap().as_str(), CONTENTS_SHA1);
}

#[tokio::test]
async fn mime_allowlist_end_to_end() {
    let (_dir, registry) = setup().await;
    write_file(&registry, "temp://plain.txt", CONTENTS).await;
    write_file(&registry, "temp://blob.bin", CONTENTS).await;

    let config = FixityConfig {
        mime_types: vec!["application/octet-stream".to_string()],
        ..sha1_config()
    };
    let hasher = FileHasher::new(config, Arc::clone(&registry));

    let mut excluded = FileRecord::new("temp://plain.txt", "text/plain");
    hasher.presave(&mut excluded).await;
    assert_eq!(excluded.hash(Algorithm::Sha1), None);

    let mut allowed = FileRecord::new("temp://blob.bin", "application/octet-stream");
    hasher.presave(&mut allowed).await;
    assert_eq!(allowed.hash(Algorithm::Sha1).unwrap().as_str(), CONTENTS_SHA1);
}

#[tokio::test]
async fn unreadable_file_clears_all_requested_columns() {
    let (_dir, registry) = setup().await;

    let config = FixityConfig {
        algorithms: vec![Algorithm::Sha1, Algorithm::Sha256, Algorithm::Blake2b256],
        ..FixityConfig::default()
    };
    let hasher = FileHasher::new(config, Arc::clone(&registry));

    let mut record = FileRecord::new("temp://never-written.bin", "application/octet-stream");
    hasher.hash(&mut record, None, false).await;

    for algorithm in [Algorithm::Sha1, Algorithm::Sha256, Algorithm::Blake2b256] {
        assert_eq!(record.hash(algorithm), None, "{algorithm}");
    }
}

#[tokio::test]
async fn record_without_uri_is_skipped() {
    let (_dir, registry) = setup().await;
    let hasher = FileHasher::new(sha1_config(), Arc::clone(&registry));

    let mut record = FileRecord::without_uri("text/plain");
    let placeholder = Digest::from_hex("00ff00ff").unwrap();
    record.set_hash(Algorithm::Sha1, Some(placeholder.clone()));

    hasher.presave(&mut record).await;
    assert_eq!(record.hash(Algorithm::Sha1), Some(&placeholder));
}

#[tokio::test]
async fn rehash_disabled_keeps_existing_values() {
    let (_dir, registry) = setup().await;
    write_file(&registry, "temp://file.bin", CONTENTS).await;

    let hasher = FileHasher::new(sha1_config(), Arc::clone(&registry));
    let mut record = FileRecord::new("temp://file.bin", "application/octet-stream");
    hasher.presave(&mut record).await;
    record.mark_saved();

    // Contents change on disk, but with rehash off a populated record
    // triggers no recomputation.
    write_file(&registry, "temp://file.bin", DIFFERENT_CONTENTS).await;
    hasher.presave(&mut record).await;
    assert_eq!(record.hash(Algorithm::Sha1).unwrap().as_str(), CONTENTS_SHA1);
}

#[tokio::test]
async fn rehash_enabled_recomputes_populated_record() {
    let (_dir, registry) = setup().await;
    write_file(&registry, "temp://file.bin", CONTENTS).await;

    let config = FixityConfig {
        rehash: true,
        ..sha1_config()
    };
    let hasher = FileHasher::new(config, Arc::clone(&registry));
    let mut record = FileRecord::new("temp://file.bin", "application/octet-stream");
    hasher.presave(&mut record).await;
    record.mark_saved();

    write_file(&registry, "temp://file.bin", DIFFERENT_CONTENTS).await;
    hasher.presave(&mut record).await;
    assert_ne!(record.hash(Algorithm::Sha1).unwrap().as_str(), CONTENTS_SHA1);
}

#[tokio::test]
async fn original_columns_written_only_on_first_save() {
    let (_dir, registry) = setup().await;
    write_file(&registry, "temp://file.bin", CONTENTS).await;

    let config = FixityConfig {
        rehash: true,
        original: true,
        ..sha1_config()
    };
    let hasher = FileHasher::new(config, Arc::clone(&registry));

    let mut record = FileRecord::new("temp://file.bin", "application/octet-stream");
    hasher.presave(&mut record).await;
    assert_eq!(
        record.original_hash(Algorithm::Sha1).unwrap().as_str(),
        CONTENTS_SHA1
    );
    record.mark_saved();

    write_file(&registry, "temp://file.bin", DIFFERENT_CONTENTS).await;
    hasher.presave(&mut record).await;

    // The current column follows the content; the original column
    // keeps its first value.
    assert_ne!(record.hash(Algorithm::Sha1).unwrap().as_str(), CONTENTS_SHA1);
    assert_eq!(
        record.original_hash(Algorithm::Sha1).unwrap().as_str(),
        CONTENTS_SHA1
    );
}

#[tokio::test]
async fn autohash_runs_once_per_process() {
    let (_dir, registry) = setup().await;
    write_file(&registry, "temp://loaded.bin", CONTENTS).await;

    let config = FixityConfig {
        autohash: true,
        ..sha1_config()
    };
    let hasher = FileHasher::new(config, Arc::clone(&registry));

    let mut record = FileRecord::new("temp://loaded.bin", "application/octet-stream");
    record.mark_saved();

    let mut records = vec![record];
    let updated = hasher.load(&mut records).await;
    assert_eq!(updated, vec![records[0].id]);
    assert_eq!(
        records[0].hash(Algorithm::Sha1).unwrap().as_str(),
        CONTENTS_SHA1
    );

    // A second load of the same file does not hash again, even with a
    // cleared column.
    records[0].set_hash(Algorithm::Sha1, None);
    let updated = hasher.load(&mut records).await;
    assert!(updated.is_empty());
    assert_eq!(records[0].hash(Algorithm::Sha1), None);
}

#[tokio::test]
async fn autohash_disabled_is_inert() {
    let (_dir, registry) = setup().await;
    write_file(&registry, "temp://loaded.bin", CONTENTS).await;

    let hasher = FileHasher::new(sha1_config(), Arc::clone(&registry));
    let mut records = vec![FileRecord::new("temp://loaded.bin", "application/octet-stream")];
    let updated = hasher.load(&mut records).await;
    assert!(updated.is_empty());
    assert_eq!(records[0].hash(Algorithm::Sha1), None);
}

#[tokio::test]
async fn duplicate_lookup_finds_permanent_twin() {
    let (_dir, registry) = setup().await;
    write_file(&registry, "temp://one.bin", CONTENTS).await;
    write_file(&registry, "temp://two.bin", CONTENTS).await;

    let hasher = FileHasher::new(sha1_config(), Arc::clone(&registry));
    let index = MemoryFileIndex::new();

    let mut first = FileRecord::new("temp://one.bin", "application/octet-stream");
    hasher.presave(&mut first).await;
    first.status = FileStatus::Permanent;
    index.upsert(first.clone());

    let mut second = FileRecord::new("temp://two.bin", "application/octet-stream");
    hasher.presave(&mut second).await;
    index.upsert(second.clone());

    let found = hasher
        .duplicate_lookup(&index, Algorithm::Sha1, &second, false, false)
        .await;
    assert_eq!(found, Some(first.id));

    // A record only ever matches other rows, not itself.
    let found = hasher
        .duplicate_lookup(&index, Algorithm::Sha1, &first, false, false)
        .await;
    assert_eq!(found, None);
}

#[tokio::test]
async fn multi_algorithm_pass_is_atomic() {
    let (_dir, registry) = setup().await;
    write_file(&registry, "temp://multi.bin", CONTENTS).await;

    let config = FixityConfig {
        algorithms: vec![Algorithm::Sha1, Algorithm::Sha256, Algorithm::Blake2b512],
        ..FixityConfig::default()
    };
    let hasher = FileHasher::new(config, Arc::clone(&registry));

    let mut record = FileRecord::new("temp://multi.bin", "application/octet-stream");
    hasher.presave(&mut record).await;

    assert_eq!(record.hash(Algorithm::Sha1).unwrap().as_str(), CONTENTS_SHA1);
    assert_eq!(
        record.hash(Algorithm::Sha256).unwrap().as_str(),
        "916f0027a575074ce72a331777c3478d6513f786a591bd892da1a577bf2335f9"
    );
    assert_eq!(
        record.hash(Algorithm::Blake2b512).unwrap().hex_len(),
        Algorithm::Blake2b512.hex_len()
    );
}
