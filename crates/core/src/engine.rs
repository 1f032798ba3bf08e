//! Single-pass streaming digest computation.
//!
//! The engine reads a byte stream once and feeds every chunk to every
//! requested algorithm's incremental state, so N digests cost one read
//! of the stream. Stream errors abort the whole pass; callers translate
//! the error into their own "digest unknown" representation.

use crate::algorithm::{Algorithm, Digest, HashState};
use std::collections::HashMap;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Default read chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Compute digests for every requested algorithm in one pass.
///
/// Chunks are fed to all states in stream order, so each digest covers
/// the full byte sequence exactly once. Duplicate algorithms in the
/// request are collapsed. A read error aborts the pass; no partial
/// digests are returned.
pub async fn compute_digests<R>(
    mut reader: R,
    algorithms: &[Algorithm],
    chunk_size: usize,
) -> io::Result<HashMap<Algorithm, Digest>>
where
    R: AsyncRead + Unpin,
{
    debug_assert!(!algorithms.is_empty());
    debug_assert!(chunk_size > 0);

    let mut states: Vec<(Algorithm, HashState)> = Vec::with_capacity(algorithms.len());
    for &algorithm in algorithms {
        if !states.iter().any(|(a, _)| *a == algorithm) {
            states.push((algorithm, algorithm.state()));
        }
    }

    let mut buf = vec![0u8; chunk_size];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        for (_, state) in &mut states {
            state.update(&buf[..n]);
        }
    }

    Ok(states
        .into_iter()
        .map(|(algorithm, state)| (algorithm, state.finalize()))
        .collect())
}

/// Compute a single digest with a monomorphic hasher.
///
/// This is the whole-stream fast path used when exactly one algorithm
/// is requested: no state table, no per-chunk dispatch. The result is
/// bit-identical to [`compute_digests`] for the same input.
pub async fn digest_single<R>(
    reader: R,
    algorithm: Algorithm,
    chunk_size: usize,
) -> io::Result<Digest>
where
    R: AsyncRead + Unpin,
{
    use blake2::Blake2b;
    use blake2::digest::consts::{U20, U32, U64};

    match algorithm {
        Algorithm::Md5 => digest_with::<md5::Md5, _>(reader, chunk_size).await,
        Algorithm::Sha1 => digest_with::<sha1::Sha1, _>(reader, chunk_size).await,
        Algorithm::Sha224 => digest_with::<sha2::Sha224, _>(reader, chunk_size).await,
        Algorithm::Sha256 => digest_with::<sha2::Sha256, _>(reader, chunk_size).await,
        Algorithm::Sha384 => digest_with::<sha2::Sha384, _>(reader, chunk_size).await,
        Algorithm::Sha512 => digest_with::<sha2::Sha512, _>(reader, chunk_size).await,
        Algorithm::Blake2b160 => digest_with::<Blake2b<U20>, _>(reader, chunk_size).await,
        Algorithm::Blake2b256 => digest_with::<Blake2b<U32>, _>(reader, chunk_size).await,
        Algorithm::Blake2b512 => digest_with::<Blake2b<U64>, _>(reader, chunk_size).await,
    }
}

async fn digest_with<D, R>(mut reader: R, chunk_size: usize) -> io::Result<Digest>
where
    D: sha2::Digest,
    R: AsyncRead + Unpin,
{
    let mut hasher = D::new();
    let mut buf = vec![0u8; chunk_size];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Digest::from_raw(&hasher.finalize()))
}
