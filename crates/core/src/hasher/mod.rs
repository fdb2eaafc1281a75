//! Content fingerprinting for cache keys.
//!
//! Files up to [`FULL_HASH_THRESHOLD`] are hashed in full. Larger files are
//! fingerprinted from their first [`PARTIAL_HASH_BYTES`] plus size and
//! modification time, which keeps big media files cheap to re-check at the
//! cost of missing tail-only edits that leave the mtime alone. The result is
//! a short cache key and must not be used to verify content integrity.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

/// Files at or below this size are hashed in full.
pub const FULL_HASH_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Bytes read from the head of files above the threshold.
pub const PARTIAL_HASH_BYTES: u64 = 10 * 1024 * 1024;

/// Length of a fingerprint in hex characters.
pub const FINGERPRINT_LEN: usize = 16;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Errors that can occur while fingerprinting.
#[derive(Debug, Error)]
pub enum HashError {
    /// The file could not be statted or read.
    #[error("Failed to fingerprint {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Computes fingerprints with configurable size thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprinter {
    full_hash_threshold: u64,
    partial_hash_bytes: u64,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self {
            full_hash_threshold: FULL_HASH_THRESHOLD,
            partial_hash_bytes: PARTIAL_HASH_BYTES,
        }
    }
}

impl Fingerprinter {
    /// Creates a fingerprinter with custom thresholds.
    pub fn with_thresholds(full_hash_threshold: u64, partial_hash_bytes: u64) -> Self {
        Self {
            full_hash_threshold,
            partial_hash_bytes,
        }
    }

    /// Computes the fingerprint of a file.
    pub async fn fingerprint(&self, path: &Path) -> Result<String, HashError> {
        let meta = fs::metadata(path)
            .await
            .map_err(|e| HashError::io(path, e))?;

        if !meta.is_file() {
            return Err(HashError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }

        let file = File::open(path).await.map_err(|e| HashError::io(path, e))?;
        let reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
        let mut hasher = Sha256::new();

        if meta.len() <= self.full_hash_threshold {
            feed(reader, &mut hasher)
                .await
                .map_err(|e| HashError::io(path, e))?;
        } else {
            feed(reader.take(self.partial_hash_bytes), &mut hasher)
                .await
                .map_err(|e| HashError::io(path, e))?;

            let mtime_nanos = meta
                .modified()
                .map_err(|e| HashError::io(path, e))?
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0);

            hasher.update(meta.len().to_le_bytes());
            hasher.update(mtime_nanos.to_le_bytes());
        }

        let mut digest = format!("{:x}", hasher.finalize());
        digest.truncate(FINGERPRINT_LEN);
        Ok(digest)
    }
}

/// Computes the fingerprint of a file with the default thresholds.
pub async fn fingerprint(path: &Path) -> Result<String, HashError> {
    Fingerprinter::default().fingerprint(path).await
}

async fn feed<R: AsyncRead + Unpin>(mut reader: R, hasher: &mut Sha256) -> std::io::Result<()> {
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let bytes_read = reader.read(&mut buffer).await?;
        if bytes_read == 0 {
            return Ok(());
        }
        hasher.update(&buffer[..bytes_read]);
    }
}
