//! Archive digests and checksum verification.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use md5::Md5;
use sha2::{Digest, Sha256};

use crate::core::{Checksum, ChecksumAlgorithm, PortError};

const CHUNK_SIZE: usize = 16 * 1024;

/// Stream a file through any digest and return the lowercase hex result.
fn digest_file<D: Digest>(path: &Path) -> Result<String> {
    let file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut reader = BufReader::new(file);
    let mut hasher = D::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute the MD5 digest of a file.
pub fn md5_file(path: &Path) -> Result<String> {
    digest_file::<Md5>(path)
}

/// Compute the SHA-256 digest of a file.
pub fn sha256_file(path: &Path) -> Result<String> {
    digest_file::<Sha256>(path)
}

/// Compute the digest a checksum declares.
pub fn file_digest(path: &Path, algorithm: ChecksumAlgorithm) -> Result<String> {
    match algorithm {
        ChecksumAlgorithm::Md5 => md5_file(path),
        ChecksumAlgorithm::Sha256 => sha256_file(path),
    }
}

/// Compare a file against a reference checksum, ignoring hex case.
///
/// Returns `ChecksumMismatch` carrying both digests on failure.
pub fn verify(path: &Path, expected: &Checksum) -> Result<()> {
    let found = file_digest(path, expected.algorithm)?;
    tracing::debug!(
        "{} of {}: {} (expected {})",
        expected.algorithm,
        path.display(),
        found,
        expected.digest
    );

    if !found.eq_ignore_ascii_case(expected.digest.trim()) {
        return Err(PortError::ChecksumMismatch {
            archive: path.display().to_string(),
            expected: expected.digest.to_lowercase(),
            found,
        }
        .into());
    }
    Ok(())
}
