//! Streaming artifact download with checksum accumulation.

use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use super::traits::{ArtifactStream, ProgressCallback};
use super::{ManagerError, ManagerResult};

/// Size of each read from the response body.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Result of streaming a body to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamedArtifact {
    /// Bytes written.
    pub bytes: u64,
    /// Lowercase hex SHA-256 of the written bytes.
    pub sha256: String,
    /// Lowercase hex BLAKE3 of the written bytes.
    pub blake3: String,
}

/// Copy `stream` into `file` chunk by chunk.
///
/// Every chunk is hashed and reported to `on_progress`. The token is checked
/// before each read, so a cancelled download stops at the next chunk
/// boundary with [`ManagerError::Cancelled`]. Interrupted reads are retried.
///
/// The caller owns the file and is responsible for removing it on error.
pub fn stream_to_file(
    cancel: &CancellationToken,
    url: &str,
    stream: ArtifactStream,
    file: &mut File,
    path: &Path,
    on_progress: Option<&ProgressCallback>,
) -> ManagerResult<StreamedArtifact> {
    let total = stream.content_length.unwrap_or(0);
    let mut reader = stream.reader;
    let mut sha256_hasher = Sha256::new();
    let mut blake3_hasher = blake3::Hasher::new();
    let mut buffer = [0u8; CHUNK_SIZE];
    let mut downloaded: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            tracing::debug!(url, downloaded, "Download cancelled");
            return Err(ManagerError::Cancelled {
                url: url.to_string(),
            });
        }

        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(ManagerError::HttpError {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
        };

        let chunk = &buffer[..bytes_read];
        file.write_all(chunk)
            .map_err(|source| ManagerError::WriteFailed {
                path: path.to_path_buf(),
                source,
            })?;
        sha256_hasher.update(chunk);
        blake3_hasher.update(chunk);
        downloaded += bytes_read as u64;

        if let Some(callback) = on_progress {
            callback(downloaded, total);
        }
    }

    file.flush().map_err(|source| ManagerError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(StreamedArtifact {
        bytes: downloaded,
        sha256: format!("{:x}", sha256_hasher.finalize()),
        blake3: blake3_hasher.finalize().to_hex().to_string(),
    })
}

/// Compare a computed digest against the expected one.
///
/// Case-insensitive, surrounding whitespace ignored.
pub fn checksum_matches(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}
