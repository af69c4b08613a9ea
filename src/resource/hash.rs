//! Content identity hashing
//!
//! Hashes are SHA-256 over the served bytes, hex encoded. Same bytes, same
//! hash; the hash is computed once when a resource is built.

use crate::error::{HearthError, HearthResult};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

const STREAM_CHUNK: usize = 64 * 1024;

/// Hash a byte slice
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Hash several parts as one identity, e.g. a document and its server script
pub fn combined_hash<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

/// Hash a file without holding all of it in memory
pub async fn hash_file(path: &Path) -> HearthResult<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| HearthError::io(format!("opening {}", path.display()), e))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; STREAM_CHUNK];
    loop {
        let read = file
            .read(&mut buffer)
            .await
            .map_err(|e| HearthError::io(format!("reading {}", path.display()), e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
