//! File-backed sources and their validity stamps

use crate::error::{HearthError, HearthResult};
use crate::resource::hash::{content_hash, hash_file};
use crate::resource::key::ResourceKind;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Modification stamp of a source file at construction time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStamp {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub size: u64,
}

impl FileStamp {
    /// True when the file on disk no longer matches this stamp.
    ///
    /// A deleted file is stale.
    pub fn is_stale(&self) -> HearthResult<bool> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => {
                let modified = meta
                    .modified()
                    .map_err(|e| HearthError::io(format!("stat {}", self.path.display()), e))?;
                Ok(modified != self.modified || meta.len() != self.size)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            Err(e) => Err(HearthError::io(format!("stat {}", self.path.display()), e)),
        }
    }
}

/// A source file read during construction
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub stamp: FileStamp,
    /// File contents, absent when the file was too large to keep
    pub bytes: Option<Vec<u8>>,
    pub hash: String,
}

impl SourceFile {
    pub fn path(&self) -> &Path {
        &self.stamp.path
    }

    /// Contents as UTF-8 text
    pub fn text(&self) -> HearthResult<String> {
        let bytes = self
            .bytes
            .as_deref()
            .ok_or_else(|| HearthError::not_viable(self.path(), "contents were not loaded"))?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| HearthError::not_viable(self.path(), "not valid UTF-8"))
    }
}

/// Whether a file exists as a regular file
pub async fn exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

/// Read a source file, keeping its bytes.
///
/// Missing files and directories are `NotFound`; files above `max_size`
/// are `NotViable`.
pub async fn read_source(
    kind: ResourceKind,
    name: &str,
    path: &Path,
    max_size: u64,
) -> HearthResult<SourceFile> {
    let stamp = stamp(kind, name, path).await?;
    if stamp.size > max_size {
        return Err(HearthError::not_viable(
            path,
            format!(
                "resource is {} bytes but configured maximum is {} bytes",
                stamp.size, max_size
            ),
        ));
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| HearthError::io(format!("reading {}", path.display()), e))?;
    let hash = content_hash(&bytes);

    debug!("Read {} ({} bytes)", path.display(), bytes.len());
    Ok(SourceFile {
        stamp,
        bytes: Some(bytes),
        hash,
    })
}

/// Read a source file, dropping the bytes of files above `max_size`
/// after hashing them by streaming
pub async fn read_or_hash_source(
    kind: ResourceKind,
    name: &str,
    path: &Path,
    max_size: u64,
) -> HearthResult<SourceFile> {
    let stamp = stamp(kind, name, path).await?;
    if stamp.size <= max_size {
        return read_source(kind, name, path, max_size).await;
    }

    let hash = hash_file(path).await?;
    debug!(
        "Hashed {} without loading ({} bytes over limit)",
        path.display(),
        stamp.size
    );
    Ok(SourceFile {
        stamp,
        bytes: None,
        hash,
    })
}

async fn stamp(kind: ResourceKind, name: &str, path: &Path) -> HearthResult<FileStamp> {
    let meta = match tokio::fs::metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(HearthError::not_found(kind, name));
        }
        Err(e) => return Err(HearthError::io(format!("stat {}", path.display()), e)),
    };

    if !meta.is_file() {
        return Err(HearthError::not_found(kind, name));
    }

    let modified = meta
        .modified()
        .map_err(|e| HearthError::io(format!("stat {}", path.display()), e))?;

    Ok(FileStamp {
        path: path.to_path_buf(),
        modified,
        size: meta.len(),
    })
}
