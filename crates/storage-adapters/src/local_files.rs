//! # Local file store
//! community-board/crates/storage-adapters/src/local_files.rs
//! `tokio::fs` implementation of `FileStore`.

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use domains::{FileStore, StorageError};
use tokio::fs;
use tracing::debug;

/// Operates on absolute paths handed in by the attachment layout; it has no
/// notion of posts or references itself.
#[derive(Debug, Clone, Default)]
pub struct LocalFileStore;

impl LocalFileStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn ensure_dir(&self, path: &Path) -> Result<(), StorageError> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| StorageError::io(path, e))
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        debug!(path = %path.display(), size = bytes.len(), "file_store: write");
        fs::write(path, bytes)
            .await
            .map_err(|e| StorageError::io(path, e))
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<(), StorageError> {
        debug!(from = %from.display(), to = %to.display(), "file_store: rename");
        match fs::rename(from, to).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::Missing(from.to_path_buf())),
            Err(e) => Err(StorageError::io(from, e)),
        }
    }

    async fn delete_if_exists(&self, path: &Path) -> Result<(), StorageError> {
        match fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "file_store: deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    async fn delete_tree(&self, path: &Path) -> Result<(), StorageError> {
        match fs::remove_dir_all(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "file_store: deleted tree");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }
}
