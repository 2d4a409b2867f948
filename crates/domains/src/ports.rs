//! # Ports
//!
//! Any adapter must implement these traits to be wired into the binary.

use std::path::Path;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StorageError;
use crate::models::{AttachmentRef, Page, Post, PostFields, SearchFilter};

/// Directory and file primitives used by attachment reconciliation.
///
/// Every call completes before returning; nothing is fire-and-forget.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Creates `path` and any missing ancestors. No-op if it already exists.
    async fn ensure_dir(&self, path: &Path) -> Result<(), StorageError>;

    /// Creates or overwrites `path`. The parent directory must exist.
    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError>;

    /// Moves `from` to `to`. Returns `StorageError::Missing` if `from` is absent.
    async fn rename(&self, from: &Path, to: &Path) -> Result<(), StorageError>;

    /// Removes a file; succeeds if it is already gone.
    async fn delete_if_exists(&self, path: &Path) -> Result<(), StorageError>;

    /// Removes a directory recursively; succeeds if it is already gone.
    async fn delete_tree(&self, path: &Path) -> Result<(), StorageError>;
}

/// Persistence contract for posts. Implementations stamp `created_at` and
/// `updated_at` on every write.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, id: Uuid, fields: PostFields) -> Result<Post, StorageError>;

    async fn read(&self, id: Uuid) -> Result<Option<Post>, StorageError>;

    /// Replaces the mutable fields and the attachment list. `None` if absent.
    async fn update(
        &self,
        id: Uuid,
        fields: PostFields,
        attachments: Vec<AttachmentRef>,
    ) -> Result<Option<Post>, StorageError>;

    /// Returns `false` if no post with `id` existed.
    async fn delete(&self, id: Uuid) -> Result<bool, StorageError>;

    /// Most recently updated first, at most `PAGE_SIZE` entries.
    async fn search(&self, filter: &SearchFilter, page: Page) -> Result<Vec<Post>, StorageError>;
}
