//! # PostService
//!
//! Sequences the repository and the attachment reconciler for each request.
//! `update` and `delete` hold a per-post lock from the first read until the
//! repository write, so two requests never interleave file operations on the
//! same directory.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    AppError, FileStore, Page, Post, PostFields, PostRepository, Result, SearchFilter,
    UpdatePost, UploadedBlob,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::layout::AttachmentLayout;
use crate::locks::KeyedLocks;
use crate::reconciler::{pass_timestamp, AttachmentReconciler, ReconcileLimits};

pub struct PostService {
    repo: Arc<dyn PostRepository>,
    reconciler: AttachmentReconciler,
    locks: KeyedLocks<Uuid>,
}

impl PostService {
    pub fn new(
        repo: Arc<dyn PostRepository>,
        files: Arc<dyn FileStore>,
        layout: AttachmentLayout,
        limits: ReconcileLimits,
    ) -> Self {
        Self {
            repo,
            reconciler: AttachmentReconciler::new(files, layout, limits),
            locks: KeyedLocks::new(),
        }
    }

    pub fn layout(&self) -> &AttachmentLayout {
        self.reconciler.layout()
    }

    /// Assigns a fresh identity, persists the row, then places the uploads.
    ///
    /// If placement or the attachment write fails, the new row and directory
    /// are removed again, so a failed create leaves no half-populated post
    /// behind.
    pub async fn create(&self, fields: PostFields, uploads: Vec<UploadedBlob>) -> Result<Post> {
        let id = Uuid::now_v7();
        let _guard = self.locks.acquire(id).await;

        let post = self
            .repo
            .create(id, fields.clone())
            .await
            .map_err(|e| AppError::io("create_post", id, e))?;

        match self.populate(post, fields, &uploads).await {
            Ok(post) => {
                info!(post_id = %id, attachments = post.attachments.len(), "post created");
                Ok(post)
            }
            Err(e) => {
                self.abandon(id).await;
                Err(e)
            }
        }
    }

    async fn populate(&self, post: Post, fields: PostFields, uploads: &[UploadedBlob]) -> Result<Post> {
        let id = post.id;
        let attachments = self
            .reconciler
            .place(id, uploads, Utc::now().timestamp_millis())
            .await?;
        if attachments.is_empty() {
            return Ok(post);
        }
        self.repo
            .update(id, fields, attachments)
            .await
            .map_err(|e| AppError::io("create_post", id, e))?
            .ok_or_else(|| AppError::post_not_found(id))
    }

    pub async fn read(&self, id: Uuid) -> Result<Post> {
        self.repo
            .read(id)
            .await
            .map_err(|e| AppError::io("read_post", id, e))?
            .ok_or_else(|| AppError::post_not_found(id))
    }

    /// Reconciles attachments, then persists the new list with the fields.
    ///
    /// The repository write is the commit point: if reconciliation fails the
    /// stored list is untouched, even though some files may already have moved.
    pub async fn update(&self, update: UpdatePost, uploads: Vec<UploadedBlob>) -> Result<Post> {
        let id = update.id;
        let _guard = self.locks.acquire(id).await;

        let current = self.read(id).await?;
        let timestamp = pass_timestamp(Utc::now().timestamp_millis(), &current.attachments)?;

        let upload_count = uploads.len();
        let attachments = self
            .reconciler
            .reconcile(id, &update.repositions, &update.deletions, uploads, timestamp)
            .await?;

        let post = self
            .repo
            .update(id, update.fields, attachments)
            .await
            .map_err(|e| AppError::io("update_post", id, e))?
            .ok_or_else(|| AppError::post_not_found(id))?;

        info!(
            post_id = %id,
            uploaded = upload_count,
            deleted = update.deletions.len(),
            attachments = post.attachments.len(),
            "post updated"
        );
        Ok(post)
    }

    /// Removes the attachment directory first, then the row. A failure while
    /// removing files leaves the row in place.
    pub async fn delete(&self, id: Uuid) -> Result<Post> {
        let _guard = self.locks.acquire(id).await;

        let post = self.read(id).await?;
        self.reconciler.discard(id).await?;

        let removed = self
            .repo
            .delete(id)
            .await
            .map_err(|e| AppError::io("delete_post", id, e))?;
        if !removed {
            return Err(AppError::post_not_found(id));
        }

        info!(post_id = %id, "post deleted");
        Ok(post)
    }

    pub async fn list(&self, filter: &SearchFilter, page: Page) -> Result<Vec<Post>> {
        self.repo
            .search(filter, page)
            .await
            .map_err(|e| AppError::io("list_posts", format!("page {}", page.0), e))
    }

    async fn abandon(&self, id: Uuid) {
        if let Err(e) = self.reconciler.discard(id).await {
            warn!(post_id = %id, error = %e, "failed to remove attachments of abandoned post");
        }
        if let Err(e) = self.repo.delete(id).await {
            warn!(post_id = %id, error = %e, "failed to remove abandoned post");
        }
    }
}
