//! # Attachment reconciliation
//!
//! Computes a post's ordered attachment list and performs the matching file
//! operations. Two entry points:
//!
//! - [`AttachmentReconciler::place`] writes the uploads of a new post as
//!   `1-{ts}{ext}`, `2-{ts}{ext}`, ... in arrival order.
//! - [`AttachmentReconciler::reconcile`] applies an update in three phases:
//!   delete, placement into a sparse working set, then normalization, which
//!   renames every occupied slot to `{ordinal}-{ts}{ext}` with ordinals
//!   counted over occupied slots only. Gaps therefore collapse: a lone
//!   attachment repositioned to index 2 comes out as ordinal 1.
//!
//! All instructions are validated before the first filesystem call. A failure
//! after that point aborts the pass without undoing the files already written,
//! renamed or deleted.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use domains::{
    extension_of, AppError, AttachmentRef, FileStore, RepositionInstruction, StorageError,
    UploadedBlob,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::layout::AttachmentLayout;

const OPERATION: &str = "reconcile_attachments";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileLimits {
    /// Upper bound on attachments per post; reposition indices must stay below it.
    pub max_attachments: usize,
}

impl Default for ReconcileLimits {
    fn default() -> Self {
        Self { max_attachments: 64 }
    }
}

/// Timestamp for one reconciliation pass: `now_millis`, pushed past every
/// timestamp used by the post's stored attachments so no canonical target can
/// coincide with a file that is still waiting to be renamed.
pub fn pass_timestamp<'a>(
    now_millis: i64,
    existing: impl IntoIterator<Item = &'a AttachmentRef>,
) -> Result<i64, AppError> {
    existing
        .into_iter()
        .filter_map(AttachmentRef::timestamp_millis)
        .try_fold(now_millis, |acc, ts| -> Result<i64, AppError> {
            let next = ts.checked_add(1).ok_or_else(|| {
                AppError::ValidationError(format!("attachment timestamp {ts} is out of range"))
            })?;
            Ok(acc.max(next))
        })
}

/// An occupied position of the working set.
#[derive(Debug)]
struct Slot {
    source: PathBuf,
    ext: String,
}

/// Reconciliation input that passed validation, with every reference
/// resolved to its path.
struct Plan {
    deletions: Vec<PathBuf>,
    repositions: BTreeMap<usize, Slot>,
    length: usize,
}

pub struct AttachmentReconciler {
    files: Arc<dyn FileStore>,
    layout: AttachmentLayout,
    limits: ReconcileLimits,
}

impl AttachmentReconciler {
    pub fn new(files: Arc<dyn FileStore>, layout: AttachmentLayout, limits: ReconcileLimits) -> Self {
        Self {
            files,
            layout,
            limits,
        }
    }

    pub fn layout(&self) -> &AttachmentLayout {
        &self.layout
    }

    /// Create-time placement. Blob `i` becomes `{i + 1}-{timestamp}{ext}`.
    pub async fn place(
        &self,
        id: Uuid,
        uploads: &[UploadedBlob],
        timestamp: i64,
    ) -> Result<Vec<AttachmentRef>, AppError> {
        if uploads.len() > self.limits.max_attachments {
            return Err(AppError::ValidationError(format!(
                "{} attachments exceed the limit of {}",
                uploads.len(),
                self.limits.max_attachments
            )));
        }

        let dir = self.layout.post_dir(id);
        self.files.ensure_dir(&dir).await.map_err(|e| io(id, e))?;

        let mut placed = Vec::with_capacity(uploads.len());
        for (i, blob) in uploads.iter().enumerate() {
            let file_name = format!("{}-{}{}", i + 1, timestamp, blob.extension());
            self.files
                .write(&dir.join(&file_name), &blob.bytes)
                .await
                .map_err(|e| io(id, e))?;
            placed.push(self.layout.reference(id, &file_name));
        }
        debug!(post_id = %id, count = placed.len(), "attachments placed");
        Ok(placed)
    }

    /// Update-time reconciliation; returns the new, gap-free attachment list.
    pub async fn reconcile(
        &self,
        id: Uuid,
        repositions: &[RepositionInstruction],
        deletions: &[AttachmentRef],
        uploads: Vec<UploadedBlob>,
        timestamp: i64,
    ) -> Result<Vec<AttachmentRef>, AppError> {
        let Plan {
            deletions,
            repositions: mut slots,
            length,
        } = self.plan(id, repositions, deletions, uploads.len(), timestamp)?;

        let dir = self.layout.post_dir(id);
        self.files.ensure_dir(&dir).await.map_err(|e| io(id, e))?;

        for path in &deletions {
            self.files.delete_if_exists(path).await.map_err(|e| io(id, e))?;
        }

        // Fill the empty positions, lowest index first, in upload arrival order.
        let mut uploads = uploads.into_iter();
        for index in 0..length {
            if slots.contains_key(&index) {
                continue;
            }
            let Some(blob) = uploads.next() else {
                break;
            };
            let ext = blob.extension();
            let source = dir.join(format!("temp_{timestamp}_{index}{ext}"));
            self.files
                .write(&source, &blob.bytes)
                .await
                .map_err(|e| io(id, e))?;
            slots.insert(index, Slot { source, ext });
        }

        let mut attachments = Vec::with_capacity(slots.len());
        for (index, slot) in slots {
            let file_name = format!("{}-{}{}", attachments.len() + 1, timestamp, slot.ext);
            match self.files.rename(&slot.source, &dir.join(&file_name)).await {
                Ok(()) => attachments.push(self.layout.reference(id, &file_name)),
                Err(StorageError::Missing(path)) => {
                    warn!(post_id = %id, index, path = %path.display(), "attachment source missing, slot skipped");
                }
                Err(e) => return Err(io(id, e)),
            }
        }

        debug!(
            post_id = %id,
            deleted = deletions.len(),
            count = attachments.len(),
            "attachments reconciled"
        );
        Ok(attachments)
    }

    /// Removes the whole attachment directory of a post.
    pub async fn discard(&self, id: Uuid) -> Result<(), AppError> {
        self.files
            .delete_tree(&self.layout.post_dir(id))
            .await
            .map_err(|e| AppError::io("delete_attachments", id, e))
    }

    fn plan(
        &self,
        id: Uuid,
        repositions: &[RepositionInstruction],
        deletions: &[AttachmentRef],
        upload_count: usize,
        timestamp: i64,
    ) -> Result<Plan, AppError> {
        let max = self.limits.max_attachments;

        let deleted: HashSet<&AttachmentRef> = deletions.iter().collect();
        let deletions = deletions
            .iter()
            .map(|reference| self.layout.resolve(id, reference))
            .collect::<Result<Vec<_>, _>>()?;

        let mut claimed: HashMap<&AttachmentRef, usize> = HashMap::new();
        let mut slots = BTreeMap::new();
        for instruction in repositions {
            let reference = &instruction.reference;
            if instruction.index >= max {
                return Err(AppError::ValidationError(format!(
                    "reposition index {} is out of range (limit {max})",
                    instruction.index
                )));
            }
            if deleted.contains(reference) {
                return Err(AppError::ValidationError(format!(
                    "attachment {reference} is both deleted and repositioned"
                )));
            }
            if let Some(previous) = claimed.insert(reference, instruction.index) {
                if previous != instruction.index {
                    return Err(AppError::ValidationError(format!(
                        "attachment {reference} is repositioned to both {previous} and {}",
                        instruction.index
                    )));
                }
            }
            // Sources must predate the pass or a rename could land on one.
            if reference.timestamp_millis().is_some_and(|ts| ts >= timestamp) {
                return Err(AppError::ValidationError(format!(
                    "attachment {reference} is not older than the update at {timestamp}"
                )));
            }
            let source = self.layout.resolve(id, reference)?;
            let ext = extension_of(reference.file_name());
            // Later instructions for the same index win.
            slots.insert(instruction.index, Slot { source, ext });
        }

        if slots.len() + upload_count > max {
            return Err(AppError::ValidationError(format!(
                "{} attachments exceed the limit of {max}",
                slots.len() + upload_count
            )));
        }

        let next_after_max = repositions.iter().map(|r| r.index + 1).max().unwrap_or(0);
        let length = next_after_max.max(repositions.len() + upload_count);

        Ok(Plan {
            deletions,
            repositions: slots,
            length,
        })
    }
}

fn io(id: Uuid, source: StorageError) -> AppError {
    AppError::io(OPERATION, id, source)
}
