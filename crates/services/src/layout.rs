//! # Attachment layout
//!
//! Maps between persisted references (`{prefix}/{post id}/{file}`) and paths
//! under the storage root (`{root}/{post id}/{file}`). The prefix is the root
//! directory's own name, so references are relative to the root's parent.

use std::path::{Path, PathBuf};

use domains::{AppError, AttachmentRef};
use uuid::Uuid;

const FALLBACK_PREFIX: &str = "dbFiles";

#[derive(Debug, Clone)]
pub struct AttachmentLayout {
    root: PathBuf,
    prefix: String,
}

impl AttachmentLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let prefix = root
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(FALLBACK_PREFIX)
            .to_string();
        Self { root, prefix }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn post_dir(&self, id: Uuid) -> PathBuf {
        self.root.join(id.to_string())
    }

    pub fn reference(&self, id: Uuid, file_name: &str) -> AttachmentRef {
        AttachmentRef::new(format!("{}/{}/{}", self.prefix, id, file_name))
    }

    /// Resolves `reference` to a path inside the directory of post `id`.
    ///
    /// Anything that is not exactly `{prefix}/{id}/{file}` with a plain file
    /// name is rejected, so one post can never touch another post's files.
    pub fn resolve(&self, id: Uuid, reference: &AttachmentRef) -> Result<PathBuf, AppError> {
        let mut segments = reference.as_str().split('/');
        let (Some(prefix), Some(owner), Some(file), None) =
            (segments.next(), segments.next(), segments.next(), segments.next())
        else {
            return Err(foreign(id, reference));
        };

        let plain_file = !file.is_empty() && file != "." && file != ".." && !file.contains('\\');
        if prefix != self.prefix || owner != id.to_string() || !plain_file {
            return Err(foreign(id, reference));
        }
        Ok(self.post_dir(id).join(file))
    }
}

fn foreign(id: Uuid, reference: &AttachmentRef) -> AppError {
    AppError::ValidationError(format!(
        "attachment {reference} does not belong to post {id}"
    ))
}
