//! # Domain Models
//!
//! These structs represent the core entities of the community board.
//! Post identities are UUID v7, so they are globally unique and time-ordered.

use std::fmt;
use std::path::Path;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of posts returned by one page of `search`.
pub const PAGE_SIZE: i64 = 20;

/// Relative storage path of one attachment, e.g. `dbFiles/<post id>/1-1700000000000.jpg`.
///
/// The string is exactly what gets persisted; it is relative to the parent of
/// the storage root so it survives moving the root between deployments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentRef(String);

impl AttachmentRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The final path segment (`{ordinal}-{timestamp}{ext}` for canonical names).
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Millisecond timestamp of a canonical `{ordinal}-{timestamp}{ext}` name.
    /// Returns `None` for temporary or foreign names.
    pub fn timestamp_millis(&self) -> Option<i64> {
        let name = self.file_name();
        let (ordinal, rest) = name.split_once('-')?;
        ordinal.parse::<u32>().ok()?;
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        digits.parse().ok()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for AttachmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for AttachmentRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for AttachmentRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The mutable, user-supplied part of a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFields {
    pub title: String,
    pub text: String,
    pub vessel_code: String,
    pub bay: String,
    /// Hold (true) or deck (false)
    pub is_hold: bool,
    /// Loading (true) or discharging (false)
    #[serde(rename = "isLD")]
    pub is_ld: bool,
}

impl Default for PostFields {
    fn default() -> Self {
        Self {
            title: String::new(),
            text: String::new(),
            vessel_code: String::new(),
            bay: String::new(),
            is_hold: true,
            is_ld: true,
        }
    }
}

/// One community entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: PostFields,
    /// Display order; always contiguous from index 0.
    pub attachments: Vec<AttachmentRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Declares that the attachment known by `reference` moves to `index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositionInstruction {
    pub index: usize,
    pub reference: AttachmentRef,
}

/// A file received with a create or update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedBlob {
    /// Client-side filename; only its extension is ever used.
    pub file_name: String,
    pub bytes: Bytes,
}

impl UploadedBlob {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn extension(&self) -> String {
        extension_of(&self.file_name)
    }
}

/// Everything an update request carries besides the uploaded files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePost {
    pub id: Uuid,
    pub fields: PostFields,
    pub repositions: Vec<RepositionInstruction>,
    pub deletions: Vec<AttachmentRef>,
}

/// Extension of `file_name` including the leading dot, or an empty string.
///
/// Dotfiles such as `.bashrc` have no extension.
pub fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

/// Text fields that `search` may match against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchField {
    Title,
    Text,
    VesselCode,
    Bay,
}

impl SearchField {
    pub const ALL: [SearchField; 4] = [
        SearchField::Title,
        SearchField::Text,
        SearchField::VesselCode,
        SearchField::Bay,
    ];

    pub fn value<'a>(&self, fields: &'a PostFields) -> &'a str {
        match self {
            SearchField::Title => &fields.title,
            SearchField::Text => &fields.text,
            SearchField::VesselCode => &fields.vessel_code,
            SearchField::Bay => &fields.bay,
        }
    }

    /// Column name used by relational backends.
    pub fn column(&self) -> &'static str {
        match self {
            SearchField::Title => "title",
            SearchField::Text => "text",
            SearchField::VesselCode => "vessel_code",
            SearchField::Bay => "bay",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    pub query: Option<String>,
    pub fields: Vec<SearchField>,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            query: None,
            fields: SearchField::ALL.to_vec(),
        }
    }
}

impl SearchFilter {
    /// Filter over every searchable field.
    pub fn new(query: Option<String>) -> Self {
        Self {
            query,
            ..Self::default()
        }
    }

    /// The trimmed query, or `None` when it is absent or blank (match all).
    pub fn needle(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    /// Case-insensitive substring match over the selected fields.
    pub fn matches(&self, fields: &PostFields) -> bool {
        let Some(needle) = self.needle() else {
            return true;
        };
        let needle = needle.to_lowercase();
        self.fields
            .iter()
            .any(|field| field.value(fields).to_lowercase().contains(&needle))
    }
}

/// Zero-indexed page number.
///
/// Any negative value means "first page, no skip" and behaves exactly like page 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Page(pub i64);

impl Page {
    pub fn offset(&self) -> i64 {
        if self.0 < 0 {
            0
        } else {
            self.0.saturating_mul(PAGE_SIZE)
        }
    }

    pub fn limit(&self) -> i64 {
        PAGE_SIZE
    }
}
