//! # Wire types
//!
//! Request and response shapes of the `/community` API, plus the parsing of
//! the string-encoded form fields that multipart requests carry.

use chrono::{DateTime, Utc};
use domains::{AppError, AttachmentRef, Post, PostFields, RepositionInstruction};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Envelope wrapped around every response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData<T> {
    pub result: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u16>,
    pub server_time: i64,
}

impl<T: Serialize> ResponseData<T> {
    pub fn from_result(result: T) -> Self {
        Self {
            result,
            error_message: None,
            error_code: None,
            server_time: Utc::now().timestamp_millis(),
        }
    }
}

impl ResponseData<serde_json::Value> {
    /// Errors are reported inside `result`, as `{errorCode, errorMessage}`.
    pub fn from_error(error_code: u16, error_message: impl Into<String>) -> Self {
        Self::from_result(serde_json::json!({
            "errorCode": error_code,
            "errorMessage": error_message.into(),
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDto {
    pub community_id: String,
    pub title: String,
    pub text: String,
    pub images: Vec<String>,
    pub vessel_code: String,
    pub bay: String,
    pub is_hold: bool,
    #[serde(rename = "isLD")]
    pub is_ld: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<Post> for PostDto {
    fn from(post: Post) -> Self {
        Self {
            community_id: post.id.to_string(),
            title: post.fields.title,
            text: post.fields.text,
            images: post
                .attachments
                .into_iter()
                .map(AttachmentRef::into_inner)
                .collect(),
            vessel_code: post.fields.vessel_code,
            bay: post.fields.bay,
            is_hold: post.fields.is_hold,
            is_ld: post.fields.is_ld,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostIdRequest {
    pub community_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPostsRequest {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: i64,
}

#[derive(Debug, Serialize)]
pub struct ListPostsResponse {
    pub communities: Vec<PostDto>,
}

/// One element of the `changedImages` form field.
#[derive(Debug, Deserialize)]
struct ChangedImage {
    index: i64,
    url: String,
}

/// Only the literal `"true"` is true; a missing field falls back to `default`.
pub fn parse_flag(value: Option<&str>, default: bool) -> bool {
    value.map(|v| v == "true").unwrap_or(default)
}

/// Reads the post text fields out of a multipart form.
pub fn post_fields(form: &HashMap<String, String>, flag_default: bool) -> PostFields {
    let text = |key: &str| form.get(key).cloned().unwrap_or_default();
    PostFields {
        title: text("title"),
        text: text("text"),
        vessel_code: text("vesselCode"),
        bay: text("bay"),
        is_hold: parse_flag(form.get("isHold").map(String::as_str), flag_default),
        is_ld: parse_flag(form.get("isLD").map(String::as_str), flag_default),
    }
}

/// Parses `changedImages`, a JSON array of `{index, url}`. Absent or blank means none.
pub fn parse_changed_images(raw: Option<&str>) -> Result<Vec<RepositionInstruction>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(Vec::new());
    };
    let changed: Vec<ChangedImage> = serde_json::from_str(raw)
        .map_err(|e| AppError::ValidationError(format!("changedImages is malformed: {e}")))?;

    changed
        .into_iter()
        .map(|item| {
            let index = usize::try_from(item.index).map_err(|_| {
                AppError::ValidationError(format!("changedImages index {} is negative", item.index))
            })?;
            Ok(RepositionInstruction {
                index,
                reference: AttachmentRef::new(item.url),
            })
        })
        .collect()
}

/// Parses `deletedImages`, a JSON array of references. Empty entries are ignored.
pub fn parse_deleted_images(raw: Option<&str>) -> Result<Vec<AttachmentRef>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(Vec::new());
    };
    let deleted: Vec<String> = serde_json::from_str(raw)
        .map_err(|e| AppError::ValidationError(format!("deletedImages is malformed: {e}")))?;
    Ok(deleted
        .into_iter()
        .filter(|d| !d.is_empty())
        .map(AttachmentRef::new)
        .collect())
}
