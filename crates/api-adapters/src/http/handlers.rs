//! # Post handlers
//!
//! This module coordinates the flow between HTTP requests and `PostService`.

use std::collections::HashMap;

use axum::extract::{Multipart, State};
use axum::Json;
use domains::{AppError, Page, SearchFilter, UpdatePost, UploadedBlob};
use uuid::Uuid;

use super::error::ApiError;
use super::AppState;
use crate::dto::{
    parse_changed_images, parse_deleted_images, post_fields, ListPostsRequest, ListPostsResponse,
    PostDto, PostIdRequest, ResponseData,
};

/// Multipart field carrying uploaded files.
const FILES_FIELD: &str = "files";

type ApiResult<T> = Result<Json<ResponseData<T>>, ApiError>;

/// Splits a multipart body into its text fields and its uploaded files,
/// keeping files in submission order.
async fn read_form(
    mut multipart: Multipart,
) -> Result<(HashMap<String, String>, Vec<UploadedBlob>), ApiError> {
    let mut form = HashMap::new();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == FILES_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await?;
            files.push(UploadedBlob::new(file_name, bytes));
        } else {
            let value = field.text().await?;
            form.insert(name, value);
        }
    }
    Ok((form, files))
}

/// A malformed identity can never match a stored post.
fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::post_not_found(raw))
}

pub async fn create_post(State(state): State<AppState>, multipart: Multipart) -> ApiResult<PostDto> {
    let (form, files) = read_form(multipart).await?;
    let post = state.service.create(post_fields(&form, true), files).await?;
    Ok(Json(ResponseData::from_result(post.into())))
}

pub async fn update_post(State(state): State<AppState>, multipart: Multipart) -> ApiResult<PostDto> {
    let (form, files) = read_form(multipart).await?;
    let id = parse_id(form.get("communityId").map(String::as_str).unwrap_or_default())?;

    let update = UpdatePost {
        id,
        fields: post_fields(&form, false),
        repositions: parse_changed_images(form.get("changedImages").map(String::as_str))?,
        deletions: parse_deleted_images(form.get("deletedImages").map(String::as_str))?,
    };
    let post = state.service.update(update, files).await?;
    Ok(Json(ResponseData::from_result(post.into())))
}

pub async fn read_post(
    State(state): State<AppState>,
    Json(request): Json<PostIdRequest>,
) -> ApiResult<PostDto> {
    let post = state.service.read(parse_id(&request.community_id)?).await?;
    Ok(Json(ResponseData::from_result(post.into())))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Json(request): Json<PostIdRequest>,
) -> ApiResult<PostDto> {
    let post = state.service.delete(parse_id(&request.community_id)?).await?;
    Ok(Json(ResponseData::from_result(post.into())))
}

pub async fn list_posts(
    State(state): State<AppState>,
    Json(request): Json<ListPostsRequest>,
) -> ApiResult<ListPostsResponse> {
    let posts = state
        .service
        .list(&SearchFilter::new(request.search), Page(request.page))
        .await?;
    Ok(Json(ResponseData::from_result(ListPostsResponse {
        communities: posts.into_iter().map(PostDto::from).collect(),
    })))
}
