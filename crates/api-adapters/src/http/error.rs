//! Maps service failures onto HTTP statuses and the response envelope.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::AppError;
use tracing::{debug, error};

use crate::dto::ResponseData;

#[derive(Debug)]
pub enum ApiError {
    App(AppError),
    Multipart(MultipartError),
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        ApiError::App(e)
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::Multipart(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::App(AppError::ValidationError(_)) => StatusCode::BAD_REQUEST,
            ApiError::App(AppError::NotFound(..)) => StatusCode::NOT_FOUND,
            ApiError::App(AppError::Io { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Multipart(e) => e.status(),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::App(e) => e.to_string(),
            ApiError::Multipart(e) => e.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %message, "request failed");
        } else {
            debug!(status = status.as_u16(), error = %message, "request rejected");
        }
        let body = ResponseData::<serde_json::Value>::from_error(status.as_u16(), message);
        (status, Json(body)).into_response()
    }
}
