//! # HTTP surface
//!
//! Axum routes for the `/community` API. Every endpoint is a `PUT`, as in the
//! clients already deployed against it. Attachment files are served read-only
//! under `/{prefix}`, so a persisted reference is also its own URL path.

pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::put;
use axum::Router;
use services::PostService;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PostService>,
}

/// Builds the application router.
pub fn router(state: AppState, body_limit_bytes: usize) -> Router {
    let layout = state.service.layout();
    let files = ServeDir::new(layout.root());
    let files_path = format!("/{}", layout.prefix());

    Router::new()
        .route("/community/create", put(handlers::create_post))
        .route("/community/update", put(handlers::update_post))
        .route("/community/read", put(handlers::read_post))
        .route("/community/delete", put(handlers::delete_post))
        .route("/community/read/list", put(handlers::list_posts))
        .nest_service(&files_path, files)
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::set_request_id())
                .layer(TraceLayer::new_for_http())
                .layer(middleware::propagate_request_id())
                .layer(middleware::cors_policy()),
        )
        .with_state(state)
}
