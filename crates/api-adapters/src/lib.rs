//! # api-adapters
//!
//! The web routing layer of the community board. Wire types are always
//! compiled; the axum router sits behind the `web-axum` feature.

pub mod dto;
#[cfg(feature = "web-axum")]
pub mod http;

#[cfg(feature = "web-axum")]
pub use http::{router, AppState};
