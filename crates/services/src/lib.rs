//! # services
//!
//! Application logic of the community board: attachment reconciliation and
//! the post lifecycle built on top of the `domains` ports.

pub mod layout;
pub mod locks;
pub mod post_service;
pub mod reconciler;

pub use layout::AttachmentLayout;
pub use locks::{KeyGuard, KeyedLocks};
pub use post_service::PostService;
pub use reconciler::{pass_timestamp, AttachmentReconciler, ReconcileLimits};
