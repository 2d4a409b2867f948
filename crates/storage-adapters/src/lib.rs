//! # storage-adapters
//!
//! Concrete implementations of the `domains` ports: the local filesystem for
//! attachment files and the post repositories (in-memory, PostgreSQL).

pub mod local_files;
pub mod memory_posts;
#[cfg(feature = "db-postgres")]
pub mod pg_posts;

pub use local_files::LocalFileStore;
pub use memory_posts::MemoryPostRepository;
#[cfg(feature = "db-postgres")]
pub use pg_posts::PgPostRepository;
