//! Core data models for the file-management service.
//!
//! These entities represent users, their files, publications built from
//! those files, and the tombstones left behind by deletions. They map
//! cleanly to database tables via `sqlx::FromRow` and serialize
//! naturally as JSON via `serde`.

pub mod blob;
pub mod file;
pub mod publication;
pub mod upload;
pub mod user;
