//! Post store adapter: one contract, two storage shapes.
//!
//! [`KvPostStore`] keeps serialized records plus a denormalized index in a
//! key-value capability; [`BlobPostStore`] keeps each post as a front-matter
//! document in an object store. The strategy is selected once at startup
//! from configuration.

pub mod blob;
pub mod kv;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::posts::{NewPost, Post, PostSummary};
use crate::infra::error::InfraError;

pub use blob::BlobPostStore;
pub use kv::KvPostStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("post not found")]
    NotFound,
    #[error("invalid post fields: {message}")]
    Invalid { message: String },
    #[error("stored record `{key}` is corrupt: {message}")]
    Corrupt { key: String, message: String },
    #[error("storage backend failure: {0}")]
    Backend(#[from] InfraError),
}

impl StoreError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn corrupt(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Corrupt {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Backend-independent persistence contract for posts.
///
/// Listing returns summaries in backend order; sorting and status filtering
/// are the caller's concern. Mutations keep the record and the index in step
/// as a single logical unit (record before index on create and update, index
/// before record on delete), accepting the brief window a crash could leave
/// between the two writes.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn list(&self) -> Result<Vec<PostSummary>, StoreError>;
    async fn get(&self, id: &str) -> Result<Post, StoreError>;
    async fn create(&self, fields: NewPost) -> Result<Post, StoreError>;
    async fn update(&self, post: &Post) -> Result<(), StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}
