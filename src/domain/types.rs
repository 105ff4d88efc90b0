//! Shared domain enumerations aligned with persisted records.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

impl TryFrom<&str> for PostStatus {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            _ => Err(()),
        }
    }
}

/// Persistence strategy for the post store, chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Serialized records under `post:<id>` plus a `posts:list` index key.
    Kv,
    /// Front-matter documents under `posts/<slug>.md` in an object store.
    Blob,
}

impl TryFrom<&str> for StorageBackend {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "kv" => Ok(StorageBackend::Kv),
            "blob" => Ok(StorageBackend::Blob),
            _ => Err(()),
        }
    }
}
