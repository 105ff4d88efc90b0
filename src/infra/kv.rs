//! Key-value storage capability.
//!
//! Keys are opaque strings such as `post:<id>`, `posts:list`, and
//! `auth:<token>`. The filesystem implementation maps each key to a single
//! file; the in-memory implementation backs tests and ephemeral runs.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;

use super::error::InfraError;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, InfraError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), InfraError>;
    async fn delete(&self, key: &str) -> Result<(), InfraError>;
}

/// One file per key under a flat directory.
#[derive(Debug)]
pub struct FsKeyValueStore {
    root: PathBuf,
}

impl FsKeyValueStore {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, InfraError> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(sanitize_key(key))
    }
}

#[async_trait]
impl KeyValueStore for FsKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(InfraError::Io(err)),
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), InfraError> {
        fs::write(self.path_for(key), value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), InfraError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(InfraError::Io(err)),
        }
    }
}

/// Non-persistent store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), InfraError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), InfraError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Collapse a key into a safe flat filename. Colons and any other unusual
/// characters become hyphens, so `post:abc` lands at `post-abc`.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_key_flattens_separators() {
        assert_eq!(sanitize_key("post:abc-123"), "post-abc-123");
        assert_eq!(sanitize_key("posts:list"), "posts-list");
        assert_eq!(sanitize_key("auth/../x"), "auth-..-x");
    }

    #[tokio::test]
    async fn memory_store_round_trips_and_deletes() {
        let store = MemoryKeyValueStore::new();

        store.put("post:1", "{}").await.expect("put");
        assert_eq!(store.get("post:1").await.expect("get").as_deref(), Some("{}"));

        store.delete("post:1").await.expect("delete");
        assert_eq!(store.get("post:1").await.expect("get"), None);
    }

    #[tokio::test]
    async fn fs_store_round_trips_and_deletes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsKeyValueStore::new(dir.path().to_path_buf()).expect("store");

        store.put("post:1", "value").await.expect("put");
        assert_eq!(
            store.get("post:1").await.expect("get").as_deref(),
            Some("value")
        );

        store.delete("post:1").await.expect("delete");
        assert_eq!(store.get("post:1").await.expect("get"), None);
        // Deleting again is not an error.
        store.delete("post:1").await.expect("delete");
    }
}
