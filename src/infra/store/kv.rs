//! Structured-record post store over a key-value capability.
//!
//! Records live under `post:<id>`; the index of summaries lives under the
//! fixed `posts:list` key and is rewritten on every mutation.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::posts::{NewPost, Post, PostSummary};
use crate::infra::kv::KeyValueStore;

use super::{PostStore, StoreError};

const INDEX_KEY: &str = "posts:list";

pub struct KvPostStore {
    kv: Arc<dyn KeyValueStore>,
}

impl KvPostStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    fn record_key(id: &str) -> String {
        format!("post:{id}")
    }

    async fn read_index(&self) -> Result<Vec<PostSummary>, StoreError> {
        match self.kv.get(INDEX_KEY).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|err| StoreError::corrupt(INDEX_KEY, err.to_string())),
            None => Ok(Vec::new()),
        }
    }

    async fn write_index(&self, index: &[PostSummary]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(index)
            .map_err(|err| StoreError::corrupt(INDEX_KEY, err.to_string()))?;
        self.kv.put(INDEX_KEY, &raw).await?;
        Ok(())
    }
}

#[async_trait]
impl PostStore for KvPostStore {
    async fn list(&self) -> Result<Vec<PostSummary>, StoreError> {
        self.read_index().await
    }

    async fn get(&self, id: &str) -> Result<Post, StoreError> {
        let key = Self::record_key(id);
        let raw = self.kv.get(&key).await?.ok_or(StoreError::NotFound)?;
        serde_json::from_str(&raw).map_err(|err| StoreError::corrupt(key, err.to_string()))
    }

    async fn create(&self, fields: NewPost) -> Result<Post, StoreError> {
        let post = Post {
            id: Uuid::new_v4().to_string(),
            title: fields.title,
            content: fields.content,
            category: fields.category,
            tags: fields.tags,
            cover: fields.cover,
            status: fields.status,
            created_at: fields.created_at,
            updated_at: fields.updated_at,
        };

        let key = Self::record_key(&post.id);
        let raw = serde_json::to_string(&post)
            .map_err(|err| StoreError::corrupt(&key, err.to_string()))?;

        // Record first so no index entry ever points at a missing record.
        self.kv.put(&key, &raw).await?;

        let mut index = self.read_index().await?;
        index.push(post.summary());
        self.write_index(&index).await?;

        Ok(post)
    }

    async fn update(&self, post: &Post) -> Result<(), StoreError> {
        let key = Self::record_key(&post.id);
        if self.kv.get(&key).await?.is_none() {
            return Err(StoreError::NotFound);
        }

        let raw = serde_json::to_string(post)
            .map_err(|err| StoreError::corrupt(&key, err.to_string()))?;
        self.kv.put(&key, &raw).await?;

        let mut index = self.read_index().await?;
        match index.iter_mut().find(|entry| entry.id == post.id) {
            Some(entry) => *entry = post.summary(),
            None => index.push(post.summary()),
        }
        self.write_index(&index).await?;

        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let key = Self::record_key(id);
        if self.kv.get(&key).await?.is_none() {
            return Err(StoreError::NotFound);
        }

        // Index first so no reader resolves an entry to a deleted record.
        let mut index = self.read_index().await?;
        index.retain(|entry| entry.id != id);
        self.write_index(&index).await?;

        self.kv.delete(&key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::domain::posts::DEFAULT_CATEGORY;
    use crate::domain::types::PostStatus;
    use crate::infra::kv::MemoryKeyValueStore;

    use super::*;

    fn store() -> KvPostStore {
        KvPostStore::new(Arc::new(MemoryKeyValueStore::new()))
    }

    fn fields(title: &str) -> NewPost {
        let now = datetime!(2024-04-01 12:00:00 UTC);
        NewPost {
            title: title.to_string(),
            content: "# Hi".to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            tags: vec!["rust".to_string()],
            cover: None,
            status: PostStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn create_appends_one_index_entry() {
        let store = store();
        let post = store.create(fields("A")).await.expect("create");

        let index = store.list().await.expect("list");
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].id, post.id);
        assert_eq!(index[0].title, "A");
    }

    #[tokio::test]
    async fn update_rewrites_matching_index_entry() {
        let store = store();
        let mut post = store.create(fields("A")).await.expect("create");

        post.title = "B".to_string();
        store.update(&post).await.expect("update");

        let index = store.list().await.expect("list");
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].title, "B");
        assert_eq!(store.get(&post.id).await.expect("get").title, "B");
    }

    #[tokio::test]
    async fn delete_removes_record_and_index_entry() {
        let store = store();
        let post = store.create(fields("A")).await.expect("create");

        store.delete(&post.id).await.expect("delete");

        assert!(matches!(
            store.get(&post.id).await,
            Err(StoreError::NotFound)
        ));
        assert!(store.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn missing_ids_surface_not_found() {
        let store = store();
        assert!(matches!(store.get("nope").await, Err(StoreError::NotFound)));
        assert!(matches!(
            store.delete("nope").await,
            Err(StoreError::NotFound)
        ));
    }
}
