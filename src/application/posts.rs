//! Post authoring and listing workflows over the configured store backend.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::application::error::AppError;
use crate::domain::posts::{NewPost, Post, PostPatch, PostSummary, primary_category};
use crate::domain::types::PostStatus;
use crate::infra::store::PostStore;

/// Listing filter requested by the caller. Unauthorized callers are always
/// narrowed to published regardless of what they ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Draft,
    Published,
}

impl StatusFilter {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("draft") => StatusFilter::Draft,
            Some("published") => StatusFilter::Published,
            _ => StatusFilter::All,
        }
    }

    fn matches(self, status: PostStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Draft => status == PostStatus::Draft,
            StatusFilter::Published => status == PostStatus::Published,
        }
    }
}

/// Fields accepted when creating a post through the admin path.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePost {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub status: Option<PostStatus>,
}

/// Distinct labels across all indexed posts, for the admin editor's pickers.
#[derive(Debug, Clone, Serialize)]
pub struct MetaSummary {
    pub categories: Vec<String>,
    pub tags: Vec<String>,
}

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn PostStore>,
}

impl PostService {
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self { store }
    }

    /// List summaries newest first. The filter only applies to authorized
    /// callers; everyone else sees published posts only.
    pub async fn list(
        &self,
        filter: StatusFilter,
        authorized: bool,
    ) -> Result<Vec<PostSummary>, AppError> {
        let effective = if authorized {
            filter
        } else {
            StatusFilter::Published
        };

        let mut summaries = self.store.list().await?;
        summaries.retain(|summary| effective.matches(summary.status));
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    /// Published posts, newest first. The injection path reads this.
    pub async fn published(&self) -> Result<Vec<PostSummary>, AppError> {
        self.list(StatusFilter::Published, false).await
    }

    pub async fn get(&self, id: &str) -> Result<Post, AppError> {
        Ok(self.store.get(id).await?)
    }

    pub async fn create(&self, fields: CreatePost) -> Result<Post, AppError> {
        if fields.title.trim().is_empty() {
            return Err(AppError::validation("title is required"));
        }
        if fields.content.trim().is_empty() {
            return Err(AppError::validation("content is required"));
        }

        let now = OffsetDateTime::now_utc();
        let new_post = NewPost {
            title: fields.title,
            content: fields.content,
            category: primary_category(fields.category.as_deref().unwrap_or("")),
            tags: fields.tags.unwrap_or_default(),
            cover: fields.cover.filter(|cover| !cover.trim().is_empty()),
            status: fields.status.unwrap_or(PostStatus::Draft),
            created_at: now,
            updated_at: now,
        };

        Ok(self.store.create(new_post).await?)
    }

    pub async fn update(&self, id: &str, patch: PostPatch) -> Result<Post, AppError> {
        let mut post = self.store.get(id).await?;
        post.apply(patch, OffsetDateTime::now_utc());
        self.store.update(&post).await?;
        Ok(post)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        Ok(self.store.delete(id).await?)
    }

    /// Distinct, sorted categories and tags across every indexed post,
    /// drafts included.
    pub async fn meta(&self) -> Result<MetaSummary, AppError> {
        let summaries = self.store.list().await?;

        let mut categories: Vec<String> = summaries
            .iter()
            .map(|summary| summary.category.clone())
            .filter(|category| !category.is_empty())
            .collect();
        categories.sort();
        categories.dedup();

        let mut tags: Vec<String> = summaries
            .iter()
            .flat_map(|summary| summary.tags.iter().cloned())
            .collect();
        tags.sort();
        tags.dedup();

        Ok(MetaSummary { categories, tags })
    }
}

#[cfg(test)]
mod tests {
    use crate::infra::kv::MemoryKeyValueStore;
    use crate::infra::store::KvPostStore;

    use super::*;

    fn service() -> PostService {
        PostService::new(Arc::new(KvPostStore::new(Arc::new(
            MemoryKeyValueStore::new(),
        ))))
    }

    fn fields(title: &str, status: PostStatus) -> CreatePost {
        CreatePost {
            title: title.to_string(),
            content: "body".to_string(),
            status: Some(status),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_defaults_to_draft_with_equal_timestamps() {
        let service = service();
        let post = service
            .create(CreatePost {
                title: "A".to_string(),
                content: "body".to_string(),
                ..Default::default()
            })
            .await
            .expect("create");

        assert_eq!(post.status, PostStatus::Draft);
        assert_eq!(post.created_at, post.updated_at);
        assert_eq!(post.category, crate::domain::posts::DEFAULT_CATEGORY);
    }

    #[tokio::test]
    async fn create_rejects_missing_title_or_content() {
        let service = service();

        let err = service
            .create(CreatePost {
                content: "body".to_string(),
                ..Default::default()
            })
            .await
            .expect_err("missing title");
        assert!(matches!(err, AppError::Validation(_)));

        let err = service
            .create(CreatePost {
                title: "A".to_string(),
                ..Default::default()
            })
            .await
            .expect_err("missing content");
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn unauthorized_listing_never_contains_drafts() {
        let service = service();
        service
            .create(fields("Draft", PostStatus::Draft))
            .await
            .expect("create");
        service
            .create(fields("Live", PostStatus::Published))
            .await
            .expect("create");

        let visible = service
            .list(StatusFilter::All, false)
            .await
            .expect("list");
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].title, "Live");

        let all = service.list(StatusFilter::All, true).await.expect("list");
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn update_preserves_id_and_created_at() {
        let service = service();
        let post = service
            .create(fields("Original", PostStatus::Draft))
            .await
            .expect("create");

        let updated = service
            .update(
                &post.id,
                PostPatch {
                    title: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("update");

        assert_eq!(updated.id, post.id);
        assert_eq!(updated.created_at, post.created_at);
        assert_eq!(updated.title, "Renamed");
        assert!(updated.updated_at >= post.updated_at);
    }

    #[tokio::test]
    async fn meta_lists_distinct_sorted_labels() {
        let service = service();
        service
            .create(CreatePost {
                title: "A".to_string(),
                content: "x".to_string(),
                category: Some("tech".to_string()),
                tags: Some(vec!["rust".to_string(), "web".to_string()]),
                ..Default::default()
            })
            .await
            .expect("create");
        service
            .create(CreatePost {
                title: "B".to_string(),
                content: "y".to_string(),
                category: Some("life".to_string()),
                tags: Some(vec!["rust".to_string()]),
                ..Default::default()
            })
            .await
            .expect("create");

        let meta = service.meta().await.expect("meta");
        assert_eq!(meta.categories, vec!["life", "tech"]);
        assert_eq!(meta.tags, vec!["rust", "web"]);
    }
}
