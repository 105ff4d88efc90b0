//! Post entity, its denormalized summary, and field-merge rules.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::types::PostStatus;

/// Sentinel category applied when a post carries none.
pub const DEFAULT_CATEGORY: &str = "uncategorized";

/// A dynamically-authored post, the authoritative record.
///
/// Field names serialize in camelCase to match the persisted record shape
/// consumed by the admin front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    pub status: PostStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Lightweight entry kept in the post index, one per live post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: String,
    pub title: String,
    pub category: String,
    pub tags: Vec<String>,
    pub status: PostStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Validated field set for a post that does not exist yet. The backend
/// assigns the id; everything else is decided by the caller.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub cover: Option<String>,
    pub status: PostStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Caller-supplied partial update. `id` and `created_at` are absent by
/// construction so they can never be overwritten.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub cover: Option<String>,
    pub status: Option<PostStatus>,
}

impl Post {
    pub fn summary(&self) -> PostSummary {
        PostSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            category: self.category.clone(),
            tags: self.tags.clone(),
            status: self.status,
            created_at: self.created_at,
        }
    }

    /// Merge the provided fields over this record, refreshing `updated_at`.
    pub fn apply(&mut self, patch: PostPatch, now: OffsetDateTime) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(category) = patch.category {
            self.category = primary_category(&category);
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(cover) = patch.cover {
            self.cover = (!cover.trim().is_empty()).then_some(cover);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = now;
    }
}

/// Reduce a category input to its single displayed label.
///
/// Input may arrive as a comma list; only the first element is retained.
/// Empty input falls back to the `uncategorized` sentinel.
pub fn primary_category(input: &str) -> String {
    input
        .split(',')
        .map(str::trim)
        .find(|part| !part.is_empty())
        .unwrap_or(DEFAULT_CATEGORY)
        .to_string()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn sample_post() -> Post {
        Post {
            id: "abc".to_string(),
            title: "First".to_string(),
            content: "# Hi".to_string(),
            category: "notes".to_string(),
            tags: vec!["rust".to_string()],
            cover: None,
            status: PostStatus::Draft,
            created_at: datetime!(2024-03-01 08:00:00 UTC),
            updated_at: datetime!(2024-03-01 08:00:00 UTC),
        }
    }

    #[test]
    fn primary_category_keeps_first_comma_element() {
        assert_eq!(primary_category("tech, life, misc"), "tech");
        assert_eq!(primary_category("  solo  "), "solo");
    }

    #[test]
    fn primary_category_defaults_when_empty() {
        assert_eq!(primary_category(""), DEFAULT_CATEGORY);
        assert_eq!(primary_category(" , ,"), DEFAULT_CATEGORY);
    }

    #[test]
    fn apply_merges_fields_and_refreshes_updated_at() {
        let mut post = sample_post();
        let now = datetime!(2024-03-02 09:30:00 UTC);

        post.apply(
            PostPatch {
                title: Some("Second".to_string()),
                status: Some(PostStatus::Published),
                ..Default::default()
            },
            now,
        );

        assert_eq!(post.title, "Second");
        assert_eq!(post.status, PostStatus::Published);
        assert_eq!(post.content, "# Hi");
        assert_eq!(post.updated_at, now);
        assert_eq!(post.created_at, datetime!(2024-03-01 08:00:00 UTC));
    }

    #[test]
    fn apply_normalizes_category_lists() {
        let mut post = sample_post();
        let now = datetime!(2024-03-02 09:30:00 UTC);

        post.apply(
            PostPatch {
                category: Some("a, b".to_string()),
                ..Default::default()
            },
            now,
        );

        assert_eq!(post.category, "a");
    }

    #[test]
    fn apply_clears_cover_on_blank_input() {
        let mut post = sample_post();
        post.cover = Some("/img/old.png".to_string());

        post.apply(
            PostPatch {
                cover: Some("  ".to_string()),
                ..Default::default()
            },
            datetime!(2024-03-02 09:30:00 UTC),
        );

        assert_eq!(post.cover, None);
    }
}
