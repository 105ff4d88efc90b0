//! Flat-document post store over an object-storage capability.
//!
//! Each post is a front-matter Markdown document at `posts/<slug>.md`; the
//! slug doubles as the post id. Listing fields come from the attached object
//! metadata when present and are otherwise recovered by re-parsing the
//! document's front matter, so documents written by hand or synced from a
//! generator source tree remain listable.
//!
//! The sidecar metadata is authoritative for timestamps: the document `date`
//! field has whole-second resolution, so posts written through this store
//! round-trip `createdAt`/`updatedAt` via RFC 3339 metadata instead and the
//! `date` field is consulted only for foreign documents.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::format_description::{BorrowedFormatItem, well_known::Rfc3339};
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::content::front_matter;
use crate::domain::posts::{DEFAULT_CATEGORY, NewPost, Post, PostSummary};
use crate::domain::slug::{SlugAsyncError, generate_unique_slug_async};
use crate::domain::types::PostStatus;
use crate::infra::blob::{ObjectStore, StoredObject};
use crate::infra::error::InfraError;

use super::{PostStore, StoreError};

const KEY_PREFIX: &str = "posts/";
const KEY_EXTENSION: &str = ".md";

const DOC_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

pub struct BlobPostStore {
    blob: Arc<dyn ObjectStore>,
}

impl BlobPostStore {
    pub fn new(blob: Arc<dyn ObjectStore>) -> Self {
        Self { blob }
    }

    fn key_for(id: &str) -> String {
        format!("{KEY_PREFIX}{id}{KEY_EXTENSION}")
    }

    fn id_from_key(key: &str) -> Option<&str> {
        key.strip_prefix(KEY_PREFIX)?.strip_suffix(KEY_EXTENSION)
    }

    fn summary_from(id: &str, object: &StoredObject) -> PostSummary {
        let probed = front_matter::probe(&object.body);

        let title = object
            .metadata
            .get("title")
            .cloned()
            .or(probed.title)
            .unwrap_or_else(|| id.to_string());

        let category = probed
            .categories
            .into_iter()
            .next()
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        PostSummary {
            id: id.to_string(),
            title,
            category,
            tags: probed.tags,
            status: stored_status(&object.metadata),
            created_at: created_at_of(probed.date.as_deref(), &object.metadata, object.uploaded_at),
        }
    }

    fn post_from(id: &str, object: StoredObject) -> Post {
        let (metadata, body) = front_matter::parse(&object.body);
        // The composed format leaves one blank line between block and body.
        let content = body.strip_prefix('\n').unwrap_or(&body).to_string();

        let title = metadata
            .scalar("title")
            .map(str::to_string)
            .or_else(|| object.metadata.get("title").cloned())
            .unwrap_or_else(|| id.to_string());

        let category = metadata
            .list("categories")
            .into_iter()
            .chain(metadata.list("category"))
            .find(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        let date = metadata.scalar("date").map(str::to_string);

        Post {
            id: id.to_string(),
            title,
            content,
            category,
            tags: metadata.list("tags"),
            cover: metadata.scalar("cover").map(str::to_string),
            status: stored_status(&object.metadata),
            created_at: created_at_of(date.as_deref(), &object.metadata, object.uploaded_at),
            updated_at: updated_at_of(&object.metadata, object.uploaded_at),
        }
    }

    fn side_metadata(post: &Post) -> Result<HashMap<String, String>, StoreError> {
        let created_at = post
            .created_at
            .format(&Rfc3339)
            .map_err(|err| StoreError::invalid(format!("date formatting failed: {err}")))?;
        let updated_at = post
            .updated_at
            .format(&Rfc3339)
            .map_err(|err| StoreError::invalid(format!("date formatting failed: {err}")))?;

        let mut metadata = HashMap::new();
        metadata.insert("title".to_string(), post.title.clone());
        metadata.insert("status".to_string(), post.status.as_str().to_string());
        metadata.insert("createdAt".to_string(), created_at);
        metadata.insert("updatedAt".to_string(), updated_at);
        Ok(metadata)
    }

    async fn write(&self, post: &Post) -> Result<(), StoreError> {
        let document = compose_document(post)?;
        let metadata = Self::side_metadata(post)?;
        self.blob
            .put(&Self::key_for(&post.id), &document, metadata)
            .await?;
        Ok(())
    }
}

/// Serialize a post into the generator's front-matter document format.
/// Shared with the sync path that exports posts into the source tree.
pub fn compose_document(post: &Post) -> Result<String, StoreError> {
    let date = post
        .created_at
        .format(DOC_DATE_FORMAT)
        .map_err(|err| StoreError::invalid(format!("date formatting failed: {err}")))?;

    let mut document = String::new();
    document.push_str("---\n");
    document.push_str(&format!("title: {}\n", post.title));
    document.push_str(&format!("date: {date}\n"));
    document.push_str(&format!("categories: [{}]\n", post.category));
    document.push_str(&format!("tags: [{}]\n", post.tags.join(", ")));
    if let Some(cover) = &post.cover {
        document.push_str(&format!("cover: {cover}\n"));
    }
    document.push_str("---\n\n");
    document.push_str(&post.content);

    Ok(document)
}

/// Documents without an explicit status marker are treated as published;
/// they predate the admin path or were synced from a generator source tree.
fn stored_status(metadata: &HashMap<String, String>) -> PostStatus {
    metadata
        .get("status")
        .and_then(|value| PostStatus::try_from(value.as_str()).ok())
        .unwrap_or(PostStatus::Published)
}

fn created_at_of(
    date: Option<&str>,
    metadata: &HashMap<String, String>,
    uploaded_at: OffsetDateTime,
) -> OffsetDateTime {
    if let Some(stamp) = metadata_timestamp(metadata, "createdAt") {
        return stamp;
    }
    date.and_then(parse_doc_date).unwrap_or(uploaded_at)
}

fn updated_at_of(
    metadata: &HashMap<String, String>,
    uploaded_at: OffsetDateTime,
) -> OffsetDateTime {
    metadata_timestamp(metadata, "updatedAt").unwrap_or(uploaded_at)
}

fn metadata_timestamp(metadata: &HashMap<String, String>, key: &str) -> Option<OffsetDateTime> {
    metadata
        .get(key)
        .and_then(|value| OffsetDateTime::parse(value, &Rfc3339).ok())
}

fn parse_doc_date(value: &str) -> Option<OffsetDateTime> {
    PrimitiveDateTime::parse(value.trim(), DOC_DATE_FORMAT)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

#[async_trait]
impl PostStore for BlobPostStore {
    async fn list(&self) -> Result<Vec<PostSummary>, StoreError> {
        let entries = self.blob.list(KEY_PREFIX).await?;
        let mut summaries = Vec::with_capacity(entries.len());

        for entry in entries {
            let Some(id) = Self::id_from_key(&entry.key) else {
                continue;
            };
            if let Some(object) = self.blob.get(&entry.key).await? {
                summaries.push(Self::summary_from(id, &object));
            }
        }

        Ok(summaries)
    }

    async fn get(&self, id: &str) -> Result<Post, StoreError> {
        let object = self
            .blob
            .get(&Self::key_for(id))
            .await?
            .ok_or(StoreError::NotFound)?;
        Ok(Self::post_from(id, object))
    }

    async fn create(&self, fields: NewPost) -> Result<Post, StoreError> {
        let id = generate_unique_slug_async(&fields.title, |candidate| {
            let key = Self::key_for(candidate);
            async move { Ok::<_, InfraError>(self.blob.get(&key).await?.is_none()) }
        })
        .await
        .map_err(|err| match err {
            SlugAsyncError::Slug(source) => StoreError::invalid(source.to_string()),
            SlugAsyncError::Predicate(source) => StoreError::Backend(source),
        })?;

        let post = Post {
            id,
            title: fields.title,
            content: fields.content,
            category: fields.category,
            tags: fields.tags,
            cover: fields.cover,
            status: fields.status,
            created_at: fields.created_at,
            updated_at: fields.updated_at,
        };

        self.write(&post).await?;
        Ok(post)
    }

    async fn update(&self, post: &Post) -> Result<(), StoreError> {
        if self.blob.get(&Self::key_for(&post.id)).await?.is_none() {
            return Err(StoreError::NotFound);
        }
        self.write(post).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let key = Self::key_for(id);
        if self.blob.get(&key).await?.is_none() {
            return Err(StoreError::NotFound);
        }
        self.blob.delete(&key).await?;
        Ok(())
    }
}
