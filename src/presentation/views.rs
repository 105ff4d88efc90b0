//! Askama templates and view models for the dynamically rendered pages.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::application::error::{AppError, ErrorReport};
use crate::domain::posts::{Post, PostSummary};

const DISPLAY_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, AppError> {
    template
        .render()
        .map(Html)
        .map_err(|err| AppError::unexpected(format!("template rendering failed: {err}")))
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response() -> Response {
    let mut response = render_template_response(NotFoundTemplate, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

pub struct PostPageView {
    pub title: String,
    pub date: String,
    pub category: String,
    pub tags: Vec<String>,
    pub cover: Option<String>,
    pub content_html: String,
}

impl PostPageView {
    pub fn new(post: &Post, content_html: String) -> Self {
        Self {
            title: post.title.clone(),
            date: display_date(post.created_at),
            category: post.category.clone(),
            tags: post.tags.clone(),
            cover: post.cover.clone(),
            content_html,
        }
    }
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: PostPageView,
}

/// One card on the `/posts` listing page.
pub struct PostCardView {
    pub id: String,
    pub title: String,
    pub date: String,
    pub category: String,
    pub tags: Vec<String>,
}

impl PostCardView {
    pub fn new(summary: &PostSummary) -> Self {
        Self {
            id: summary.id.clone(),
            title: summary.title.clone(),
            date: display_date(summary.created_at),
            category: summary.category.clone(),
            tags: summary.tags.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "post_list.html")]
pub struct PostListTemplate {
    pub posts: Vec<PostCardView>,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate;

fn display_date(value: OffsetDateTime) -> String {
    value
        .format(DISPLAY_DATE_FORMAT)
        .unwrap_or_else(|_| value.to_string())
}
