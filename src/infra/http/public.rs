//! Dynamic post pages plus static-site fallback serving.

use std::path::{Component, Path as FsPath, PathBuf};

use axum::{
    Router,
    body::Body,
    extract::{Path, Request, State},
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::Response,
    routing::get,
};
use percent_encoding::percent_decode_str;
use tokio::fs;

use crate::application::error::ErrorReport;
use crate::content::markdown;
use crate::domain::types::PostStatus;
use crate::presentation::views::{
    PostCardView, PostListTemplate, PostPageView, PostTemplate, render_not_found_response,
    render_template_response,
};

use super::AppState;

pub fn build_public_router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(posts_index))
        .route("/posts/{id}", get(post_page))
        .fallback(get(serve_static))
}

/// List every published post, newest first.
async fn posts_index(State(state): State<AppState>) -> Response {
    match state.posts.published().await {
        Ok(summaries) => {
            let posts = summaries.iter().map(PostCardView::new).collect();
            render_template_response(PostListTemplate { posts }, StatusCode::OK)
        }
        Err(err) => {
            let mut response = render_not_found_response();
            *response.status_mut() = err.status_code();
            ErrorReport::from_error("infra::http::public::posts_index", err.status_code(), &err)
                .attach(&mut response);
            response
        }
    }
}

/// Render a dynamically stored post. Drafts and unknown ids both answer
/// with the 404 page so draft existence is not observable.
async fn post_page(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.posts.get(&id).await {
        Ok(post) if post.status == PostStatus::Published => {
            let content_html = markdown::render(&post.content);
            let view = PostPageView::new(&post, content_html);
            render_template_response(PostTemplate { view }, StatusCode::OK)
        }
        Ok(_) => render_not_found_response(),
        Err(err) if err.is_not_found() => render_not_found_response(),
        Err(err) => {
            let mut response = render_not_found_response();
            *response.status_mut() = err.status_code();
            ErrorReport::from_error("infra::http::public::post_page", err.status_code(), &err)
                .attach(&mut response);
            response
        }
    }
}

/// Serve the static generator's output tree. Directory paths resolve to
/// their `index.html`, which is what the injection middleware rewrites.
async fn serve_static(State(state): State<AppState>, request: Request) -> Response {
    let Some(relative) = decode_static_path(request.uri().path()) else {
        return render_not_found_response();
    };

    let candidate = if relative.as_os_str().is_empty() {
        state.site_root.join("index.html")
    } else {
        state.site_root.join(&relative)
    };

    match fs::read(&candidate).await {
        Ok(bytes) => file_response(&candidate, bytes),
        Err(_) => {
            // Pretty URLs: `/tags/rust/` and `/archives` both resolve to a
            // directory's index.html.
            let fallback = candidate.join("index.html");
            match fs::read(&fallback).await {
                Ok(bytes) => file_response(&fallback, bytes),
                Err(_) => render_not_found_response(),
            }
        }
    }
}

fn decode_static_path(path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(path.trim_start_matches('/'))
        .decode_utf8()
        .ok()?;

    let relative = FsPath::new(decoded.as_ref());
    if relative
        .components()
        .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }

    Some(relative.to_path_buf())
}

fn file_response(path: &FsPath, bytes: Vec<u8>) -> Response {
    let length = bytes.len();
    let mime = mime_guess::from_path(path).first_or_octet_stream();

    let mut response = Response::new(Body::from(bytes));
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_static_path_rejects_traversal() {
        assert!(decode_static_path("/../etc/passwd").is_none());
        assert!(decode_static_path("/%2e%2e/secret").is_none());
        assert_eq!(
            decode_static_path("/tags/rust/index.html"),
            Some(PathBuf::from("tags/rust/index.html"))
        );
    }
}
