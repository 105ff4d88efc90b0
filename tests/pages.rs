//! End-to-end tests for the public surface: static files, post pages, and
//! serve-time splicing of published posts into generator output.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{
        Request, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use innesto::application::{auth::AuthService, posts::PostService};
use innesto::infra::http::{AppState, build_router};
use innesto::infra::kv::{KeyValueStore, MemoryKeyValueStore};
use innesto::infra::store::KvPostStore;

const ADMIN_TOKEN: &str = "integration-admin";

const HOME_PAGE: &str =
    r#"<html><body><div class="recent-posts"><div>static card</div></div></body></html>"#;
const ARCHIVE_PAGE: &str =
    r#"<html><body><div class="article-sort"><div>static row</div></div></body></html>"#;

struct TestApp {
    router: Router,
    _site: TempDir,
}

/// Build the app over a generator-style site tree: a home page plus one
/// tag page and one archive page, each carrying its static marker.
async fn build_app() -> TestApp {
    let site = tempfile::tempdir().expect("tempdir");
    std::fs::write(site.path().join("index.html"), HOME_PAGE).expect("write home");
    for dir in ["tags/rust", "tags/web", "archives"] {
        let path = site.path().join(dir);
        std::fs::create_dir_all(&path).expect("mkdir");
        std::fs::write(path.join("index.html"), ARCHIVE_PAGE).expect("write page");
    }

    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
    kv.put(&format!("auth:{ADMIN_TOKEN}"), "admin")
        .await
        .expect("seed admin token");

    let state = AppState {
        posts: Arc::new(PostService::new(Arc::new(KvPostStore::new(kv.clone())))),
        auth: Arc::new(AuthService::new(kv)),
        site_root: site.path().to_path_buf(),
    };

    TestApp {
        router: build_router(state),
        _site: site,
    }
}

async fn create_post(app: &TestApp, payload: Value) -> Value {
    let request = Request::builder()
        .method("POST")
        .uri("/api/posts")
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
        .body(Body::from(payload.to_string()))
        .expect("request");

    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .expect("infallible");
    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

async fn fetch(app: &TestApp, path: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .uri(path)
        .body(Body::empty())
        .expect("request");
    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .expect("infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    (status, String::from_utf8(bytes.to_vec()).expect("utf8 body"))
}

// ============ Injection ============

#[tokio::test]
async fn home_page_gains_recent_post_cards() {
    let app = build_app().await;
    let created = create_post(
        &app,
        json!({"title": "Fresh Post", "content": "x", "status": "published"}),
    )
    .await;
    let id = created["id"].as_str().expect("id");

    let (status, body) = fetch(&app, "/").await;
    assert_eq!(status, StatusCode::OK);

    // Cards land right after the marker; the static card survives.
    let marker = r#"<div class="recent-posts">"#;
    let marker_end = body.find(marker).expect("marker") + marker.len();
    assert!(body[marker_end..].starts_with(r#"<div class="recent-post-item">"#));
    assert!(body.contains(&format!(r#"href="/posts/{id}""#)));
    assert!(body.contains("<div>static card</div>"));
}

#[tokio::test]
async fn tag_page_lists_only_matching_posts() {
    let app = build_app().await;
    let created = create_post(
        &app,
        json!({
            "title": "Tagged",
            "content": "x",
            "tags": ["web"],
            "status": "published",
        }),
    )
    .await;
    let id = created["id"].as_str().expect("id");

    let (status, body) = fetch(&app, "/tags/web/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("dynamic-posts-section"));
    assert!(body.contains(&format!(r#"href="/posts/{id}""#)));

    // The dynamic section sits above the static list.
    let fragment_at = body.find("dynamic-posts-section").expect("fragment");
    let static_at = body.find("<div>static row</div>").expect("static row");
    assert!(fragment_at < static_at);
}

#[tokio::test]
async fn tag_page_without_matches_is_served_byte_for_byte() {
    let app = build_app().await;
    create_post(
        &app,
        json!({
            "title": "Elsewhere",
            "content": "x",
            "tags": ["web"],
            "status": "published",
        }),
    )
    .await;

    let (status, body) = fetch(&app, "/tags/rust/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ARCHIVE_PAGE);
}

#[tokio::test]
async fn drafts_never_reach_injected_pages() {
    let app = build_app().await;
    create_post(
        &app,
        json!({"title": "Hidden", "content": "x", "status": "draft"}),
    )
    .await;

    let (status, body) = fetch(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, HOME_PAGE);

    let (status, body) = fetch(&app, "/archives/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ARCHIVE_PAGE);
}

#[tokio::test]
async fn archive_page_lists_published_posts() {
    let app = build_app().await;
    let created = create_post(
        &app,
        json!({"title": "Archived", "content": "x", "status": "published"}),
    )
    .await;
    let id = created["id"].as_str().expect("id");

    let (status, body) = fetch(&app, "/archives/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("dynamic-posts-section"));
    assert!(body.contains(&format!(r#"href="/posts/{id}""#)));
}

// ============ Post pages ============

#[tokio::test]
async fn published_post_pages_render_markdown() {
    let app = build_app().await;
    let created = create_post(
        &app,
        json!({
            "title": "Reading Notes",
            "content": "# Hello\n\nFirst paragraph.",
            "status": "published",
        }),
    )
    .await;
    let id = created["id"].as_str().expect("id");

    let (status, body) = fetch(&app, &format!("/posts/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Reading Notes"));
    assert!(body.contains("<h1>Hello</h1>"));
    assert!(body.contains("First paragraph."));
}

#[tokio::test]
async fn posts_listing_page_shows_published_posts_only() {
    let app = build_app().await;
    let published = create_post(
        &app,
        json!({
            "title": "Visible Entry",
            "content": "x",
            "tags": ["rust"],
            "status": "published",
        }),
    )
    .await;
    create_post(
        &app,
        json!({"title": "Unfinished Entry", "content": "x", "status": "draft"}),
    )
    .await;
    let id = published["id"].as_str().expect("id");

    let (status, body) = fetch(&app, "/posts").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Visible Entry"));
    assert!(body.contains(&format!(r#"href="/posts/{id}""#)));
    assert!(body.contains("#rust"));
    assert!(!body.contains("Unfinished Entry"));
}

#[tokio::test]
async fn draft_post_pages_are_not_found() {
    let app = build_app().await;
    let created = create_post(
        &app,
        json!({"title": "Secret", "content": "x", "status": "draft"}),
    )
    .await;
    let id = created["id"].as_str().expect("id");

    let (status, body) = fetch(&app, &format!("/posts/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!body.contains("Secret"));
}

#[tokio::test]
async fn unknown_post_pages_are_not_found() {
    let app = build_app().await;
    let (status, _) = fetch(&app, "/posts/no-such-post").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============ Static serving ============

#[tokio::test]
async fn missing_static_paths_are_not_found() {
    let app = build_app().await;
    let (status, _) = fetch(&app, "/assets/missing.css").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn directory_paths_fall_back_to_their_index() {
    let app = build_app().await;
    let (status, body) = fetch(&app, "/tags/rust").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ARCHIVE_PAGE);
}
