//! Splicing dynamic post fragments into statically rendered pages.
//!
//! The engine never fails: an unknown page kind, a missing marker, or an
//! empty filtered set all leave the document untouched. It must run exactly
//! once per response; a second pass over the same buffer would duplicate
//! the injected fragments.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::domain::posts::PostSummary;

/// Marker opening the recent-posts container on the home page. Fragments go
/// immediately after it.
pub const HOME_MARKER: &str = r#"<div class="recent-posts">"#;

/// Marker opening the static archive list. Fragments go immediately before
/// it, in their own container, so the static list stays intact.
pub const ARCHIVE_MARKER: &str = r#"<div class="article-sort">"#;

const CARD_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

// Mirrors what a browser-side encodeURIComponent leaves alone, minus the
// characters that are unambiguous inside a path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%');

/// Static page kinds the engine knows how to rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageKind {
    Home,
    Tag(String),
    Category(String),
    Archive,
    Passthrough,
}

/// Derive the page kind from a request path. Paths that do not match a
/// known template, or whose filter segment cannot be decoded, pass through.
pub fn classify(path: &str) -> PageKind {
    if path == "/" || path == "/index.html" {
        return PageKind::Home;
    }
    if let Some(rest) = path.strip_prefix("/tags/") {
        return match decode_segment(rest) {
            Some(tag) => PageKind::Tag(tag),
            None => PageKind::Passthrough,
        };
    }
    if let Some(rest) = path.strip_prefix("/categories/") {
        return match decode_segment(rest) {
            Some(category) => PageKind::Category(category),
            None => PageKind::Passthrough,
        };
    }
    if path.starts_with("/archives") {
        return PageKind::Archive;
    }
    PageKind::Passthrough
}

fn decode_segment(rest: &str) -> Option<String> {
    let segment = rest.split('/').next().filter(|part| !part.is_empty())?;
    percent_decode_str(segment)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Splice fragments for the given page kind into the document.
///
/// `posts` must already be narrowed to published entries, newest first.
pub fn inject(kind: &PageKind, html: &str, posts: &[PostSummary]) -> String {
    if posts.is_empty() {
        return html.to_string();
    }

    match kind {
        PageKind::Home => insert_after(html, HOME_MARKER, &home_cards(posts)),
        PageKind::Tag(tag) => {
            let matched: Vec<&PostSummary> = posts
                .iter()
                .filter(|post| post.tags.iter().any(|candidate| candidate == tag))
                .collect();
            inject_archive_style(html, &matched)
        }
        PageKind::Category(category) => {
            let matched: Vec<&PostSummary> = posts
                .iter()
                .filter(|post| &post.category == category)
                .collect();
            inject_archive_style(html, &matched)
        }
        PageKind::Archive => {
            let all: Vec<&PostSummary> = posts.iter().collect();
            inject_archive_style(html, &all)
        }
        PageKind::Passthrough => html.to_string(),
    }
}

fn inject_archive_style(html: &str, posts: &[&PostSummary]) -> String {
    if posts.is_empty() {
        return html.to_string();
    }
    insert_before(html, ARCHIVE_MARKER, &archive_fragment(posts))
}

fn insert_after(html: &str, marker: &str, fragment: &str) -> String {
    match html.find(marker) {
        Some(index) => {
            let split = index + marker.len();
            format!("{}{}{}", &html[..split], fragment, &html[split..])
        }
        None => html.to_string(),
    }
}

fn insert_before(html: &str, marker: &str, fragment: &str) -> String {
    match html.find(marker) {
        Some(index) => format!("{}{}{}", &html[..index], fragment, &html[index..]),
        None => html.to_string(),
    }
}

fn home_cards(posts: &[PostSummary]) -> String {
    let mut html = String::new();

    for post in posts {
        let date = display_date(post);
        let tag_links: String = post
            .tags
            .iter()
            .take(3)
            .map(|tag| tag_link(tag))
            .collect();

        html.push_str(&format!(
            r#"<div class="recent-post-item">
  <a class="post_cover left" href="/posts/{id}" title="{title}">
    <div class="post-cover-placeholder"></div>
  </a>
  <div class="recent-post-info">
    <a class="article-title" href="/posts/{id}" title="{title}">
      <span class="article-title-text">{title}</span>
    </a>
    <div class="article-meta-wrap">
      <span class="post-meta-date"><time datetime="{date}">{date}</time></span>
      <span class="article-meta-categories">
        <a class="article-meta__categories" href="/categories/{category_href}/">{category}</a>
      </span>
    </div>
    <div class="article-meta-tags">{tag_links}</div>
  </div>
</div>
"#,
            id = post.id,
            title = post.title,
            date = date,
            category = post.category,
            category_href = utf8_percent_encode(&post.category, SEGMENT),
            tag_links = tag_links,
        ));
    }

    html
}

fn archive_fragment(posts: &[&PostSummary]) -> String {
    let mut by_year: BTreeMap<i32, Vec<&PostSummary>> = BTreeMap::new();
    for post in posts {
        by_year.entry(post.created_at.year()).or_default().push(post);
    }

    let mut html = String::from(r#"<div class="article-sort dynamic-posts-section">"#);

    for (year, group) in by_year.iter().rev() {
        html.push_str(&format!(
            r#"<div class="article-sort-item year">{year}</div>"#
        ));

        for post in group {
            let tag_links: String = post.tags.iter().map(|tag| tag_link(tag)).collect();
            html.push_str(&format!(
                r#"<div class="article-sort-item">
  <a class="article-sort-item-img" href="/posts/{id}" title="{title}">
    <div class="post-cover-placeholder"></div>
  </a>
  <div class="article-sort-item-info">
    <a class="article-sort-item-title" href="/posts/{id}" title="{title}">{title}</a>
    <div class="article-sort-item-tags">{tag_links}</div>
  </div>
</div>
"#,
                id = post.id,
                title = post.title,
                tag_links = tag_links,
            ));
        }
    }

    html.push_str("</div>");
    html
}

fn tag_link(tag: &str) -> String {
    format!(
        r#"<a class="article-meta__tags" href="/tags/{href}/"><span class="tags-punctuation">{tag}</span></a>"#,
        href = utf8_percent_encode(tag, SEGMENT),
        tag = tag,
    )
}

fn display_date(post: &PostSummary) -> String {
    post.created_at
        .format(CARD_DATE_FORMAT)
        .unwrap_or_else(|_| post.created_at.to_string())
}
