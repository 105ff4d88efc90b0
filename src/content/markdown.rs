//! Minimal Markdown rendering via an ordered regex substitution pipeline.
//!
//! Deliberately not CommonMark. The pipeline covers the subset the admin
//! editor produces: fenced code, ATX headers, emphasis, images, links,
//! inline code, blockquotes, and a single unordered list. Input is trusted;
//! raw angle brackets pass through unescaped.

use once_cell::sync::Lazy;
use regex::Regex;

static FENCED_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(\w+)?\n(.*?)```").unwrap());
static H3: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^### (.*)$").unwrap());
static H2: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^## (.*)$").unwrap());
static H1: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^# (.*)$").unwrap());
static BOLD_ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*\*(.+?)\*\*\*").unwrap());
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.+?)\*").unwrap());
// The image rule must run before the link rule so the `![` prefix is
// consumed before the plain bracket pattern can see it.
static IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").unwrap());
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").unwrap());
static BLOCKQUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^> (.*)$").unwrap());
static STAR_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\* (.*)$").unwrap());
static DASH_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^- (.*)$").unwrap());
static LIST_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)(<li>.*</li>)").unwrap());

/// Render a Markdown body to an HTML fragment.
///
/// Pure and infallible; unrecognized constructs pass through verbatim.
/// Only the first contiguous run of list items is wrapped in a `<ul>`.
pub fn render(markdown: &str) -> String {
    let html = FENCED_CODE.replace_all(markdown, "<pre><code>${2}</code></pre>");
    let html = H3.replace_all(&html, "<h3>${1}</h3>");
    let html = H2.replace_all(&html, "<h2>${1}</h2>");
    let html = H1.replace_all(&html, "<h1>${1}</h1>");
    let html = BOLD_ITALIC.replace_all(&html, "<strong><em>${1}</em></strong>");
    let html = BOLD.replace_all(&html, "<strong>${1}</strong>");
    let html = ITALIC.replace_all(&html, "<em>${1}</em>");
    let html = IMAGE.replace_all(&html, r#"<img src="${2}" alt="${1}">"#);
    let html = LINK.replace_all(&html, r#"<a href="${2}">${1}</a>"#);
    let html = INLINE_CODE.replace_all(&html, "<code>${1}</code>");
    let html = BLOCKQUOTE.replace_all(&html, "<blockquote>${1}</blockquote>");
    let html = STAR_ITEM.replace_all(&html, "<li>${1}</li>");
    let html = DASH_ITEM.replace_all(&html, "<li>${1}</li>");

    let html = html.replace("\n\n", "</p><p>").replace('\n', "<br>");
    let html = LIST_RUN.replace(&html, "<ul>${1}</ul>");

    format!("<p>{html}</p>")
}
