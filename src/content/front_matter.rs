//! Front-matter block parsing for flat Markdown documents.
//!
//! A document carries an optional metadata block delimited by two lines of
//! exactly `---`. Parsing never fails: a document with fewer than two
//! delimiter lines yields empty metadata and the untouched input as body, so
//! callers can fall back to identifier-derived titles.

use once_cell::sync::Lazy;
use regex::Regex;

const DELIMITER: &str = "---";

/// A single metadata value: plain scalar or ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Scalar(String),
    List(Vec<String>),
}

/// Parsed metadata block. Keys are case-sensitive and keep document order;
/// when a key appears twice the first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    entries: Vec<(String, Value)>,
}

impl FrontMatter {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    /// Scalar lookup. A list value answers with its first element.
    pub fn scalar(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            Value::Scalar(value) => Some(value.as_str()),
            Value::List(items) => items.first().map(String::as_str),
        }
    }

    /// List lookup. A scalar value answers as a single-element list.
    pub fn list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::Scalar(value)) => vec![value.clone()],
            Some(Value::List(items)) => items.clone(),
            None => Vec::new(),
        }
    }

    fn insert_first_wins(&mut self, key: String, value: Value) {
        if self.get(&key).is_none() {
            self.entries.push((key, value));
        }
    }
}

/// Split a raw document into its metadata block and body.
///
/// The body is everything after the second delimiter line, rejoined verbatim
/// so a stray `---` inside prose never truncates it.
pub fn parse(document: &str) -> (FrontMatter, String) {
    let lines: Vec<&str> = document.lines().collect();
    let mut delimiters = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.trim() == DELIMITER)
        .map(|(index, _)| index);

    let (Some(open), Some(close)) = (delimiters.next(), delimiters.next()) else {
        return (FrontMatter::default(), document.to_string());
    };

    let metadata = parse_block(&lines[open + 1..close]);
    let body = lines[close + 1..].join("\n");

    (metadata, body)
}

fn parse_block(lines: &[&str]) -> FrontMatter {
    let mut metadata = FrontMatter::default();
    // Key currently accumulating indented `- item` lines.
    let mut open_list: Option<(String, Vec<String>)> = None;

    for raw in lines {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(item) = line.strip_prefix('-') {
            if let Some((_, items)) = open_list.as_mut() {
                items.push(item.trim().to_string());
            }
            continue;
        }

        if let Some((key, value)) = line.split_once(':') {
            close_list(&mut metadata, &mut open_list);

            let key = key.trim().to_string();
            let value = value.trim();

            if value.is_empty() {
                open_list = Some((key, Vec::new()));
            } else if let Some(inner) = bracketed(value) {
                metadata.insert_first_wins(key, Value::List(split_inline_list(inner)));
            } else {
                metadata.insert_first_wins(key, Value::Scalar(value.to_string()));
            }
        }
    }

    close_list(&mut metadata, &mut open_list);
    metadata
}

/// Seal an accumulating list key. One collected item stays scalar; the
/// upgrade to a list happens only once a second item has arrived.
fn close_list(metadata: &mut FrontMatter, open_list: &mut Option<(String, Vec<String>)>) {
    let Some((key, mut items)) = open_list.take() else {
        return;
    };

    match items.len() {
        0 => {}
        1 => metadata.insert_first_wins(key, Value::Scalar(items.remove(0))),
        _ => metadata.insert_first_wins(key, Value::List(items)),
    }
}

fn bracketed(value: &str) -> Option<&str> {
    value.strip_prefix('[')?.strip_suffix(']')
}

fn split_inline_list(inner: &str) -> Vec<String> {
    inner
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Scalar metadata probed straight off a raw document, for paths that only
/// need listing fields and no body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbedMetadata {
    pub title: Option<String>,
    pub date: Option<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub cover: Option<String>,
}

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^title:[ \t]*(.+?)[ \t]*$").unwrap());
static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^date:[ \t]*(.+?)[ \t]*$").unwrap());
static COVER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^cover:[ \t]*(.+?)[ \t]*$").unwrap());
static TAGS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^tags:[ \t]*\[?([^\]\r\n]*)\]?[ \t]*$").unwrap());
// Generator sources disagree on singular vs. plural; accept both.
static CATEGORIES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^categor(?:ies|y):[ \t]*\[?([^\]\r\n]*)\]?[ \t]*$").unwrap());

/// Extract listing fields from a document without a full parse.
///
/// An unterminated metadata block degrades the same way `parse` does: the
/// probe comes back empty rather than guessing at half a block.
pub fn probe(document: &str) -> ProbedMetadata {
    let lines: Vec<&str> = document.lines().collect();
    let mut delimiters = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.trim() == DELIMITER)
        .map(|(index, _)| index);

    let (Some(open), Some(close)) = (delimiters.next(), delimiters.next()) else {
        return ProbedMetadata::default();
    };

    let block = lines[open + 1..close].join("\n");

    ProbedMetadata {
        title: capture_scalar(&TITLE_RE, &block),
        date: capture_scalar(&DATE_RE, &block),
        categories: capture_list(&CATEGORIES_RE, &block),
        tags: capture_list(&TAGS_RE, &block),
        cover: capture_scalar(&COVER_RE, &block),
    }
}

fn capture_scalar(re: &Regex, block: &str) -> Option<String> {
    re.captures(block)
        .map(|captures| captures[1].trim().to_string())
        .filter(|value| !value.is_empty())
}

fn capture_list(re: &Regex, block: &str) -> Vec<String> {
    re.captures(block)
        .map(|captures| split_inline_list(&captures[1]))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = "---\n\
        title: Shipping Notes\n\
        date: 2024-05-01 10:30:00\n\
        categories: [tech]\n\
        tags:\n\
        - rust\n\
        - web\n\
        cover: /img/cover.png\n\
        ---\n\
        \n\
        First paragraph.";

    #[test]
    fn parse_splits_metadata_and_body() {
        let (metadata, body) = parse(DOCUMENT);

        assert_eq!(metadata.scalar("title"), Some("Shipping Notes"));
        assert_eq!(metadata.scalar("date"), Some("2024-05-01 10:30:00"));
        assert_eq!(metadata.list("categories"), vec!["tech"]);
        assert_eq!(metadata.list("tags"), vec!["rust", "web"]);
        assert_eq!(metadata.scalar("cover"), Some("/img/cover.png"));
        assert_eq!(body, "\nFirst paragraph.");
    }

    #[test]
    fn parse_without_delimiters_degrades_to_body_only() {
        let input = "just a plain markdown file\nwith two lines";
        let (metadata, body) = parse(input);

        assert!(metadata.is_empty());
        assert_eq!(body, input);
    }

    #[test]
    fn parse_with_single_delimiter_degrades_to_body_only() {
        let input = "---\ntitle: Never Closed\nbody text";
        let (metadata, body) = parse(input);

        assert!(metadata.is_empty());
        assert_eq!(body, input);
    }

    #[test]
    fn body_keeps_stray_delimiter_lines() {
        let input = "---\ntitle: A\n---\nintro\n---\noutro";
        let (metadata, body) = parse(input);

        assert_eq!(metadata.scalar("title"), Some("A"));
        assert_eq!(body, "intro\n---\noutro");
    }

    #[test]
    fn first_occurrence_of_a_key_wins() {
        let input = "---\ntitle: First\ntitle: Second\n---\nbody";
        let (metadata, _) = parse(input);

        assert_eq!(metadata.scalar("title"), Some("First"));
    }

    #[test]
    fn single_list_item_stays_scalar_until_second_arrives() {
        let one = "---\ntags:\n- solo\n---\nbody";
        let (metadata, _) = parse(one);
        assert_eq!(metadata.get("tags"), Some(&Value::Scalar("solo".into())));
        assert_eq!(metadata.list("tags"), vec!["solo"]);

        let two = "---\ntags:\n- first\n- second\n---\nbody";
        let (metadata, _) = parse(two);
        assert_eq!(
            metadata.get("tags"),
            Some(&Value::List(vec!["first".into(), "second".into()]))
        );
    }

    #[test]
    fn scalar_assignment_closes_an_open_list_key() {
        let input = "---\ntags:\n- a\ncover: /img/x.png\n- stray\n---\nbody";
        let (metadata, _) = parse(input);

        assert_eq!(metadata.list("tags"), vec!["a"]);
        assert_eq!(metadata.scalar("cover"), Some("/img/x.png"));
    }

    #[test]
    fn round_trips_scalar_fields() {
        let (metadata, body) = parse(DOCUMENT);
        let rebuilt = format!(
            "---\ntitle: {}\ndate: {}\ncategories: [{}]\ntags: [{}]\ncover: {}\n---\n{}",
            metadata.scalar("title").unwrap(),
            metadata.scalar("date").unwrap(),
            metadata.list("categories").join(", "),
            metadata.list("tags").join(", "),
            metadata.scalar("cover").unwrap(),
            body,
        );

        let (reparsed, rebody) = parse(&rebuilt);
        assert_eq!(reparsed.scalar("title"), metadata.scalar("title"));
        assert_eq!(reparsed.scalar("date"), metadata.scalar("date"));
        assert_eq!(reparsed.list("tags"), metadata.list("tags"));
        assert_eq!(rebody, body);
    }

    #[test]
    fn probe_reads_listing_fields_only() {
        let probed = probe(DOCUMENT);

        assert_eq!(probed.title.as_deref(), Some("Shipping Notes"));
        assert_eq!(probed.date.as_deref(), Some("2024-05-01 10:30:00"));
        assert_eq!(probed.categories, vec!["tech"]);
        assert_eq!(probed.cover.as_deref(), Some("/img/cover.png"));
    }

    #[test]
    fn probe_accepts_singular_category_key() {
        let input = "---\ntitle: T\ncategory: life\n---\nbody";
        assert_eq!(probe(input).categories, vec!["life"]);
    }

    #[test]
    fn probe_of_unterminated_block_is_empty() {
        let input = "---\ntitle: Half Open\nno closing line";
        assert_eq!(probe(input), ProbedMetadata::default());
    }
}
