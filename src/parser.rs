//! Turns source files into [`Post`] records. Markdown files may start with a
//! YAML frontmatter block:
//!
//! ```md
//! ---
//! title: Hello, world!
//! date: 2024-04-16
//! tags: [greet, misc]
//! description: A first post.
//! cover_image: img/cover.jpg
//! ---
//! # Hello
//!
//! World
//! ```
//!
//! Every key is optional. Missing or malformed values never fail the parse;
//! they fall back to defaults (the file stem for `title`, the file's
//! modification date for `date`, empty for the rest) and a warning is logged.
//! HTML files are taken verbatim with the same defaults.

use crate::markdown;
use crate::post::{self, Post, SourceKind};
use crate::scan::{SourceFile, MARKDOWN_EXTENSION};
use chrono::{DateTime, Local, NaiveDate};
use serde::Deserialize;
use serde_yaml::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const FENCE: &str = "---";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses every content file in order. Fails on the first file that can't
/// be read.
pub fn parse_posts(files: &[SourceFile]) -> Result<Vec<Post>> {
    files.iter().map(parse_post).collect()
}

/// Parses a single source file, choosing the Markdown or HTML variant by
/// extension.
pub fn parse_post(file: &SourceFile) -> Result<Post> {
    let contents = fs::read_to_string(&file.path).map_err(|err| Error::Read {
        path: file.path.clone(),
        err,
    })?;
    let fallback_date = modified_date(&file.path)?;

    if file.path.to_string_lossy().ends_with(MARKDOWN_EXTENSION) {
        Ok(parse_markdown(file, &contents, fallback_date))
    } else {
        Ok(parse_html(file, contents, fallback_date))
    }
}

/// Builds a [`Post`] from an HTML source whose contents are used unchanged.
pub fn parse_html(file: &SourceFile, contents: String, date: String) -> Post {
    Post {
        title: file_stem(&file.relative_path),
        date,
        tags: Vec::new(),
        description: String::new(),
        cover_image: None,
        content: contents,
        source_kind: SourceKind::Html,
        source_path: file.path.clone(),
        output_path: post::output_path(&file.relative_path),
    }
}

/// Builds a [`Post`] from a Markdown source. `fallback_date` is used when
/// the frontmatter has no usable `date`.
pub fn parse_markdown(file: &SourceFile, contents: &str, fallback_date: String) -> Post {
    let (yaml, body) = split_frontmatter(contents);
    let frontmatter = match yaml {
        Some(yaml) => Frontmatter::parse(yaml, &file.relative_path),
        None => Frontmatter::default(),
    };

    let mut content = String::new();
    // writing into a `String` can't fail
    let _ = markdown::to_html(&mut content, body);

    let title = match frontmatter.title.as_ref().and_then(scalar) {
        Some(title) if !title.trim().is_empty() => title,
        _ => file_stem(&file.relative_path),
    };

    let date = match frontmatter.date.as_ref() {
        None | Some(Value::Null) => fallback_date,
        Some(value) => match scalar(value).as_deref().and_then(normalize_date) {
            Some(date) => date,
            None => {
                log::warn!(
                    "`{}`: unrecognized date {:?}, using modification date {}",
                    file.relative_path.display(),
                    value,
                    fallback_date
                );
                fallback_date
            }
        },
    };

    Post {
        title,
        date,
        tags: frontmatter
            .tags
            .as_ref()
            .map(|tags| parse_tags(tags, &file.relative_path))
            .unwrap_or_default(),
        description: frontmatter
            .description
            .as_ref()
            .and_then(scalar)
            .unwrap_or_default(),
        cover_image: frontmatter
            .cover_image
            .as_ref()
            .and_then(scalar)
            .filter(|s| !s.trim().is_empty()),
        content,
        source_kind: SourceKind::Markdown,
        source_path: file.path.clone(),
        output_path: post::output_path(&file.relative_path),
    }
}

/// The recognized frontmatter keys. Values are kept loosely typed so a
/// mistyped field only loses that field.
#[derive(Deserialize, Default, Debug)]
struct Frontmatter {
    #[serde(default)]
    title: Option<Value>,

    #[serde(default)]
    date: Option<Value>,

    #[serde(default)]
    tags: Option<Value>,

    #[serde(default)]
    description: Option<Value>,

    #[serde(default)]
    cover_image: Option<Value>,
}

impl Frontmatter {
    fn parse(yaml: &str, relative_path: &Path) -> Frontmatter {
        if yaml.trim().is_empty() {
            return Frontmatter::default();
        }
        match serde_yaml::from_str(yaml) {
            Ok(frontmatter) => frontmatter,
            Err(e) => {
                log::warn!(
                    "`{}`: ignoring malformed frontmatter: {}",
                    relative_path.display(),
                    e
                );
                Frontmatter::default()
            }
        }
    }
}

/// Splits `input` into its YAML frontmatter (if any) and the remaining
/// body. The frontmatter must open with a `---` line and close with another;
/// without both fences the whole input is body.
pub fn split_frontmatter(input: &str) -> (Option<&str>, &str) {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut lines = input.split_inclusive('\n');
    let yaml_start = match lines.next() {
        Some(first) if first.trim_end() == FENCE => first.len(),
        _ => return (None, input),
    };

    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == FENCE {
            return (
                Some(&input[yaml_start..offset]),
                &input[offset + line.len()..],
            );
        }
        offset += line.len();
    }
    (None, input)
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time (`2024-01-02 10:00`
/// or `2024-01-02T10:00:00Z`), and returns just the date.
fn normalize_date(s: &str) -> Option<String> {
    let s = s.trim();
    let day = s.get(..10)?;
    match s[10..].chars().next() {
        None | Some(' ') | Some('T') | Some('t') => {}
        Some(_) => return None,
    }
    NaiveDate::parse_from_str(day, DATE_FORMAT)
        .ok()
        .map(|d| d.format(DATE_FORMAT).to_string())
}

fn parse_tags(value: &Value, relative_path: &Path) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Sequence(items) => items.iter().filter_map(scalar).collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect(),
        other => match scalar(other) {
            Some(tag) => vec![tag],
            None => {
                log::warn!(
                    "`{}`: ignoring unrecognized tags {:?}",
                    relative_path.display(),
                    other
                );
                Vec::new()
            }
        },
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn file_stem(relative_path: &Path) -> String {
    relative_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Returns the modification date of `path` in local time as `YYYY-MM-DD`.
pub fn modified_date(path: &Path) -> Result<String> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|err| Error::Read {
            path: path.to_owned(),
            err,
        })?;
    Ok(DateTime::<Local>::from(modified)
        .format(DATE_FORMAT)
        .to_string())
}

/// Represents the result of a [`Post`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Post`] object.
#[derive(Debug)]
pub enum Error {
    /// Returned when a source file can't be opened, read, or decoded as
    /// UTF-8.
    Read { path: PathBuf, err: std::io::Error },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Read { path, err } => {
                write!(f, "reading post `{}`: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Read { path: _, err } => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn source(relative_path: &str) -> SourceFile {
        SourceFile {
            path: PathBuf::from("posts").join(relative_path),
            relative_path: PathBuf::from(relative_path),
        }
    }

    fn markdown(relative_path: &str, contents: &str) -> Post {
        parse_markdown(&source(relative_path), contents, String::from("1999-12-31"))
    }

    #[test]
    fn test_complete_frontmatter() {
        let post = markdown(
            "notes/hello.md",
            "---\ntitle: Hello\ndate: 2024-03-01\ntags: [a, b]\ndescription: Hi there\ncover_image: c.jpg\n---\n# Body\n",
        );
        assert_eq!("Hello", post.title);
        assert_eq!("2024-03-01", post.date);
        assert_eq!(vec![String::from("a"), String::from("b")], post.tags);
        assert_eq!("Hi there", post.description);
        assert_eq!(Some(String::from("c.jpg")), post.cover_image);
        assert_eq!("<h1>Body</h1>\n", post.content);
        assert_eq!(SourceKind::Markdown, post.source_kind);
        assert_eq!(PathBuf::from("notes/hello.html"), post.output_path);
    }

    #[test]
    fn test_missing_frontmatter_uses_defaults() {
        let post = markdown("my-post.md", "Just text.\n");
        assert_eq!("my-post", post.title);
        assert_eq!("1999-12-31", post.date);
        assert!(post.tags.is_empty());
        assert_eq!("", post.description);
        assert_eq!(None, post.cover_image);
        assert_eq!("<p>Just text.</p>\n", post.content);
    }

    #[test]
    fn test_malformed_frontmatter_is_not_fatal() {
        let post = markdown("x.md", "---\ntitle: [unclosed\n---\nbody\n");
        assert_eq!("x", post.title);
        assert_eq!("1999-12-31", post.date);
        assert_eq!("<p>body</p>\n", post.content);
    }

    #[test]
    fn test_invalid_fields_fall_back() {
        let post = markdown(
            "x.md",
            "---\ntitle: ''\ndate: next tuesday\ntags: {a: 1}\ncover_image: ''\n---\nbody\n",
        );
        assert_eq!("x", post.title);
        assert_eq!("1999-12-31", post.date);
        assert!(post.tags.is_empty());
        assert_eq!(None, post.cover_image);
    }

    #[test]
    fn test_loose_field_types() {
        let post = markdown(
            "x.md",
            "---\ntitle: 2024\ndate: 2024-01-02 10:30\ntags: rust, blogs\n---\n",
        );
        assert_eq!("2024", post.title);
        assert_eq!("2024-01-02", post.date);
        assert_eq!(vec![String::from("rust"), String::from("blogs")], post.tags);
    }

    #[test]
    fn test_split_frontmatter() {
        assert_eq!(
            (Some("a: 1\n"), "body\n"),
            split_frontmatter("---\na: 1\n---\nbody\n")
        );
        assert_eq!((None, "no fences\n"), split_frontmatter("no fences\n"));
        assert_eq!(
            (None, "---\nnever closed\n"),
            split_frontmatter("---\nnever closed\n")
        );
        // a `---` inside a value doesn't close the block
        assert_eq!(
            (Some("a: x---y\n"), ""),
            split_frontmatter("---\na: x---y\n---\n")
        );
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(Some(String::from("2024-01-01")), normalize_date("2024-01-01"));
        assert_eq!(
            Some(String::from("2024-01-01")),
            normalize_date("2024-01-01T08:00:00Z")
        );
        assert_eq!(None, normalize_date("2024-13-01"));
        assert_eq!(None, normalize_date("2024-01-012"));
        assert_eq!(None, normalize_date("yesterday"));
    }

    #[test]
    fn test_parse_post_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        fs::write(&path, "<p>raw</p>").unwrap();
        let file = SourceFile {
            path: path.clone(),
            relative_path: PathBuf::from("page.html"),
        };

        let post = parse_post(&file).unwrap();
        assert_eq!("page", post.title);
        assert_eq!("<p>raw</p>", post.content);
        assert_eq!(SourceKind::Html, post.source_kind);
        assert_eq!(modified_date(&path).unwrap(), post.date);
        assert_eq!(PathBuf::from("page.html"), post.output_path);
    }

    #[test]
    fn test_parse_post_missing_file() {
        match parse_post(&source("gone.md")) {
            Err(Error::Read { path, .. }) => assert_eq!(PathBuf::from("posts/gone.md"), path),
            other => panic!("expected a read error, got {:?}", other),
        }
    }
}
