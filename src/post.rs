//! Defines the [`Post`] type, the in-memory record produced for every
//! Markdown or HTML source file, along with its [`SourceKind`].

use std::path::{Component, Path, PathBuf};

/// Where a [`Post`] came from. Markdown posts are templated into a full page;
/// HTML posts are copied to the output directory unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Markdown,
    Html,
}

/// A single post, normalized from its source file. Posts are built once by
/// [`crate::parser::Parser`] and only read afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    /// The title of the post. Taken from the frontmatter when present,
    /// otherwise the source file's stem.
    pub title: String,

    /// The date of the post as `YYYY-MM-DD`.
    pub date: String,

    /// The tags associated with the post, in source order.
    pub tags: Vec<String>,

    /// A short description of the post. May be empty.
    pub description: String,

    /// An optional cover image URL. Only Markdown posts have one.
    pub cover_image: Option<String>,

    /// The HTML body of the post.
    pub content: String,

    /// Whether the post was written in Markdown or HTML.
    pub source_kind: SourceKind,

    /// The absolute (or working-directory-relative) path of the source file.
    pub source_path: PathBuf,

    /// The location of the output file relative to the output root. Always
    /// ends in `.html`.
    pub output_path: PathBuf,
}

impl Post {
    /// Returns [`Post::output_path`] as a URL path with `/` separators,
    /// suitable for links from the index page.
    pub fn href(&self) -> String {
        url_path(&self.output_path)
    }

    /// Returns the directory portion of [`Post::href`], or the empty string
    /// for posts at the output root.
    pub fn directory(&self) -> String {
        match self.output_path.parent() {
            Some(parent) => url_path(parent),
            None => String::new(),
        }
    }

    /// Returns the relative link from this post's page back to the root
    /// `index.html` (e.g., `../index.html` for `notes/a.html`).
    pub fn index_href(&self) -> String {
        let depth = self
            .output_path
            .parent()
            .map(|p| p.components().count())
            .unwrap_or(0);
        let mut href = "../".repeat(depth);
        href.push_str("index.html");
        href
    }

    /// The tags joined with `, `.
    pub fn joined_tags(&self) -> String {
        self.tags.join(", ")
    }
}

/// Derives the output path for a source file relative to the source root:
/// the same path with its extension replaced by `html`.
pub fn output_path(relative_path: &Path) -> PathBuf {
    match relative_path.extension() {
        Some(_) => relative_path.with_extension("html"),
        // `.md` and `.html` are all name and no extension
        None => relative_path.with_file_name(".html"),
    }
}

fn url_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<String>>()
        .join("/")
}
