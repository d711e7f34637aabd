//! Walks the source tree and sorts its entries into content files (Markdown
//! and HTML posts), static assets, and directories.

use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const MARKDOWN_EXTENSION: &str = ".md";
pub const HTML_EXTENSION: &str = ".html";

/// A file found under the source root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    /// The path of the file, joined onto the source root.
    pub path: PathBuf,

    /// The path of the file relative to the source root.
    pub relative_path: PathBuf,
}

/// The result of scanning a source directory.
#[derive(Debug, Default)]
pub struct Scan {
    /// Markdown and HTML files, in traversal order.
    pub content: Vec<SourceFile>,

    /// Every other file, copied verbatim to the output root.
    pub assets: Vec<SourceFile>,

    /// Every directory below the source root, relative to it, parents before
    /// children.
    pub directories: Vec<PathBuf>,
}

/// Returns `true` if the file name marks a post (`.md` or `.html`).
pub fn is_content_file(file_name: &str) -> bool {
    file_name.ends_with(MARKDOWN_EXTENSION) || file_name.ends_with(HTML_EXTENSION)
}

/// Recursively scans `source_directory`. Entries are visited in file-name
/// order so repeated runs see the same sequence.
pub fn scan(source_directory: &Path) -> Result<Scan> {
    if !source_directory.is_dir() {
        return Err(Error::MissingSource(source_directory.to_owned()));
    }

    let mut scan = Scan::default();
    for result in WalkDir::new(source_directory)
        .min_depth(1)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = result?;

        // strip_prefix() shouldn't fail since `source_directory` is always
        // an ancestor of the entry
        let relative_path = match entry.path().strip_prefix(source_directory) {
            Ok(relative_path) => relative_path.to_owned(),
            Err(_) => continue,
        };

        // Links aren't followed into directories; dangling links are dropped
        if entry.path_is_symlink() && !entry.path().is_file() {
            log::warn!(
                "skipping `{}`: only links to files are followed",
                entry.path().display()
            );
            continue;
        }

        if entry.file_type().is_dir() {
            scan.directories.push(relative_path);
            continue;
        }

        let file = SourceFile {
            path: entry.path().to_owned(),
            relative_path,
        };
        if is_content_file(&entry.file_name().to_string_lossy()) {
            scan.content.push(file);
        } else {
            scan.assets.push(file);
        }
    }

    log::debug!(
        "scanned `{}`: {} posts, {} assets, {} directories",
        source_directory.display(),
        scan.content.len(),
        scan.assets.len(),
        scan.directories.len(),
    );
    Ok(scan)
}

/// The result of a scan.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error walking the source directory.
#[derive(Debug)]
pub enum Error {
    /// Returned when the source root doesn't exist or isn't a directory.
    MissingSource(PathBuf),

    /// Returned for I/O errors during traversal.
    WalkDir(walkdir::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingSource(path) => {
                write!(f, "source directory `{}` does not exist", path.display())
            }
            Error::WalkDir(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MissingSource(_) => None,
            Error::WalkDir(err) => Some(err),
        }
    }
}

impl From<walkdir::Error> for Error {
    /// Converts [`walkdir::Error`]s into [`Error`] so we can use `?`.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}
