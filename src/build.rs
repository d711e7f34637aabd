//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output site: scanning the source tree
//! ([`crate::scan`]), parsing posts ([`crate::parser`]), and materializing the
//! output root. Materializing happens in a fixed order:
//!
//! 1. Remove the old output root (or move it aside to `<root>_old`)
//! 2. Recreate the output root
//! 3. Mirror the source directories and copy static assets
//! 4. Write rendered Markdown posts and copy HTML posts
//! 5. Write `index.html`
//!
//! Every source file is parsed before the old output is touched, so a file
//! that can't be read leaves the previous output in place.

use crate::config::Config;
use crate::index;
use crate::parser::{self, Error as ParseError};
use crate::post::{Post, SourceKind};
use crate::scan::{self, Error as ScanError, Scan};
use crate::write::{Error as WriteError, Writer};
use std::collections::HashSet;
use std::fmt;
use std::fs::{self, FileTimes};
use std::io;
use std::path::{Path, PathBuf};

/// The name of the generated index page at the output root.
pub const INDEX_FILE: &str = "index.html";

/// What a successful build produced.
#[derive(Debug, PartialEq, Eq)]
pub struct Summary {
    /// The number of Markdown and HTML posts written.
    pub posts: usize,

    /// The number of static assets copied.
    pub assets: usize,

    /// Where the previous output root was moved, if it couldn't be deleted.
    pub backup: Option<PathBuf>,
}

/// Builds the site described by `config`.
pub fn build_site(config: &Config) -> Result<Summary> {
    log::info!(
        "building `{}` into `{}`",
        config.source_directory.display(),
        config.output_directory.display()
    );

    let scan = scan::scan(&config.source_directory)?;
    let posts = parser::parse_posts(&scan.content)?;
    let writer = Writer::new()?;

    let output = &config.output_directory;
    check_overlap(&config.source_directory, output)?;
    let backup = clean_output(output)?;
    fs::create_dir_all(output).map_err(io_error(output))?;

    mirror_tree(&scan, output)?;
    write_posts(&writer, &posts, output)?;

    let sections = index::index_posts(&posts);
    let index_path = output.join(INDEX_FILE);
    let html = writer.render_index(&config.index_title, &sections)?;
    fs::write(&index_path, html).map_err(io_error(&index_path))?;

    let summary = Summary {
        posts: posts.len(),
        assets: scan.assets.len(),
        backup,
    };
    log::info!(
        "wrote {} posts and {} assets to `{}`",
        summary.posts,
        summary.assets,
        output.display()
    );
    Ok(summary)
}

/// Refuses output roots that would delete the source on cleaning (the source
/// itself or one of its ancestors) or that would be read back as source
/// (anything inside it).
fn check_overlap(source: &Path, output: &Path) -> Result<()> {
    let source_abs = absolute(source).map_err(io_error(source))?;
    let output_abs = absolute(output).map_err(io_error(output))?;
    if source_abs.starts_with(&output_abs) || output_abs.starts_with(&source_abs) {
        return Err(Error::Overlap {
            source: source.to_owned(),
            output: output.to_owned(),
        });
    }
    Ok(())
}

/// Canonicalizes `path`. Trailing components that don't exist yet are
/// appended to the canonical form of the nearest existing ancestor.
fn absolute(path: &Path) -> io::Result<PathBuf> {
    match fs::canonicalize(path) {
        Ok(path) => Ok(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) => {
                let parent = match parent.as_os_str().is_empty() {
                    true => Path::new("."),
                    false => parent,
                };
                Ok(absolute(parent)?.join(name))
            }
            _ => Err(e),
        },
        Err(e) => Err(e),
    }
}

/// Creates every source directory under `output` (even empty ones) and
/// copies each static asset into place.
pub fn mirror_tree(scan: &Scan, output: &Path) -> Result<()> {
    for dir in &scan.directories {
        let dst = output.join(dir);
        fs::create_dir_all(&dst).map_err(io_error(&dst))?;
    }
    for asset in &scan.assets {
        let dst = output.join(&asset.relative_path);
        copy_file(&asset.path, &dst).map_err(io_error(&asset.path))?;
        log::debug!("copied `{}`", asset.relative_path.display());
    }
    Ok(())
}

/// Writes each post to its output path. Markdown posts are templated; HTML
/// posts are copied byte for byte.
pub fn write_posts(writer: &Writer, posts: &[Post], output: &Path) -> Result<()> {
    let mut seen: HashSet<&Path> = HashSet::new();
    for post in posts {
        if !seen.insert(&post.output_path) {
            log::warn!(
                "`{}` is produced by more than one source; `{}` wins",
                post.output_path.display(),
                post.source_path.display()
            );
        }

        let dst = output.join(&post.output_path);
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
        match post.source_kind {
            SourceKind::Markdown => {
                let html = writer.render_post(post)?;
                fs::write(&dst, html).map_err(io_error(&dst))?;
            }
            SourceKind::Html => {
                copy_file(&post.source_path, &dst).map_err(io_error(&post.source_path))?;
            }
        }
        log::debug!("wrote `{}`", post.output_path.display());
    }
    Ok(())
}

/// Copies `src` to `dst`, carrying over the modification (and, where
/// available, access) time.
fn copy_file(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst)?;
    let metadata = fs::metadata(src)?;
    let mut times = FileTimes::new().set_modified(metadata.modified()?);
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    fs::OpenOptions::new().write(true).open(dst)?.set_times(times)
}

/// Removes the output root. If it can't be removed, it is renamed to
/// `<root>_old` instead (replacing any earlier backup) and the backup path
/// is returned. Fails only if both attempts fail.
pub fn clean_output(dir: &Path) -> Result<Option<PathBuf>> {
    clean_with(dir, |d| fs::remove_dir_all(d), |from, to| fs::rename(from, to))
}

fn clean_with<R, M>(dir: &Path, remove: R, rename: M) -> Result<Option<PathBuf>>
where
    R: Fn(&Path) -> io::Result<()>,
    M: FnOnce(&Path, &Path) -> io::Result<()>,
{
    let remove_err = match remove(dir) {
        Ok(()) => return Ok(None),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => e,
    };
    log::warn!(
        "couldn't remove `{}` ({}); moving it aside",
        dir.display(),
        remove_err
    );

    let backup = match backup_path(dir) {
        Some(backup) => backup,
        None => {
            return Err(Error::Clean {
                path: dir.to_owned(),
                err: remove_err,
                fallback: None,
            })
        }
    };
    if backup.exists() {
        if let Err(e) = remove(&backup) {
            log::warn!("couldn't remove old backup `{}`: {}", backup.display(), e);
        }
    }

    match rename(dir, &backup) {
        Ok(()) => {
            log::warn!("moved `{}` to `{}`", dir.display(), backup.display());
            Ok(Some(backup))
        }
        Err(rename_err) => Err(Error::Clean {
            path: dir.to_owned(),
            err: remove_err,
            fallback: Some(rename_err),
        }),
    }
}

fn backup_path(dir: &Path) -> Option<PathBuf> {
    let name = dir.file_name()?;
    let mut backup = name.to_owned();
    backup.push("_old");
    Some(dir.with_file_name(backup))
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> Error + '_ {
    move |err| Error::Io {
        path: path.to_owned(),
        err,
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during scanning,
/// parsing, templating, cleaning the output directory, and other I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors walking the source directory.
    Scan(ScanError),

    /// Returned for errors reading posts.
    Parse(ParseError),

    /// Returned for errors templating pages.
    Write(WriteError),

    /// Returned when the output root could neither be removed nor moved
    /// aside. `fallback` holds the rename error when a rename was tried.
    Clean {
        path: PathBuf,
        err: io::Error,
        fallback: Option<io::Error>,
    },

    /// Returned when the output root is the source root, contains it, or
    /// lies inside it.
    Overlap { source: PathBuf, output: PathBuf },

    /// Returned for other I/O errors.
    Io { path: PathBuf, err: io::Error },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Scan(err) => err.fmt(f),
            Error::Parse(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::Clean {
                path,
                err,
                fallback: Some(fallback),
            } => write!(
                f,
                "Cleaning directory '{}': {}; moving it aside also failed: {}. \
                 Make sure no files in it are in use",
                path.display(),
                err,
                fallback
            ),
            Error::Clean {
                path,
                err,
                fallback: None,
            } => write!(f, "Cleaning directory '{}': {}", path.display(), err),
            Error::Overlap { source, output } => write!(
                f,
                "Output directory '{}' overlaps source directory '{}'; refusing to clean it",
                output.display(),
                source.display()
            ),
            Error::Io { path, err } => write!(f, "'{}': {}", path.display(), err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Scan(err) => Some(err),
            Error::Parse(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Clean { err, .. } => Some(err),
            Error::Overlap { .. } => None,
            Error::Io { err, .. } => Some(err),
        }
    }
}

impl From<ScanError> for Error {
    /// Converts [`ScanError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ScanError) -> Error {
        Error::Scan(err)
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn denied(_: &Path) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "in use"))
    }

    #[test]
    fn test_clean_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(None, clean_output(&dir.path().join("output")).unwrap());
    }

    #[test]
    fn test_clean_removes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("output");
        fs::create_dir_all(output.join("nested")).unwrap();
        fs::write(output.join("nested/stale.html"), "stale").unwrap();

        assert_eq!(None, clean_output(&output).unwrap());
        assert!(!output.exists());
    }

    #[test]
    fn test_clean_falls_back_to_rename() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("output");
        fs::create_dir_all(&output).unwrap();
        fs::write(output.join("stale.html"), "stale").unwrap();
        // an earlier backup is replaced
        fs::create_dir_all(dir.path().join("output_old")).unwrap();

        let remove = |d: &Path| match d == output.as_path() {
            true => denied(d),
            false => fs::remove_dir_all(d),
        };
        let backup = clean_with(&output, remove, |a, b| fs::rename(a, b)).unwrap();

        let backup = backup.unwrap();
        assert_eq!(dir.path().join("output_old"), backup);
        assert!(!output.exists());
        assert_eq!("stale", fs::read_to_string(backup.join("stale.html")).unwrap());
    }

    #[test]
    fn test_clean_aborts_when_rename_fails() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("output");
        fs::create_dir_all(&output).unwrap();

        let result = clean_with(&output, denied, |_, _| {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
        });
        match result {
            Err(Error::Clean {
                path,
                fallback: Some(_),
                ..
            }) => assert_eq!(output, path),
            other => panic!("expected a cleaning error, got {:?}", other),
        }
        assert!(output.exists());
    }

    #[test]
    fn test_absolute_appends_missing_components() {
        let dir = tempfile::tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        assert_eq!(
            root.join("a/b"),
            absolute(&dir.path().join("a/b")).unwrap()
        );
    }

    #[test]
    fn test_check_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("posts");
        fs::create_dir_all(&source).unwrap();

        assert!(check_overlap(&source, &dir.path().join("output")).is_ok());
        assert!(check_overlap(&source, &dir.path().join("posts_out")).is_ok());
        for output in [
            source.clone(),
            dir.path().to_owned(),
            source.join("output"),
            source.join("../posts/."),
        ] {
            match check_overlap(&source, &output) {
                Err(Error::Overlap { .. }) => {}
                other => panic!("expected an overlap for {:?}, got {:?}", output, other),
            }
        }
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(
            Some(PathBuf::from("site/output_old")),
            backup_path(Path::new("site/output"))
        );
        assert_eq!(None, backup_path(Path::new("..")));
    }
}
