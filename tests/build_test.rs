use postwalk::build::Error;
use postwalk::parser::modified_date;
use postwalk::{build_site, Config};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0, 1, 2, 3, 255];

fn write(root: &Path, relative: &str, contents: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Lays out a small blog and returns the scratch directory and its config.
fn fixture() -> (TempDir, Config) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let posts = dir.path().join("posts");
    write(
        &posts,
        "hello.md",
        "---\ntitle: Hello World\ndate: 2024-01-01\ntags: [intro, rust]\ndescription: The first post\n---\n# Hi\n\n![A diagram](img/diagram.png)\n\nSee [the notes](notes/a.md).\n\n![猫](图片/猫.png)\n"
            .as_bytes(),
    );
    write(
        &posts,
        "notes/a.md",
        b"---\ntitle: Note A\ndate: 2024-03-01\n---\nNote body.\n",
    );
    write(
        &posts,
        "older.md",
        b"---\ntitle: Older\ndate: 2023-12-31\n---\nOld.\n",
    );
    write(&posts, "undated.md", b"No frontmatter here.\n");
    write(&posts, "page.html", b"<html><body>verbatim</body></html>");
    write(&posts, "img/diagram.png", PNG);
    fs::create_dir_all(posts.join("drafts/empty")).unwrap();

    let mut config = Config::with_root(dir.path());
    config.index_title = String::from("Test Blog");
    (dir, config)
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("reading {}: {}", path.display(), e))
}

fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            (
                e.path().strip_prefix(root).unwrap().to_owned(),
                fs::read(e.path()).unwrap(),
            )
        })
        .collect()
}

#[test]
fn test_build_site_layout() {
    let (_dir, config) = fixture();
    let summary = build_site(&config).unwrap();
    let out = &config.output_directory;

    assert_eq!(5, summary.posts);
    assert_eq!(1, summary.assets);
    assert_eq!(None, summary.backup);

    assert!(out.join("hello.html").is_file());
    assert!(out.join("notes/a.html").is_file());
    assert!(out.join("undated.html").is_file());
    assert!(out.join("index.html").is_file());
    assert!(out.join("drafts/empty").is_dir());
    assert!(!out.join("hello.md").exists());
    assert!(!out.join("notes/a.md").exists());

    assert_eq!(PNG, fs::read(out.join("img/diagram.png")).unwrap().as_slice());
    assert_eq!(
        "<html><body>verbatim</body></html>",
        read(&out.join("page.html"))
    );
}

#[test]
fn test_post_page_contents() {
    let (_dir, config) = fixture();
    build_site(&config).unwrap();
    let html = read(&config.output_directory.join("hello.html"));

    assert!(html.contains("<title>Hello World</title>"), "{}", html);
    assert!(html.contains("Date: 2024-01-01"), "{}", html);
    assert!(html.contains("Tags: intro, rust"), "{}", html);
    assert!(html.contains("The first post"), "{}", html);
    assert!(html.contains("<h1>Hi</h1>"), "{}", html);
    assert!(
        html.contains(r#"<img src="img/diagram.png" alt="A diagram" style="width: 90%; max-width: 800px; display: block; margin: 20px auto; cursor: pointer;""#),
        "{}",
        html
    );
    assert!(html.contains(r#"<a href="notes/a.html">the notes</a>"#), "{}", html);
    assert!(html.contains(r#"<img src="图片/猫.png" alt="猫""#), "{}", html);

    let nested = read(&config.output_directory.join("notes/a.html"));
    assert!(nested.contains(r#"<a href="../index.html""#), "{}", nested);
}

#[test]
fn test_missing_date_uses_modification_time() {
    let (_dir, config) = fixture();
    build_site(&config).unwrap();

    let expected = modified_date(&config.source_directory.join("undated.md")).unwrap();
    let html = read(&config.output_directory.join("undated.html"));
    assert!(html.contains("<title>undated</title>"), "{}", html);
    assert!(html.contains(&format!("Date: {}<br>", expected)), "{}", html);
}

#[test]
fn test_index_sorted_and_grouped() {
    let (_dir, config) = fixture();
    build_site(&config).unwrap();
    let index = read(&config.output_directory.join("index.html"));

    assert!(index.contains("<title>Test Blog</title>"), "{}", index);
    assert!(
        index.contains(r#"<a href="notes/a.html" class="file-link">Note A</a>"#),
        "{}",
        index
    );
    assert!(index.contains(r#"<div class="directory-name">notes</div>"#), "{}", index);
    assert!(index.contains("Tags: intro, rust"), "{}", index);
    assert!(index.contains("The first post"), "{}", index);

    // undated posts carry today's date, so the root section comes first
    let root = index.find(r#"directory-name">Root"#).unwrap();
    let notes = index.find(r#"directory-name">notes"#).unwrap();
    assert!(root < notes);

    let hello = index.find(r#"href="hello.html""#).unwrap();
    let older = index.find(r#"href="older.html""#).unwrap();
    assert!(hello < older);
}

#[test]
fn test_build_is_idempotent() {
    let (_dir, config) = fixture();
    build_site(&config).unwrap();
    let first = snapshot(&config.output_directory);
    build_site(&config).unwrap();
    let second = snapshot(&config.output_directory);
    assert_eq!(first, second);
}

#[test]
fn test_stale_output_is_removed() {
    let (_dir, config) = fixture();
    write(&config.output_directory, "stale/old.html", b"stale");
    build_site(&config).unwrap();
    assert!(!config.output_directory.join("stale").exists());
}

#[test]
fn test_asset_timestamps_preserved() {
    let (_dir, config) = fixture();
    build_site(&config).unwrap();
    let src = fs::metadata(config.source_directory.join("img/diagram.png")).unwrap();
    let dst = fs::metadata(config.output_directory.join("img/diagram.png")).unwrap();
    assert_eq!(src.modified().unwrap(), dst.modified().unwrap());
}

#[test]
fn test_missing_source_keeps_output() {
    let dir = TempDir::new().unwrap();
    let config = Config::with_root(dir.path());
    write(&config.output_directory, "index.html", b"previous");

    assert!(build_site(&config).is_err());
    assert_eq!("previous", read(&config.output_directory.join("index.html")));
}

#[test]
fn test_output_overlapping_source_is_refused() {
    let (dir, mut config) = fixture();
    let source = config.source_directory.clone();
    for output in [dir.path().to_owned(), source.clone(), source.join("site")] {
        config.output_directory = output;
        match build_site(&config) {
            Err(Error::Overlap { .. }) => {}
            other => panic!(
                "expected an overlap for {}, got {:?}",
                config.output_directory.display(),
                other
            ),
        }
        assert!(source.join("hello.md").is_file());
        assert!(source.join("img/diagram.png").is_file());
    }
    assert!(!source.join("site").exists());
}

#[cfg(unix)]
#[test]
fn test_linked_directory_is_skipped() {
    let (dir, config) = fixture();
    let shared = dir.path().join("shared");
    write(&shared, "x.png", PNG);
    std::os::unix::fs::symlink(&shared, config.source_directory.join("shared")).unwrap();

    let summary = build_site(&config).unwrap();
    assert_eq!(1, summary.assets);
    assert!(!config.output_directory.join("shared").exists());
}
