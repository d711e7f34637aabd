//! Builds the site index: every [`Post`] sorted newest first and grouped by
//! the directory it lives in.
//!
//! Sections appear in the order their directory is first seen in the sorted
//! list, so the section holding the newest post comes first. Within a
//! section posts keep the sorted order; equal dates keep traversal order.

use crate::post::Post;

/// The label shown for posts at the output root.
pub const ROOT_LABEL: &str = "Root";

/// A group of posts sharing an output directory.
#[derive(Debug)]
pub struct Section<'a> {
    /// The directory relative to the output root with `/` separators. Empty
    /// for the root.
    pub directory: String,

    /// The posts in the directory, newest first.
    pub posts: Vec<&'a Post>,
}

impl Section<'_> {
    /// The heading for the section.
    pub fn label(&self) -> &str {
        match self.directory.is_empty() {
            true => ROOT_LABEL,
            false => &self.directory,
        }
    }

    /// A stable HTML `id` for the section.
    pub fn anchor(&self) -> String {
        match self.directory.is_empty() {
            true => String::from("section-root"),
            false => format!("section-{}", slug::slugify(&self.directory)),
        }
    }
}

/// Sorts posts by date, most recent first. The sort is stable.
pub fn sort_posts(posts: &[Post]) -> Vec<&Post> {
    let mut sorted: Vec<&Post> = posts.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
}

/// Groups already-sorted posts by directory in first-seen order.
pub fn group_posts<'a>(sorted: &[&'a Post]) -> Vec<Section<'a>> {
    let mut sections: Vec<Section<'a>> = Vec::new();
    for &post in sorted {
        let directory = post.directory();
        match sections.iter_mut().find(|s| s.directory == directory) {
            Some(section) => section.posts.push(post),
            None => sections.push(Section {
                directory,
                posts: vec![post],
            }),
        }
    }
    sections
}

/// Sorts and groups `posts` for the index page.
pub fn index_posts(posts: &[Post]) -> Vec<Section<'_>> {
    group_posts(&sort_posts(posts))
}
