//! The library code for the `postwalk` static blog generator. The
//! architecture can be generally broken down into three distinct steps:
//!
//! 1. Scanning the source tree for posts and assets ([`crate::scan`])
//! 2. Parsing posts from source files on disk ([`crate::parser`])
//! 3. Writing the output tree ([`crate::build`])
//!
//! Markdown posts pass through [`crate::markdown`] and
//! [`crate::htmlrenderer`] on the way in, and through the page template in
//! [`crate::write`] on the way out. HTML posts are copied unchanged. All
//! posts are also listed, newest first and grouped by directory, on a
//! searchable index page ([`crate::index`]).
//!
//! Optionally the output can be previewed with [`crate::serve`].

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod htmlrenderer;
pub mod index;
pub mod markdown;
pub mod parser;
pub mod post;
pub mod scan;
pub mod serve;
pub mod write;

pub use build::{build_site, Summary};
pub use config::Config;
pub use post::{Post, SourceKind};
