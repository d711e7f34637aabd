//! Templates [`Post`]s and the index into complete HTML documents. Both
//! templates are embedded in the binary; metadata values are HTML-escaped
//! before they reach the template while post bodies are inserted as-is.

use crate::htmlrenderer::{EscapeHref, EscapeHtml};
use crate::index::Section;
use crate::post::Post;
use gtmpl::{Context, Template, Value};
use std::collections::HashMap;
use std::fmt;

const POST_TEMPLATE: &str = include_str!("templates/post.html");
const INDEX_TEMPLATE: &str = include_str!("templates/index.html");

/// Responsible for templating post pages and the index page.
pub struct Writer {
    /// The template for post pages.
    posts_template: Template,

    /// The template for the index page.
    index_template: Template,
}

impl Writer {
    /// Parses the embedded templates.
    pub fn new() -> Result<Writer> {
        Ok(Writer {
            posts_template: parse_template(POST_TEMPLATE)?,
            index_template: parse_template(INDEX_TEMPLATE)?,
        })
    }

    /// Renders a Markdown [`Post`] into a standalone HTML document. The same
    /// post always produces the same bytes.
    pub fn render_post(&self, post: &Post) -> Result<String> {
        execute(&self.posts_template, post_value(post))
    }

    /// Renders the index page listing every [`Section`] in order.
    pub fn render_index(&self, title: &str, sections: &[Section]) -> Result<String> {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), escaped(title));
        m.insert(
            "sections".to_owned(),
            Value::Array(sections.iter().map(section_value).collect()),
        );
        execute(&self.index_template, Value::Object(m))
    }
}

fn parse_template(text: &str) -> Result<Template> {
    let mut template = Template::default();
    template.parse(text).map_err(Error::ParseTemplate)?;
    Ok(template)
}

fn execute(template: &Template, value: Value) -> Result<String> {
    let mut out: Vec<u8> = Vec::new();
    template.execute(&mut out, &Context::from(value)?)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn escaped(s: &str) -> Value {
    Value::String(EscapeHtml(s).to_string())
}

/// Converts a [`Post`] into the values used by the post template.
fn post_value(post: &Post) -> Value {
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("title".to_owned(), escaped(&post.title));
    m.insert("date".to_owned(), escaped(&post.date));
    m.insert("tags".to_owned(), escaped(&post.joined_tags()));
    m.insert(
        "has_description".to_owned(),
        Value::Bool(!post.description.is_empty()),
    );
    m.insert("description".to_owned(), escaped(&post.description));
    m.insert(
        "has_cover_image".to_owned(),
        Value::Bool(post.cover_image.is_some()),
    );
    m.insert(
        "cover_image".to_owned(),
        escaped(post.cover_image.as_deref().unwrap_or_default()),
    );
    m.insert("content".to_owned(), Value::String(post.content.clone()));
    m.insert("index_href".to_owned(), Value::String(post.index_href()));
    Value::Object(m)
}

/// Converts a [`Post`] into the values used for its entry on the index.
fn summary_value(post: &Post) -> Value {
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert(
        "href".to_owned(),
        Value::String(EscapeHref(&post.href()).to_string()),
    );
    m.insert("title".to_owned(), escaped(&post.title));
    m.insert("date".to_owned(), escaped(&post.date));
    m.insert("has_tags".to_owned(), Value::Bool(!post.tags.is_empty()));
    m.insert("tags".to_owned(), escaped(&post.joined_tags()));
    m.insert(
        "has_description".to_owned(),
        Value::Bool(!post.description.is_empty()),
    );
    m.insert("description".to_owned(), escaped(&post.description));
    Value::Object(m)
}

fn section_value(section: &Section) -> Value {
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("name".to_owned(), escaped(section.label()));
    m.insert("id".to_owned(), Value::String(section.anchor()));
    m.insert(
        "posts".to_owned(),
        Value::Array(section.posts.iter().map(|p| summary_value(p)).collect()),
    );
    Value::Object(m)
}

/// The result of a fallible templating operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a templating operation.
#[derive(Debug)]
pub enum Error {
    /// Returned when an embedded template doesn't parse.
    ParseTemplate(String),

    /// An error during templating.
    Template(String),
}

impl From<String> for Error {
    /// Converts a template error message ([`String`]) into an [`Error`]. This
    /// allows us to use the `?` operator for fallible template operations.
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ParseTemplate(err) => write!(f, "parsing template: {}", err),
            Error::Template(err) => write!(f, "executing template: {}", err),
        }
    }
}

impl std::error::Error for Error {}
