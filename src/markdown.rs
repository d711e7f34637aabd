//! Converts a Markdown post body into HTML: parse, rewrite links to other
//! posts, then serialize through [`HtmlRenderer`] which styles images.

use crate::htmlrenderer::HtmlRenderer;
use crate::scan::{HTML_EXTENSION, MARKDOWN_EXTENSION};
use pulldown_cmark::*;
use std::io;
use url::{ParseError, Url};

/// Converts markdown to HTML, writing the result into `w`.
pub fn to_html<W: escape::StrWrite>(w: &mut W, markdown: &str) -> io::Result<()> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut html_renderer = HtmlRenderer::new();
    for ev in Parser::new_ext(markdown, options).map(convert) {
        html_renderer.on_event(w, ev)?;
    }
    Ok(())
}

fn convert(ev: Event) -> Event {
    match ev {
        Event::Start(tag) => Event::Start(convert_tag(tag)),
        Event::End(tag) => Event::End(convert_tag(tag)),
        _ => ev,
    }
}

fn convert_tag(tag: Tag) -> Tag {
    match tag {
        // Posts linking to each other by their source name (`foo.md`) need
        // to point at the generated page (`foo.html`) instead.
        Tag::Link(
            link @ (LinkType::Inline
            | LinkType::Reference
            | LinkType::ReferenceUnknown
            | LinkType::Shortcut
            | LinkType::ShortcutUnknown
            | LinkType::Collapsed
            | LinkType::CollapsedUnknown),
            url,
            title,
        ) => match convert_link(&url) {
            Some(converted) => Tag::Link(link, CowStr::Boxed(converted.into_boxed_str()), title),
            None => Tag::Link(link, url, title),
        },
        _ => tag,
    }
}

/// Rewrites a relative link whose path ends in `.md` so that it ends in
/// `.html`, keeping any query or fragment. Returns `None` when the link is
/// absolute or doesn't point at a markdown file.
pub fn convert_link(link: &str) -> Option<String> {
    match Url::parse(link) {
        Err(ParseError::RelativeUrlWithoutBase) => {}
        _ => return None,
    }

    let split = link.find(|c: char| c == '?' || c == '#').unwrap_or(link.len());
    let (path, rest) = link.split_at(split);
    if path.is_empty() || !path.ends_with(MARKDOWN_EXTENSION) {
        return None;
    }

    let mut out = String::with_capacity(link.len() + 2);
    out.push_str(&path[..path.len() - MARKDOWN_EXTENSION.len()]);
    out.push_str(HTML_EXTENSION);
    out.push_str(rest);
    Some(out)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_convert_relative_post() {
        assert_eq!(Some(String::from("other.html")), convert_link("other.md"));
        assert_eq!(
            Some(String::from("../notes/a.html#intro")),
            convert_link("../notes/a.md#intro")
        );
        assert_eq!(
            Some(String::from("/a.html?x=1")),
            convert_link("/a.md?x=1")
        );
    }

    #[test]
    fn test_convert_leaves_others_alone() {
        assert_eq!(None, convert_link("https://example.org/readme.md"));
        assert_eq!(None, convert_link("mailto:me@example.org"));
        assert_eq!(None, convert_link("pic.png"));
        assert_eq!(None, convert_link("#section"));
        assert_eq!(None, convert_link("notes.md.bak"));
    }

    #[test]
    fn test_to_html_rewrites_links_and_styles_images() {
        let mut out = String::new();
        to_html(&mut out, "See [a](a.md) and ![pic](img/p.png)").unwrap();
        assert!(out.contains(r#"<a href="a.html">a</a>"#), "{}", out);
        assert!(out.contains(r#"<img src="img/p.png" alt="pic""#), "{}", out);
        assert!(out.contains("cursor: pointer"), "{}", out);
    }

    #[test]
    fn test_to_html_tables() {
        let mut out = String::new();
        to_html(&mut out, "| a | b |\n|---|:-:|\n| 1 | 2 |\n").unwrap();
        assert!(out.contains("<table><thead><tr><th>a</th>"), "{}", out);
        assert!(out.contains(r#"<td style="text-align: center">2</td>"#), "{}", out);
    }
}
