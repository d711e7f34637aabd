//! Implements a custom HTML serializer for markdown [`Event`]s. It renders
//! the same markup as [`pulldown_cmark::html::push_html`] except that image
//! elements are decorated for presentation: they get a bounded, centered
//! display style and open their own source in a new tab when clicked.

use pulldown_cmark::escape::{escape_href, escape_html, StrWrite};
use pulldown_cmark::{Alignment, CodeBlockKind, CowStr, Event, LinkType, Tag};
use std::fmt::{self, Display};
use std::io;

/// The inline style applied to every image in a post body.
pub const IMAGE_STYLE: &str =
    "width: 90%; max-width: 800px; display: block; margin: 20px auto; cursor: pointer;";

/// The click handler applied to every image in a post body.
pub const IMAGE_ONCLICK: &str = "window.open(this.getAttribute('src'), '_blank')";

struct Adaptor<'a, T> {
    formatter: &'a mut T,
    result: fmt::Result,
}

impl<T> Adaptor<'_, T> {
    fn handle_result(&mut self, result: fmt::Result) -> io::Result<()> {
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                self.result = result;
                Err(io::Error::new(io::ErrorKind::Other, e))
            }
        }
    }
}

impl<T: fmt::Write> StrWrite for Adaptor<'_, T> {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        let result = self.formatter.write_str(s);
        self.handle_result(result)
    }

    fn write_fmt(&mut self, args: fmt::Arguments) -> io::Result<()> {
        let result = self.formatter.write_fmt(args);
        self.handle_result(result)
    }
}

/// Wraps a URL so that it is percent- and HTML-escaped when displayed.
pub struct EscapeHref<'a>(pub &'a str);

impl Display for EscapeHref<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adaptor = Adaptor {
            formatter: f,
            result: Ok(()),
        };
        let _ = escape_href(&mut adaptor, self.0);
        adaptor.result
    }
}

/// Wraps a string so that it is HTML-escaped when displayed.
pub struct EscapeHtml<'a>(pub &'a str);

impl Display for EscapeHtml<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adaptor = Adaptor {
            formatter: f,
            result: Ok(()),
        };
        let _ = escape_html(&mut adaptor, self.0);
        adaptor.result
    }
}

enum TableState {
    Head,
    Body,
}

/// An image whose `alt` text is still being collected. The opening of the
/// `<img` tag has already been written.
struct PendingImage {
    title: String,

    /// How many tags deep we are inside the image's alt text.
    nesting: usize,
}

/// Renders markdown [`Event`]s into HTML. This is largely modeled after
/// [`pulldown_cmark`]'s private `HtmlWriter` struct.
pub struct HtmlRenderer {
    table_alignments: Vec<Alignment>,
    table_state: TableState,
    table_cell_index: usize,
    image: Option<PendingImage>,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlRenderer {
    pub fn new() -> Self {
        HtmlRenderer {
            table_alignments: Vec::default(),
            table_state: TableState::Head,
            table_cell_index: usize::default(),
            image: None,
        }
    }

    /// Writes a single event. Events between the start and end of an image
    /// are flattened into the image's `alt` attribute.
    pub fn on_event<'a, W: StrWrite>(&mut self, w: &mut W, event: Event<'a>) -> io::Result<()> {
        if self.image.is_some() {
            return self.on_alt_event(w, event);
        }
        match event {
            Event::Start(tag) => self.on_start(w, tag),
            Event::End(tag) => self.on_end(w, tag),
            Event::Code(code) => write!(w, "<code>{}</code>", EscapeHtml(&code)),
            Event::FootnoteReference(name) => write!(
                w,
                r##"<sup class="footnote-reference"><a href="#{}">{}</a></sup>"##,
                EscapeHtml(&name),
                EscapeHtml(&name),
            ),
            Event::HardBreak => w.write_str("<br />\n"),
            Event::Html(html) => w.write_str(&html),
            Event::Rule => w.write_str("<hr />\n"),
            Event::SoftBreak => w.write_str("\n"),
            Event::TaskListMarker(checked) => write!(
                w,
                r#"<input disabled="" type="checkbox" {}/>"#,
                match checked {
                    true => r#"checked="" "#,
                    false => "",
                }
            ),
            Event::Text(text) => escape_html(w, &text),
        }
    }

    fn on_alt_event<'a, W: StrWrite>(&mut self, w: &mut W, event: Event<'a>) -> io::Result<()> {
        let image = match self.image.as_mut() {
            Some(image) => image,
            None => return Ok(()),
        };
        match event {
            Event::Start(_) => {
                image.nesting += 1;
                Ok(())
            }
            Event::End(_) if image.nesting > 0 => {
                image.nesting -= 1;
                Ok(())
            }
            Event::End(_) => {
                let title = std::mem::take(&mut image.title);
                self.image = None;
                self.close_image(w, &title)
            }
            Event::Text(text) | Event::Code(text) | Event::Html(text) => escape_html(w, &text),
            Event::SoftBreak | Event::HardBreak => w.write_str(" "),
            _ => Ok(()),
        }
    }

    fn close_image<W: StrWrite>(&mut self, w: &mut W, title: &str) -> io::Result<()> {
        w.write_str("\"")?;
        if !title.is_empty() {
            write!(w, r#" title="{}""#, EscapeHtml(title))?;
        }
        write!(
            w,
            r#" style="{}" onclick="{}" />"#,
            IMAGE_STYLE,
            EscapeHtml(IMAGE_ONCLICK),
        )
    }

    fn on_start<'a, W: StrWrite>(&mut self, w: &mut W, tag: Tag<'a>) -> io::Result<()> {
        match tag {
            Tag::BlockQuote => w.write_str("<blockquote>\n"),
            Tag::CodeBlock(kind) => match kind {
                CodeBlockKind::Fenced(info) => match info.split(' ').next() {
                    Some(lang) if !lang.is_empty() => {
                        write!(w, r#"<pre><code class="language-{}">"#, EscapeHtml(lang))
                    }
                    _ => w.write_str("<pre><code>"),
                },
                CodeBlockKind::Indented => w.write_str("<pre><code>"),
            },
            Tag::Emphasis => w.write_str("<em>"),
            Tag::FootnoteDefinition(name) => write!(
                w,
                r#"<div class="footnote-definition" id="{}"><sup class="footnote-definition-label">{}</sup>"#,
                EscapeHtml(&name),
                EscapeHtml(&name),
            ),
            Tag::Heading(size) => write!(w, "<h{}>", size),
            Tag::Image(_link_type, dest, title) => {
                write!(w, r#"<img src="{}" alt=""#, EscapeHtml(&dest))?;
                self.image = Some(PendingImage {
                    title: title.to_string(),
                    nesting: 0,
                });
                Ok(())
            }
            Tag::Item => w.write_str("<li>"),
            Tag::Link(LinkType::Email, dest, title) => {
                write!(w, r#"<a href="mailto:{}""#, EscapeHref(&dest))?;
                self.close_link(w, &title)
            }
            Tag::Link(_link_type, dest, title) => {
                write!(w, r#"<a href="{}""#, EscapeHref(&dest))?;
                self.close_link(w, &title)
            }
            Tag::List(None) => w.write_str("<ul>\n"),
            Tag::List(Some(1)) => w.write_str("<ol>\n"),
            Tag::List(Some(start)) => write!(w, "<ol start=\"{}\">\n", start),
            Tag::Paragraph => w.write_str("<p>"),
            Tag::Strikethrough => w.write_str("<del>"),
            Tag::Strong => w.write_str("<strong>"),
            Tag::Table(alignments) => {
                self.table_alignments = alignments;
                w.write_str("<table>")
            }
            Tag::TableHead => {
                self.table_state = TableState::Head;
                self.table_cell_index = 0;
                w.write_str("<thead><tr>")
            }
            Tag::TableRow => {
                self.table_cell_index = 0;
                w.write_str("<tr>")
            }
            Tag::TableCell => write!(
                w,
                "<{}{}>",
                match self.table_state {
                    TableState::Head => "th",
                    TableState::Body => "td",
                },
                match self.table_alignments.get(self.table_cell_index) {
                    Some(Alignment::Left) => r#" style="text-align: left""#,
                    Some(Alignment::Right) => r#" style="text-align: right""#,
                    Some(Alignment::Center) => r#" style="text-align: center""#,
                    _ => "",
                }
            ),
        }
    }

    fn close_link<W: StrWrite>(&mut self, w: &mut W, title: &CowStr) -> io::Result<()> {
        if !title.is_empty() {
            write!(w, r#" title="{}""#, EscapeHtml(title))?;
        }
        w.write_str(">")
    }

    fn on_end<'a, W: StrWrite>(&mut self, w: &mut W, tag: Tag<'a>) -> io::Result<()> {
        match tag {
            Tag::BlockQuote => w.write_str("</blockquote>\n"),
            Tag::CodeBlock(_) => w.write_str("</code></pre>\n"),
            Tag::Emphasis => w.write_str("</em>"),
            Tag::FootnoteDefinition(_) => w.write_str("</div>\n"),
            Tag::Heading(level) => write!(w, "</h{}>\n", level),
            // closed in `on_alt_event`
            Tag::Image(_, _, _) => Ok(()),
            Tag::Item => w.write_str("</li>\n"),
            Tag::Link(_, _, _) => w.write_str("</a>"),
            Tag::List(Some(_)) => w.write_str("</ol>\n"),
            Tag::List(None) => w.write_str("</ul>\n"),
            Tag::Paragraph => w.write_str("</p>\n"),
            Tag::Strikethrough => w.write_str("</del>"),
            Tag::Strong => w.write_str("</strong>"),
            Tag::Table(_) => w.write_str("</tbody></table>\n"),
            Tag::TableHead => {
                self.table_state = TableState::Body;
                w.write_str("</tr></thead><tbody>\n")
            }
            Tag::TableRow => w.write_str("</tr>\n"),
            Tag::TableCell => {
                self.table_cell_index += 1;
                w.write_str(match self.table_state {
                    TableState::Head => "</th>",
                    TableState::Body => "</td>",
                })
            }
        }
    }
}

/// Converts [`Event`]s into an HTML string much like
/// `pulldown_cmark::html::push_html`, with image styling applied.
pub fn push_html<'a, I>(out: &mut String, events: I) -> io::Result<()>
where
    I: Iterator<Item = Event<'a>>,
{
    let mut renderer = HtmlRenderer::new();
    for event in events {
        renderer.on_event(out, event)?;
    }
    Ok(())
}
