//! Markdown renderer driven by pulldown-cmark events.

use std::fmt::Write;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::hooks::RenderHooks;
use crate::state::{
    CodeBlockState, FigureState, HeadingState, ImageState, PendingImage, TableState, escape_html,
};

const PARAGRAPH_OPEN: &str = "<p>";

/// Parser options used for content documents.
#[must_use]
pub fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_DEFINITION_LIST
        | Options::ENABLE_HEADING_ATTRIBUTES
        | Options::ENABLE_TASKLISTS
}

/// Markdown renderer with caller-supplied hooks.
///
/// Block elements are terminated with a newline, single line breaks inside a
/// paragraph are kept as `<br />`, and headings receive unique `id`
/// attributes (an explicit `{#id}` wins over the generated slug).
pub struct MarkdownRenderer<'h, H: RenderHooks + ?Sized> {
    hooks: &'h H,
    output: String,
    code: CodeBlockState,
    table: TableState,
    image: ImageState,
    heading: HeadingState,
    figure: FigureState,
}

impl<'h, H: RenderHooks + ?Sized> MarkdownRenderer<'h, H> {
    /// Create a renderer that calls back into `hooks`.
    pub fn new(hooks: &'h H) -> Self {
        Self {
            hooks,
            output: String::with_capacity(4096),
            code: CodeBlockState::default(),
            table: TableState::default(),
            image: ImageState::default(),
            heading: HeadingState::default(),
            figure: FigureState::default(),
        }
    }

    /// Parse and render a markdown string to HTML.
    pub fn render(&mut self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, parser_options());
        self.render_events(parser)
    }

    /// Render markdown events and return the HTML.
    pub fn render_events<'a, I>(&mut self, events: I) -> String
    where
        I: Iterator<Item = Event<'a>>,
    {
        for event in events {
            self.process_event(event);
        }
        std::mem::take(&mut self.output)
    }

    /// Write to the heading buffer or the output, without marking paragraph content.
    fn emit(&mut self, content: &str) {
        if self.heading.is_active() {
            self.heading.push_html(content);
        } else {
            self.output.push_str(content);
        }
    }

    /// Write inline content that belongs to the current paragraph.
    fn push_inline(&mut self, content: &str) {
        self.figure.push_content(content);
        self.emit(content);
    }

    /// Write inline tag markup. Alt text is plain text, so markup inside an
    /// image is dropped.
    fn inline_tag(&mut self, markup: &str) {
        if !self.image.is_active() {
            self.push_inline(markup);
        }
    }

    fn process_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.inline_code(&code),
            Event::Html(html) => self.output.push_str(&html),
            Event::InlineHtml(html) => self.push_inline(&html),
            Event::SoftBreak => self.soft_break(),
            Event::HardBreak => self.push_inline("<br />\n"),
            Event::Rule => self.output.push_str("<hr />\n"),
            Event::TaskListMarker(checked) => {
                self.push_inline(if checked {
                    r#"<input type="checkbox" checked disabled> "#
                } else {
                    r#"<input type="checkbox" disabled> "#
                });
            }
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {}
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if !self.code.is_active() {
                    self.output.push_str(PARAGRAPH_OPEN);
                    self.figure.start_paragraph(self.output.len());
                }
            }
            Tag::Heading { level, id, .. } => {
                // Opening tag is written in end_tag once the ID is known.
                self.heading
                    .start_heading(heading_level_to_num(level), id.map(|id| id.to_string()));
            }
            Tag::BlockQuote(_) => self.output.push_str("<blockquote>\n"),
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(str::to_owned),
                    CodeBlockKind::Indented => None,
                };
                self.code.start(language);
            }
            Tag::List(start) => match start {
                Some(1) => self.output.push_str("<ol>\n"),
                Some(n) => writeln!(self.output, r#"<ol start="{n}">"#).unwrap(),
                None => self.output.push_str("<ul>\n"),
            },
            Tag::Item => self.output.push_str("<li>"),
            Tag::FootnoteDefinition(_) | Tag::HtmlBlock | Tag::MetadataBlock(_) => {}
            Tag::DefinitionList => self.output.push_str("<dl>\n"),
            Tag::DefinitionListTitle => self.output.push_str("<dt>"),
            Tag::DefinitionListDefinition => self.output.push_str("<dd>"),
            Tag::Table(alignments) => {
                self.table.start(alignments);
                self.output.push_str("<table>\n");
            }
            Tag::TableHead => {
                self.table.start_head();
                self.output.push_str("<thead>\n<tr>");
            }
            Tag::TableRow => {
                self.table.start_row();
                self.output.push_str("<tr>");
            }
            Tag::TableCell => {
                let align = self.table.current_alignment_style();
                let tag = if self.table.is_in_head() { "th" } else { "td" };
                write!(self.output, "<{tag}{align}>").unwrap();
            }
            Tag::Emphasis => self.inline_tag("<em>"),
            Tag::Strong => self.inline_tag("<strong>"),
            Tag::Strikethrough => self.inline_tag("<del>"),
            Tag::Superscript => self.inline_tag("<sup>"),
            Tag::Subscript => self.inline_tag("<sub>"),
            Tag::Link { .. } if self.image.is_active() => {}
            Tag::Link {
                dest_url, title, ..
            } => {
                let mut link = format!(r#"<a href="{}""#, escape_html(&dest_url));
                if !title.is_empty() {
                    write!(link, r#" title="{}""#, escape_html(&title)).unwrap();
                }
                link.push('>');
                self.push_inline(&link);
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                // Alt text arrives as text events; the tag is written in end_tag.
                self.image.start(dest_url.to_string(), title.to_string());
            }
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if !self.code.is_active() {
                    self.end_paragraph();
                }
            }
            TagEnd::Heading(_) => {
                if let Some((level, id, html)) = self.heading.complete_heading() {
                    writeln!(
                        self.output,
                        r#"<h{level} id="{}">{}</h{level}>"#,
                        escape_html(&id),
                        html.trim()
                    )
                    .unwrap();
                }
            }
            TagEnd::BlockQuote(_) => self.output.push_str("</blockquote>\n"),
            TagEnd::CodeBlock => {
                let (language, content) = self.code.end();
                self.hooks
                    .code_block(language.as_deref(), &content, &mut self.output);
                self.output.push('\n');
            }
            TagEnd::List(ordered) => {
                self.output
                    .push_str(if ordered { "</ol>\n" } else { "</ul>\n" });
            }
            TagEnd::Item => self.output.push_str("</li>\n"),
            TagEnd::FootnoteDefinition | TagEnd::HtmlBlock | TagEnd::MetadataBlock(_) => {}
            TagEnd::Image => {
                if let Some(image) = self.image.end() {
                    self.write_image(&image);
                }
            }
            TagEnd::DefinitionList => self.output.push_str("</dl>\n"),
            TagEnd::DefinitionListTitle => self.output.push_str("</dt>\n"),
            TagEnd::DefinitionListDefinition => self.output.push_str("</dd>\n"),
            TagEnd::Table => self.output.push_str("</tbody>\n</table>\n"),
            TagEnd::TableHead => {
                self.output.push_str("</tr>\n</thead>\n<tbody>\n");
                self.table.end_head();
            }
            TagEnd::TableRow => self.output.push_str("</tr>\n"),
            TagEnd::TableCell => {
                self.output.push_str(if self.table.is_in_head() {
                    "</th>"
                } else {
                    "</td>"
                });
                self.table.next_cell();
            }
            TagEnd::Emphasis => self.inline_tag("</em>"),
            TagEnd::Strong => self.inline_tag("</strong>"),
            TagEnd::Strikethrough => self.inline_tag("</del>"),
            TagEnd::Superscript => self.inline_tag("</sup>"),
            TagEnd::Subscript => self.inline_tag("</sub>"),
            TagEnd::Link => self.inline_tag("</a>"),
        }
    }

    /// Close a paragraph, turning a lone titled image into a figure.
    fn end_paragraph(&mut self) {
        let Some((start, title)) = self.figure.end_paragraph() else {
            self.output.push_str("</p>\n");
            return;
        };

        let image = self.output.split_off(start);
        self.output.truncate(start - PARAGRAPH_OPEN.len());
        write!(
            self.output,
            "<div class=\"figure\">\n{}\n<p>{}</p>\n</div>\n",
            image.trim(),
            escape_html(&title)
        )
        .unwrap();
    }

    fn write_image(&mut self, image: &PendingImage) {
        let mut tag = format!(
            r#"<img src="{}" alt="{}""#,
            escape_html(&image.src),
            escape_html(&image.alt)
        );
        if !image.title.is_empty() {
            write!(tag, r#" title="{}""#, escape_html(&image.title)).unwrap();
        }
        if let Some(size) = self.hooks.image_size(&image.src) {
            write!(
                tag,
                r#" width="{}" height="{}""#,
                size.width, size.height
            )
            .unwrap();
        }
        tag.push_str(" />");

        self.figure.push_image(&image.title);
        self.emit(&tag);
    }

    fn text(&mut self, text: &str) {
        // Priority: code > image alt > heading > normal text
        if self.code.is_active() {
            self.code.push_str(text);
            return;
        }

        if self.image.is_active() {
            self.image.push_str(text);
            return;
        }

        if self.heading.is_active() {
            self.heading.push_text(text);
            self.heading.push_html(&escape_html(text));
            return;
        }

        self.push_inline(&escape_html(text));
    }

    fn inline_code(&mut self, code: &str) {
        if self.image.is_active() {
            self.image.push_str(code);
            return;
        }
        if self.heading.is_active() {
            self.heading.push_text(code);
        }
        self.push_inline(&format!("<code>{}</code>", escape_html(code)));
    }

    fn soft_break(&mut self) {
        if self.code.is_active() {
            self.code.push_newline();
        } else if self.image.is_active() {
            self.image.push_str(" ");
        } else {
            self.push_inline("<br />\n");
        }
    }
}

fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::hooks::{DefaultHooks, ImageSize};

    fn render(markdown: &str) -> String {
        MarkdownRenderer::new(&DefaultHooks).render(markdown)
    }

    /// Hooks that report a fixed image size and record code block calls.
    #[derive(Default)]
    struct RecordingHooks {
        code_blocks: RefCell<Vec<(Option<String>, String)>>,
    }

    impl RenderHooks for RecordingHooks {
        fn image_size(&self, src: &str) -> Option<ImageSize> {
            (!src.contains("://")).then_some(ImageSize {
                width: 1020,
                height: 364,
            })
        }

        fn code_block(&self, language: Option<&str>, source: &str, out: &mut String) {
            self.code_blocks
                .borrow_mut()
                .push((language.map(str::to_owned), source.to_owned()));
            out.push_str("<pre>hooked</pre>");
        }
    }

    #[test]
    fn test_heading_with_id() {
        assert_eq!(render("# Heading 1"), "<h1 id=\"heading-1\">Heading 1</h1>\n");
    }

    #[test]
    fn test_heading_explicit_id() {
        assert_eq!(render("## Setup {#install}"), "<h2 id=\"install\">Setup</h2>\n");
    }

    #[test]
    fn test_duplicate_heading_ids() {
        assert_eq!(
            render("## FAQ\n\n## FAQ\n\n## FAQ"),
            "<h2 id=\"faq\">FAQ</h2>\n<h2 id=\"faq-1\">FAQ</h2>\n<h2 id=\"faq-2\">FAQ</h2>\n"
        );
    }

    #[test]
    fn test_heading_with_inline_code() {
        assert_eq!(
            render("## Install `npm`"),
            "<h2 id=\"install-npm\">Install <code>npm</code></h2>\n"
        );
    }

    #[test]
    fn test_paragraph() {
        assert_eq!(render("Hello, world!"), "<p>Hello, world!</p>\n");
    }

    #[test]
    fn test_user_line_breaks() {
        assert_eq!(
            render("line one\nline two"),
            "<p>line one<br />\nline two</p>\n"
        );
    }

    #[test]
    fn test_default_code_block_escapes() {
        let result = render("```html\n<p>hi</p>\n```");
        assert_eq!(
            result,
            "<pre><code class=\"language-html\">&lt;p&gt;hi&lt;/p&gt;\n</code></pre>\n"
        );
    }

    #[test]
    fn test_code_block_goes_to_hook() {
        let hooks = RecordingHooks::default();
        let html = MarkdownRenderer::new(&hooks)
            .render("```rust {.numbered}\nfn main() {}\n```\n\n    indented\n");

        assert_eq!(html, "<pre>hooked</pre>\n<pre>hooked</pre>\n");
        let calls = hooks.code_blocks.borrow();
        assert_eq!(calls[0], (Some("rust".to_owned()), "fn main() {}\n".to_owned()));
        assert_eq!(calls[1], (None, "indented\n".to_owned()));
    }

    #[test]
    fn test_image_without_size() {
        let result = render("![Alt text](image.png)");
        assert_eq!(
            result,
            "<p><img src=\"image.png\" alt=\"Alt text\" /></p>\n"
        );
    }

    #[test]
    fn test_image_size_from_hook() {
        let hooks = RecordingHooks::default();
        let html = MarkdownRenderer::new(&hooks)
            .render("See ![Banner](banner@2x.png) here");
        assert!(html.contains(r#"width="1020""#));
        assert!(html.contains(r#"height="364""#));
        assert!(html.starts_with("<p>See "));
    }

    #[test]
    fn test_image_size_skipped_for_absolute_url() {
        let hooks = RecordingHooks::default();
        let html = MarkdownRenderer::new(&hooks)
            .render("![x](https://example.com/a.png)");
        assert!(!html.contains("width="));
    }

    #[test]
    fn test_titled_image_becomes_figure() {
        let result = render("![Banner](banner.png \"Our banner\")");
        assert_eq!(
            result,
            "<div class=\"figure\">\n\
             <img src=\"banner.png\" alt=\"Banner\" title=\"Our banner\" />\n\
             <p>Our banner</p>\n\
             </div>\n"
        );
    }

    #[test]
    fn test_formatted_alt_text_keeps_figure() {
        let result = render("![*Our* [banner](/b)](banner.png \"Caption\")");
        assert_eq!(
            result,
            "<div class=\"figure\">\n\
             <img src=\"banner.png\" alt=\"Our banner\" title=\"Caption\" />\n\
             <p>Caption</p>\n\
             </div>\n"
        );
    }

    #[test]
    fn test_formatted_alt_text_inline() {
        assert_eq!(
            render("See ![**bold** alt](x.png)"),
            "<p>See <img src=\"x.png\" alt=\"bold alt\" /></p>\n"
        );
    }

    #[test]
    fn test_titled_image_in_text_stays_inline() {
        let result = render("Look: ![Banner](banner.png \"Our banner\")");
        assert!(result.starts_with("<p>Look: <img"));
        assert!(!result.contains("figure"));
    }

    #[test]
    fn test_blockquote_and_lists() {
        assert_eq!(
            render("> Note"),
            "<blockquote>\n<p>Note</p>\n</blockquote>\n"
        );
        assert_eq!(
            render("- Item 1\n- Item 2"),
            "<ul>\n<li>Item 1</li>\n<li>Item 2</li>\n</ul>\n"
        );
        assert!(render("3. Third").starts_with("<ol start=\"3\">\n"));
    }

    #[test]
    fn test_table() {
        let html = render("| A | B |\n|:--|---|\n| 1 | 2 |");
        assert!(html.contains("<th style=\"text-align:left\">A</th><th>B</th>"));
        assert!(html.contains("<tr><td style=\"text-align:left\">1</td><td>2</td></tr>"));
        assert!(html.ends_with("</table>\n"));
    }

    #[test]
    fn test_emphasis_links_and_strikethrough() {
        let html = render("*a* **b** ~~c~~ [d](/e \"f\")");
        assert!(html.contains("<em>a</em>"));
        assert!(html.contains("<strong>b</strong>"));
        assert!(html.contains("<del>c</del>"));
        assert!(html.contains(r#"<a href="/e" title="f">d</a>"#));
    }

    #[test]
    fn test_raw_html_passes_through() {
        let html = render("<div class=\"note\">raw</div>\n");
        assert_eq!(html, "<div class=\"note\">raw</div>\n");
    }

    #[test]
    fn test_task_list() {
        let html = render("- [ ] todo\n- [x] done");
        assert!(html.contains(r#"<input type="checkbox" disabled> todo"#));
        assert!(html.contains(r#"<input type="checkbox" checked disabled> done"#));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(render(""), "");
    }
}
