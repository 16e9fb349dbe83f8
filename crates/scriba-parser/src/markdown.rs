//! Markdown parser using pulldown-cmark.

use std::path::Path;

use pulldown_cmark::{
    Alignment, BlockQuoteKind, CodeBlockKind, Event, Options, Parser, Tag, TagEnd, TextMergeStream,
};
use scriba_core::{
    Slugger,
    content::{ParsedContent, TocEntry},
    frontmatter::{Frontmatter, parse_frontmatter},
};
use thiserror::Error;

use crate::{
    citation::{Bibliography, CitationProcessor},
    html_escape, mdx,
    syntax::SyntaxHighlighter,
};

/// Markdown parsing errors.
#[derive(Debug, Error)]
pub enum MarkdownError {
    /// Failed to parse front matter.
    #[error("frontmatter error: {0}")]
    Frontmatter(#[from] scriba_core::error::CoreError),
}

/// Result type for markdown operations.
pub type Result<T> = std::result::Result<T, MarkdownError>;

/// Markdown parser with syntax highlighting support.
#[derive(Debug)]
pub struct MarkdownParser {
    highlighter: SyntaxHighlighter,
    options: Options,
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownParser {
    /// Create a new markdown parser with default options.
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        options.insert(Options::ENABLE_MATH);
        options.insert(Options::ENABLE_GFM);

        Self {
            highlighter: SyntaxHighlighter::new(),
            options,
        }
    }

    pub fn highlighter(&self) -> &SyntaxHighlighter {
        &self.highlighter
    }

    /// Parse a Markdown post with front matter.
    pub fn parse(&self, content: &str, path: &Path) -> Result<ParsedContent> {
        let (frontmatter, body) = parse_frontmatter(content, path)?;
        let (html, toc) = self.render_post(&frontmatter, &body, path);

        Ok(ParsedContent {
            frontmatter,
            html,
            raw: body,
            toc,
        })
    }

    /// Parse an MDX post with front matter.
    pub fn parse_mdx(&self, content: &str, path: &Path) -> Result<ParsedContent> {
        let (frontmatter, body) = parse_frontmatter(content, path)?;
        let source = mdx::prepare(&body);
        let (mut html, toc) = self.render_post(&frontmatter, &source.body, path);

        if let Some(options) = &source.toc_inline {
            html = html.replace(mdx::TOC_PLACEHOLDER, &options.render(&toc));
        }

        Ok(ParsedContent {
            frontmatter,
            html,
            raw: source.body,
            toc,
        })
    }

    /// Render a Markdown body without front matter or citations.
    pub fn render(&self, body: &str) -> (String, Vec<TocEntry>) {
        self.render_markdown(body, None)
    }

    fn render_post(
        &self,
        frontmatter: &Frontmatter,
        body: &str,
        path: &Path,
    ) -> (String, Vec<TocEntry>) {
        let Some(name) = frontmatter.bibliography.as_deref() else {
            return self.render_markdown(body, None);
        };

        let bibliography =
            Bibliography::resolve(path, name).and_then(|file| Bibliography::from_file(&file));
        match bibliography {
            Ok(bibliography) => {
                let mut citations = CitationProcessor::new(&bibliography);
                let (mut html, toc) = self.render_markdown(body, Some(&mut citations));
                if let Some(references) = citations.references_html() {
                    html.push_str(&references);
                }
                tracing::debug!(
                    path = %path.display(),
                    cited = citations.cited().len(),
                    "rendered citations"
                );
                (html, toc)
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "rendering without citations");
                self.render_markdown(body, None)
            }
        }
    }

    /// Render markdown to HTML with TOC extraction.
    fn render_markdown(
        &self,
        content: &str,
        mut citations: Option<&mut CitationProcessor<'_>>,
    ) -> (String, Vec<TocEntry>) {
        let parser = TextMergeStream::new(Parser::new_ext(content, self.options));
        let mut out = Output::default();
        let mut toc = Vec::new();
        let mut slugger = Slugger::new();

        let mut code_block: Option<CodeBlock> = None;
        let mut image: Option<Image> = None;
        let mut table = TableState::default();

        for event in parser {
            if let Some(img) = image.as_mut() {
                match event {
                    Event::Text(text) | Event::Code(text) => img.alt.push_str(&text),
                    Event::End(TagEnd::Image) => {
                        if let Some(img) = image.take() {
                            out.push(&img.to_html());
                        }
                    }
                    _ => {}
                }
                continue;
            }

            if let Some(block) = code_block.as_mut() {
                match event {
                    Event::Text(text) => block.code.push_str(&text),
                    Event::End(TagEnd::CodeBlock) => {
                        if let Some(block) = code_block.take() {
                            out.push(&block.to_html(&self.highlighter));
                        }
                    }
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::Heading {
                    level, id, classes, ..
                }) => {
                    out.heading = Some(Heading {
                        level: level as u8,
                        id: id.map(|i| i.to_string()),
                        classes: classes.iter().map(|c| c.to_string()).collect(),
                        text: String::new(),
                        inner: String::new(),
                    });
                }

                Event::End(TagEnd::Heading(_)) => {
                    if let Some(heading) = out.heading.take() {
                        let text = heading.text.trim().to_string();
                        let id = heading.id.clone().unwrap_or_else(|| slugger.slug(&text));
                        out.push(&heading.to_html(&id));
                        toc.push(TocEntry {
                            level: heading.level,
                            text,
                            id,
                        });
                    }
                }

                Event::Start(Tag::CodeBlock(kind)) => {
                    code_block = Some(CodeBlock::new(&kind));
                }

                Event::Start(Tag::Image {
                    dest_url, title, ..
                }) => {
                    image = Some(Image {
                        src: dest_url.to_string(),
                        title: title.to_string(),
                        alt: String::new(),
                    });
                }

                Event::Text(text) => {
                    out.heading_text(&text);
                    let html = match citations.as_deref_mut() {
                        Some(processor) => processor.render_text(&text),
                        None => html_escape(&text),
                    };
                    out.push(&html);
                }

                Event::Code(code) => {
                    out.heading_text(&code);
                    out.push(&format!("<code>{}</code>", html_escape(&code)));
                }

                Event::InlineMath(math) => {
                    out.heading_text(&math);
                    out.push(&format!(
                        "<span class=\"math math-inline\">{}</span>",
                        html_escape(&math)
                    ));
                }

                Event::DisplayMath(math) => {
                    out.push(&format!(
                        "<div class=\"math math-display\">{}</div>",
                        html_escape(&math)
                    ));
                }

                Event::SoftBreak => out.push("\n"),
                Event::HardBreak => out.push("<br />\n"),
                Event::Rule => out.push("<hr />\n"),

                Event::Html(raw) | Event::InlineHtml(raw) => out.push(&raw),

                Event::FootnoteReference(name) => {
                    let name = html_escape(&name);
                    out.push(&format!(
                        "<sup class=\"footnote-ref\"><a href=\"#fn-{name}\" id=\"fnref-{name}\">[{name}]</a></sup>"
                    ));
                }

                Event::TaskListMarker(checked) => {
                    out.push(if checked {
                        "<input type=\"checkbox\" checked disabled /> "
                    } else {
                        "<input type=\"checkbox\" disabled /> "
                    });
                }

                Event::Start(tag) => {
                    let html = table.start(&tag).unwrap_or_else(|| tag_to_html_start(&tag));
                    out.push(&html);
                }

                Event::End(tag) => {
                    let html = table.end(&tag).unwrap_or_else(|| tag_to_html_end(&tag));
                    out.push(&html);
                }
            }
        }

        (out.html, toc)
    }
}

#[derive(Debug, Default)]
struct Output {
    html: String,
    heading: Option<Heading>,
}

impl Output {
    fn push(&mut self, s: &str) {
        match self.heading.as_mut() {
            Some(heading) => heading.inner.push_str(s),
            None => self.html.push_str(s),
        }
    }

    fn heading_text(&mut self, s: &str) {
        if let Some(heading) = self.heading.as_mut() {
            heading.text.push_str(s);
        }
    }
}

#[derive(Debug)]
struct Heading {
    level: u8,
    id: Option<String>,
    classes: Vec<String>,
    text: String,
    inner: String,
}

impl Heading {
    fn to_html(&self, id: &str) -> String {
        let class_attr = if self.classes.is_empty() {
            String::new()
        } else {
            format!(" class=\"{}\"", html_escape(&self.classes.join(" ")))
        };
        let id = html_escape(id);
        format!(
            "<h{lvl} id=\"{id}\"{class_attr}><a class=\"heading-anchor\" href=\"#{id}\" aria-hidden=\"true\" tabindex=\"-1\"></a>{inner}</h{lvl}>\n",
            lvl = self.level,
            inner = self.inner
        )
    }
}

#[derive(Debug)]
struct CodeBlock {
    lang: Option<String>,
    title: Option<String>,
    code: String,
}

impl CodeBlock {
    /// `rust:src/main.rs` selects the grammar and adds a title.
    fn new(kind: &CodeBlockKind<'_>) -> Self {
        let info = match kind {
            CodeBlockKind::Fenced(info) => info.split_whitespace().next().unwrap_or_default(),
            CodeBlockKind::Indented => "",
        };

        let (lang, title) = match info.split_once(':') {
            Some((lang, title)) => (lang, Some(title.to_string()).filter(|t| !t.is_empty())),
            None => (info, None),
        };

        Self {
            lang: Some(lang.to_string()).filter(|l| !l.is_empty()),
            title,
            code: String::new(),
        }
    }

    fn to_html(&self, highlighter: &SyntaxHighlighter) -> String {
        let highlighted = highlighter.highlight(&self.code, self.lang.as_deref());
        match &self.title {
            Some(title) => format!(
                "<div class=\"code-title\">{}</div>{highlighted}\n",
                html_escape(title)
            ),
            None => format!("{highlighted}\n"),
        }
    }
}

#[derive(Debug)]
struct Image {
    src: String,
    title: String,
    alt: String,
}

impl Image {
    fn to_html(&self) -> String {
        let title_attr = if self.title.is_empty() {
            String::new()
        } else {
            format!(" title=\"{}\"", html_escape(&self.title))
        };
        format!(
            "<img src=\"{}\" alt=\"{}\"{title_attr} loading=\"lazy\" />",
            html_escape(&self.src),
            html_escape(&self.alt)
        )
    }
}

/// Column alignment and header state of the table being rendered.
#[derive(Debug, Default)]
struct TableState {
    alignments: Vec<Alignment>,
    in_head: bool,
    cell: usize,
}

impl TableState {
    fn cell_tag(&self) -> &'static str {
        if self.in_head { "th" } else { "td" }
    }

    fn start(&mut self, tag: &Tag<'_>) -> Option<String> {
        match tag {
            Tag::Table(alignments) => {
                self.alignments = alignments.clone();
                Some("<table>".to_string())
            }
            Tag::TableHead => {
                self.in_head = true;
                self.cell = 0;
                Some("<thead><tr>".to_string())
            }
            Tag::TableRow => {
                self.cell = 0;
                Some("<tr>".to_string())
            }
            Tag::TableCell => {
                let style = match self.alignments.get(self.cell) {
                    Some(Alignment::Left) => " style=\"text-align: left\"",
                    Some(Alignment::Center) => " style=\"text-align: center\"",
                    Some(Alignment::Right) => " style=\"text-align: right\"",
                    _ => "",
                };
                Some(format!("<{}{style}>", self.cell_tag()))
            }
            _ => None,
        }
    }

    fn end(&mut self, tag: &TagEnd) -> Option<String> {
        match tag {
            TagEnd::Table => {
                self.alignments.clear();
                Some("</tbody></table>\n".to_string())
            }
            TagEnd::TableHead => {
                self.in_head = false;
                Some("</tr></thead><tbody>\n".to_string())
            }
            TagEnd::TableRow => Some("</tr>\n".to_string()),
            TagEnd::TableCell => {
                let close = format!("</{}>", self.cell_tag());
                self.cell += 1;
                Some(close)
            }
            _ => None,
        }
    }
}

fn alert_title(kind: BlockQuoteKind) -> (&'static str, &'static str) {
    match kind {
        BlockQuoteKind::Note => ("note", "Note"),
        BlockQuoteKind::Tip => ("tip", "Tip"),
        BlockQuoteKind::Important => ("important", "Important"),
        BlockQuoteKind::Warning => ("warning", "Warning"),
        BlockQuoteKind::Caution => ("caution", "Caution"),
    }
}

fn is_external(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Convert a pulldown-cmark tag to HTML opening tag.
fn tag_to_html_start(tag: &Tag) -> String {
    match tag {
        Tag::Paragraph => "<p>".to_string(),
        Tag::BlockQuote(Some(kind)) => {
            let (class, title) = alert_title(*kind);
            format!(
                "<div class=\"markdown-alert markdown-alert-{class}\"><p class=\"markdown-alert-title\">{title}</p>\n"
            )
        }
        Tag::BlockQuote(None) => "<blockquote>\n".to_string(),
        Tag::List(Some(1)) => "<ol>\n".to_string(),
        Tag::List(Some(start)) => format!("<ol start=\"{start}\">\n"),
        Tag::List(None) => "<ul>\n".to_string(),
        Tag::Item => "<li>".to_string(),
        Tag::FootnoteDefinition(name) => {
            format!(
                "<div class=\"footnote-definition\" id=\"fn-{}\">",
                html_escape(name)
            )
        }
        Tag::Emphasis => "<em>".to_string(),
        Tag::Strong => "<strong>".to_string(),
        Tag::Strikethrough => "<del>".to_string(),
        Tag::Link {
            dest_url, title, ..
        } => {
            let title_attr = if title.is_empty() {
                String::new()
            } else {
                format!(" title=\"{}\"", html_escape(title))
            };
            let target = if is_external(dest_url) {
                " target=\"_blank\" rel=\"noopener noreferrer\""
            } else {
                ""
            };
            format!("<a href=\"{}\"{title_attr}{target}>", html_escape(dest_url))
        }
        Tag::DefinitionList => "<dl>".to_string(),
        Tag::DefinitionListTitle => "<dt>".to_string(),
        Tag::DefinitionListDefinition => "<dd>".to_string(),
        Tag::Superscript => "<sup>".to_string(),
        Tag::Subscript => "<sub>".to_string(),
        Tag::Heading { .. }
        | Tag::CodeBlock(_)
        | Tag::Image { .. }
        | Tag::Table(_)
        | Tag::TableHead
        | Tag::TableRow
        | Tag::TableCell
        | Tag::HtmlBlock
        | Tag::MetadataBlock(_) => String::new(),
    }
}

/// Convert a pulldown-cmark tag end to HTML closing tag.
fn tag_to_html_end(tag: &TagEnd) -> String {
    match tag {
        TagEnd::Paragraph => "</p>\n".to_string(),
        TagEnd::BlockQuote(Some(_)) => "</div>\n".to_string(),
        TagEnd::BlockQuote(None) => "</blockquote>\n".to_string(),
        TagEnd::List(true) => "</ol>\n".to_string(),
        TagEnd::List(false) => "</ul>\n".to_string(),
        TagEnd::Item => "</li>\n".to_string(),
        TagEnd::FootnoteDefinition => "</div>\n".to_string(),
        TagEnd::Emphasis => "</em>".to_string(),
        TagEnd::Strong => "</strong>".to_string(),
        TagEnd::Strikethrough => "</del>".to_string(),
        TagEnd::Link => "</a>".to_string(),
        TagEnd::DefinitionList => "</dl>\n".to_string(),
        TagEnd::DefinitionListTitle => "</dt>\n".to_string(),
        TagEnd::DefinitionListDefinition => "</dd>\n".to_string(),
        TagEnd::Superscript => "</sup>".to_string(),
        TagEnd::Subscript => "</sub>".to_string(),
        TagEnd::Heading(_)
        | TagEnd::CodeBlock
        | TagEnd::Image
        | TagEnd::Table
        | TagEnd::TableHead
        | TagEnd::TableRow
        | TagEnd::TableCell
        | TagEnd::HtmlBlock
        | TagEnd::MetadataBlock(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BIB: &str = "@article{Nash1950,\n  author = {Nash, John F},\n  title = {Equilibrium points in n-person games},\n  year = {1950}\n}\n";

    #[test]
    fn test_parse_simple_markdown() {
        let parser = MarkdownParser::new();
        let content = r#"---
title: "Test Post"
---

# Hello World

This is a test."#;

        let result = parser.parse(content, Path::new("test.md")).unwrap();

        assert_eq!(result.frontmatter.title, "Test Post");
        assert!(result.html.contains("<h1 id=\"hello-world\">"));
        assert!(result.html.contains("<p>This is a test.</p>"));
        assert_eq!(result.raw, "# Hello World\n\nThis is a test.");
    }

    #[test]
    fn test_heading_ids_and_anchors() {
        let parser = MarkdownParser::new();
        let (html, toc) = parser.render("## Intro\n\n## Intro\n\n### Custom {#my-id}\n");

        assert!(html.contains("<h2 id=\"intro\"><a class=\"heading-anchor\" href=\"#intro\""));
        assert!(html.contains("<h2 id=\"intro-1\">"));
        assert!(html.contains("<h3 id=\"my-id\">"));
        assert_eq!(
            toc.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
            vec!["intro", "intro-1", "my-id"]
        );
        assert_eq!(toc[2].text, "Custom");
    }

    #[test]
    fn test_heading_with_inline_code() {
        let parser = MarkdownParser::new();
        let (html, toc) = parser.render("## Using `cargo` today\n");

        assert_eq!(toc[0].text, "Using cargo today");
        assert_eq!(toc[0].id, "using-cargo-today");
        assert!(html.contains("<code>cargo</code>"));
    }

    #[test]
    fn test_parse_code_block() {
        let parser = MarkdownParser::new();
        let (html, _) = parser.render("```rust\nfn main() {\n    println!(\"Hello\");\n}\n```\n");

        assert!(html.contains("<pre class=\"hl-code language-rust\">"));
        assert!(html.contains("main"));
    }

    #[test]
    fn test_code_title() {
        let parser = MarkdownParser::new();
        let (html, _) = parser.render("```js:utils/index.js\nconst a = 1\n```\n");

        assert!(html.contains("<div class=\"code-title\">utils/index.js</div>"));
        assert!(html.contains("language-js"));
    }

    #[test]
    fn test_math() {
        let parser = MarkdownParser::new();
        let (html, _) = parser.render("Inline $a < b$ and\n\n$$\\sum_i x_i$$\n");

        assert!(html.contains("<span class=\"math math-inline\">a &lt; b</span>"));
        assert!(html.contains("<div class=\"math math-display\">\\sum_i x_i</div>"));
    }

    #[test]
    fn test_toc_extraction() {
        let parser = MarkdownParser::new();
        let (_, toc) = parser.render(
            r#"# Heading 1
## Heading 2
### Heading 3"#,
        );

        assert_eq!(toc.len(), 3);
        assert_eq!(toc[0].level, 1);
        assert_eq!(toc[0].text, "Heading 1");
        assert_eq!(toc[1].level, 2);
        assert_eq!(toc[2].level, 3);
    }

    #[test]
    fn test_table_rendering() {
        let parser = MarkdownParser::new();
        let (html, _) = parser.render(
            r#"| Header 1 | Header 2 |
|----------|---------:|
| Cell 1   | Cell 2   |"#,
        );

        assert!(html.contains("<table>"));
        assert!(html.contains("<thead><tr><th>Header 1</th>"));
        assert!(html.contains("<th style=\"text-align: right\">Header 2</th>"));
        assert!(html.contains("<td>Cell 1</td>"));
        assert!(html.contains("</tbody></table>"));
    }

    #[test]
    fn test_task_list() {
        let parser = MarkdownParser::new();
        let (html, _) = parser.render(
            r#"- [x] Done
- [ ] Not done"#,
        );

        assert!(html.contains("checkbox"));
        assert!(html.contains("checked"));
    }

    #[test]
    fn test_image_alt_and_links() {
        let parser = MarkdownParser::new();
        let (html, _) = parser.render(
            "![An *ocean* view](/static/ocean.jpg \"Ocean\")\n\n[docs](https://example.com) and [home](/)\n",
        );

        assert!(html.contains(
            "<img src=\"/static/ocean.jpg\" alt=\"An ocean view\" title=\"Ocean\" loading=\"lazy\" />"
        ));
        assert!(html.contains(
            "<a href=\"https://example.com\" target=\"_blank\" rel=\"noopener noreferrer\">docs</a>"
        ));
        assert!(html.contains("<a href=\"/\">home</a>"));
    }

    #[test]
    fn test_gfm_alert() {
        let parser = MarkdownParser::new();
        let (html, _) = parser.render("> [!NOTE]\n> Useful information.\n");

        assert!(html.contains("markdown-alert-note"));
        assert!(html.contains("Useful information."));
    }

    #[test]
    fn test_citations_with_bibliography() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("refs.bib"), BIB).unwrap();
        let post = dir.path().join("post.md");

        let parser = MarkdownParser::new();
        let content = "---\ntitle: Games\nbibliography: refs.bib\n---\n\nAs shown [@Nash1950], and [@missing].\n\n`[@Nash1950]`\n";
        let result = parser.parse(content, &post).unwrap();

        assert!(result.html.contains("<a href=\"#ref-Nash1950\">Nash, 1950</a>"));
        assert!(result.html.contains("[@missing]"));
        assert!(result.html.contains("<code>[@Nash1950]</code>"));
        assert!(result.html.contains("<div id=\"refs\""));
    }

    #[test]
    fn test_missing_bibliography_renders_plain() {
        let dir = tempfile::tempdir().unwrap();
        let parser = MarkdownParser::new();
        let content = "---\ntitle: Games\nbibliography: nowhere.bib\n---\n\nAs shown [@Nash1950].\n";
        let result = parser.parse(content, &dir.path().join("post.md")).unwrap();

        assert!(result.html.contains("[@Nash1950]"));
        assert!(!result.html.contains("refs"));
    }

    #[test]
    fn test_missing_title_fails() {
        let parser = MarkdownParser::new();
        let content = "# Just Content\n\nNo frontmatter here.";
        let result = parser.parse(content, Path::new("test.md"));

        assert!(matches!(result, Err(MarkdownError::Frontmatter(_))));
    }

    #[test]
    fn test_render_without_frontmatter() {
        let parser = MarkdownParser::new();
        let (html, _) = parser.render("## Bio\n\nWrites about weather.");
        assert!(html.contains("<h2 id=\"bio\">"));
    }
}
