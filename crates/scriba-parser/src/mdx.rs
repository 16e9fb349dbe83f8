//! MDX source preparation.
//!
//! Posts are rendered as Markdown. Module-level `import`/`export` statements
//! are dropped and `<TOCInline />` is replaced by the rendered table of
//! contents. Other JSX elements pass through as raw HTML.

use std::sync::LazyLock;

use regex::Regex;
use scriba_core::content::TocEntry;

use crate::html_escape;

/// Placeholder left where a `<TOCInline />` stood.
pub const TOC_PLACEHOLDER: &str = "<!-- scriba:toc-inline -->";

static TOC_INLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<TOCInline\b(.*?)/>").unwrap());

static PROP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\w+)(?:=(?:"([^"]*)"|\{([^}]*)\}))?"#).unwrap()
});

/// Options of a `<TOCInline />` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocInlineOptions {
    pub from_heading: u8,
    pub to_heading: u8,
    pub exclude: Vec<String>,
    pub as_disclosure: bool,
}

impl Default for TocInlineOptions {
    fn default() -> Self {
        Self {
            from_heading: 1,
            to_heading: 6,
            exclude: Vec::new(),
            as_disclosure: false,
        }
    }
}

impl TocInlineOptions {
    fn from_props(props: &str) -> Self {
        let mut options = Self::default();

        for caps in PROP_RE.captures_iter(props) {
            let Some(name) = caps.get(1).map(|m| m.as_str()) else {
                continue;
            };
            let string_value = caps.get(2).map(|m| m.as_str());
            let expr_value = caps.get(3).map(|m| m.as_str().trim());

            match name {
                "fromHeading" => {
                    if let Some(level) = expr_value.and_then(|v| v.parse().ok()) {
                        options.from_heading = level;
                    }
                }
                "toHeading" => {
                    if let Some(level) = expr_value.and_then(|v| v.parse().ok()) {
                        options.to_heading = level;
                    }
                }
                "exclude" => {
                    if let Some(value) = string_value {
                        options.exclude = vec![value.to_string()];
                    } else if let Some(list) = expr_value {
                        options.exclude = list
                            .trim_matches(['[', ']'])
                            .split(',')
                            .map(|s| s.trim().trim_matches(['"', '\'']).to_string())
                            .filter(|s| !s.is_empty())
                            .collect();
                    }
                }
                "asDisclosure" => {
                    options.as_disclosure = !matches!(expr_value, Some("false"));
                }
                _ => {}
            }
        }

        options
    }

    /// Render the table of contents as nested lists.
    pub fn render(&self, toc: &[TocEntry]) -> String {
        let entries: Vec<&TocEntry> = toc
            .iter()
            .filter(|e| e.level >= self.from_heading && e.level <= self.to_heading)
            .filter(|e| !self.exclude.iter().any(|x| x == &e.text))
            .collect();

        let mut html = String::new();
        let mut depth = 0usize;
        let base = entries.iter().map(|e| e.level).min().unwrap_or(1);

        for entry in &entries {
            let target = usize::from(entry.level - base) + 1;
            if target > depth {
                for _ in depth..target {
                    html.push_str("<ul>");
                }
            } else {
                html.push_str("</li>");
                for _ in target..depth {
                    html.push_str("</ul></li>");
                }
            }
            depth = target;
            html.push_str(&format!(
                "<li><a href=\"#{}\">{}</a>",
                entry.id,
                html_escape(&entry.text)
            ));
        }
        for _ in 0..depth {
            html.push_str("</li></ul>");
        }

        let list = format!("<nav class=\"toc\">{html}</nav>");
        if self.as_disclosure {
            format!("<details open><summary class=\"toc-summary\">Table of Contents</summary>{list}</details>")
        } else {
            list
        }
    }
}

/// MDX body prepared for the Markdown renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdxSource {
    pub body: String,
    /// Options of the `<TOCInline />` element, if present.
    pub toc_inline: Option<TocInlineOptions>,
}

/// Strip ESM statements and mark the `<TOCInline />` position.
///
/// Fenced code blocks and inline code spans are left untouched.
pub fn prepare(source: &str) -> MdxSource {
    let mut body = String::with_capacity(source.len());
    // Prose since the last fence, substituted when a fence opens or at the end.
    let mut prose = String::new();
    let mut toc_inline = None;
    let mut fence: Option<&str> = None;
    // Open braces of the ESM statement being skipped, if any.
    let mut statement_depth: Option<i64> = None;

    for line in source.split_inclusive('\n') {
        let trimmed = line.trim_start();

        if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
            }
            body.push_str(line);
            continue;
        }

        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            body.push_str(&mark_toc_inline(&prose, &mut toc_inline));
            prose.clear();
            fence = Some(&trimmed[..3]);
            body.push_str(line);
            continue;
        }

        if let Some(depth) = statement_depth {
            let depth = depth + brace_balance(line);
            statement_depth = (depth > 0).then_some(depth);
            continue;
        }

        if line.starts_with("import ") || line.starts_with("export ") {
            let depth = brace_balance(line);
            statement_depth = (depth > 0).then_some(depth);
            continue;
        }

        prose.push_str(line);
    }
    body.push_str(&mark_toc_inline(&prose, &mut toc_inline));

    MdxSource { body, toc_inline }
}

/// Replace `<TOCInline />` elements outside inline code spans with the placeholder.
fn mark_toc_inline(prose: &str, toc_inline: &mut Option<TocInlineOptions>) -> String {
    let mut out = String::with_capacity(prose.len());
    let mut rest = prose;

    while let Some(open) = rest.find('`') {
        out.push_str(&replace_toc_inline(&rest[..open], toc_inline));

        let ticks = rest[open..].len() - rest[open..].trim_start_matches('`').len();
        let delimiter = &rest[open..open + ticks];
        let after = &rest[open + ticks..];
        match after.find(delimiter) {
            Some(close) => {
                let end = open + ticks + close + ticks;
                out.push_str(&rest[open..end]);
                rest = &rest[end..];
            }
            None => {
                out.push_str(delimiter);
                rest = after;
            }
        }
    }
    out.push_str(&replace_toc_inline(rest, toc_inline));
    out
}

fn replace_toc_inline(text: &str, toc_inline: &mut Option<TocInlineOptions>) -> String {
    TOC_INLINE_RE
        .replace_all(text, |caps: &regex::Captures| {
            let props = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            toc_inline.get_or_insert_with(|| TocInlineOptions::from_props(props));
            format!("\n{TOC_PLACEHOLDER}\n")
        })
        .into_owned()
}

fn brace_balance(line: &str) -> i64 {
    line.chars().fold(0, |depth, c| match c {
        '{' | '(' | '[' => depth + 1,
        '}' | ')' | ']' => depth - 1,
        _ => depth,
    })
}
