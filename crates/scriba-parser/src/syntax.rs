//! Syntax highlighting for code blocks.
//!
//! Code is highlighted into CSS classes rather than inline colours so one
//! rendering serves both the light and the dark scheme. The matching stylesheet
//! comes from [`SyntaxHighlighter::stylesheet`].

use syntect::{
    highlighting::ThemeSet,
    html::{ClassStyle, ClassedHTMLGenerator, css_for_theme_with_class_style},
    parsing::SyntaxSet,
    util::LinesWithEndings,
};
use thiserror::Error;

use crate::html_escape;

/// Class prefix for highlighted tokens.
pub const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

/// Syntax highlighting errors.
#[derive(Debug, Error)]
pub enum SyntaxError {
    /// Theme name not bundled with syntect.
    #[error("unknown syntax theme: {0}")]
    UnknownTheme(String),

    /// Stylesheet generation failed.
    #[error("failed to generate theme css: {0}")]
    Css(#[from] syntect::Error),
}

/// Syntax highlighter using syntect.
#[derive(Debug)]
pub struct SyntaxHighlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxHighlighter {
    pub fn new() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
        }
    }

    /// Get available theme names.
    pub fn available_themes(&self) -> Vec<&str> {
        self.theme_set.themes.keys().map(|s| s.as_str()).collect()
    }

    /// Highlight code with the given language.
    ///
    /// If the language is not recognized, returns the escaped code wrapped in a
    /// `<pre><code>` block.
    pub fn highlight(&self, code: &str, lang: Option<&str>) -> String {
        let Some(syntax) = lang.and_then(|l| self.syntax_set.find_syntax_by_token(l)) else {
            return fallback_highlight(code, lang);
        };

        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntax_set, CLASS_STYLE);
        for line in LinesWithEndings::from(code) {
            if let Err(err) = generator.parse_html_for_line_which_includes_newline(line) {
                tracing::debug!(error = %err, lang = ?lang, "highlighting failed, using plain block");
                return fallback_highlight(code, lang);
            }
        }

        let lang_class = lang.map(|l| format!(" language-{l}")).unwrap_or_default();
        format!(
            "<pre class=\"hl-code{lang_class}\"><code>{}</code></pre>",
            generator.finalize()
        )
    }

    /// CSS for one theme, every selector nested under `scope` when given.
    pub fn theme_css(&self, theme: &str, scope: Option<&str>) -> Result<String, SyntaxError> {
        let theme = self
            .theme_set
            .themes
            .get(theme)
            .ok_or_else(|| SyntaxError::UnknownTheme(theme.to_string()))?;
        let css = css_for_theme_with_class_style(theme, CLASS_STYLE)?;

        Ok(match scope {
            Some(scope) => scope_css(&css, scope),
            None => css,
        })
    }

    /// Stylesheet with the light theme at top level and the dark one under `.dark`.
    pub fn stylesheet(&self, light: &str, dark: &str) -> Result<String, SyntaxError> {
        let mut css = self.theme_css(light, None)?;
        css.push('\n');
        css.push_str(&self.theme_css(dark, Some(".dark"))?);
        Ok(css)
    }
}

/// Fallback when no grammar matches.
fn fallback_highlight(code: &str, lang: Option<&str>) -> String {
    let escaped = html_escape(code);
    let lang_class = lang
        .map(|l| format!(" class=\"language-{}\"", html_escape(l)))
        .unwrap_or_default();
    format!("<pre><code{lang_class}>{escaped}</code></pre>")
}

/// Prefix every selector of a flat stylesheet with `scope`.
fn scope_css(css: &str, scope: &str) -> String {
    let mut out = String::with_capacity(css.len() + css.len() / 4);
    let mut in_comment = false;

    for line in css.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("/*") {
            in_comment = !trimmed.ends_with("*/");
        } else if in_comment {
            in_comment = !trimmed.ends_with("*/");
        } else if let Some(selectors) = trimmed.strip_suffix('{') {
            let scoped = selectors
                .split(',')
                .map(|s| format!("{scope} {}", s.trim()))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&scoped);
            out.push_str(" {\n");
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_rust() {
        let highlighter = SyntaxHighlighter::default();
        let code = "fn main() {\n    println!(\"Hello\");\n}";
        let html = highlighter.highlight(code, Some("rust"));

        assert!(html.starts_with("<pre class=\"hl-code language-rust\">"));
        assert!(html.contains("hl-"));
        assert!(html.contains("main"));
        assert!(!html.contains("style=\"color"));
    }

    #[test]
    fn test_highlight_unknown_language() {
        let highlighter = SyntaxHighlighter::default();
        let html = highlighter.highlight("a < b", Some("unknown_lang_xyz"));

        assert_eq!(
            html,
            "<pre><code class=\"language-unknown_lang_xyz\">a &lt; b</code></pre>"
        );
    }

    #[test]
    fn test_highlight_no_language() {
        let highlighter = SyntaxHighlighter::default();
        let html = highlighter.highlight("plain text", None);

        assert_eq!(html, "<pre><code>plain text</code></pre>");
    }

    #[test]
    fn test_available_themes() {
        let highlighter = SyntaxHighlighter::default();
        let themes = highlighter.available_themes();

        assert!(themes.contains(&"base16-ocean.dark"));
        assert!(themes.contains(&"InspiredGitHub"));
    }

    #[test]
    fn test_stylesheet_scopes_dark_theme() {
        let highlighter = SyntaxHighlighter::default();
        let css = highlighter
            .stylesheet("InspiredGitHub", "base16-ocean.dark")
            .unwrap();

        assert!(css.contains(".hl-code {"));
        assert!(css.contains(".dark .hl-code {"));
    }

    #[test]
    fn test_unknown_theme() {
        let highlighter = SyntaxHighlighter::default();
        let result = highlighter.theme_css("no-such-theme", None);
        assert!(matches!(result, Err(SyntaxError::UnknownTheme(_))));
    }

    #[test]
    fn test_scope_css() {
        let css = "/*\n * theme\n */\n.a, .b.c {\n color: red;\n}\n";
        let scoped = scope_css(css, ".dark");
        assert!(scoped.contains(".dark .a, .dark .b.c {"));
        assert!(scoped.contains(" * theme"));
        assert!(scoped.contains(" color: red;"));
    }
}
