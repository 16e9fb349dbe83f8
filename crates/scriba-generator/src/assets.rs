//! Static assets and generated stylesheets.
//!
//! Files from the static directory are copied to the output root unchanged.
//! `css/site.css` and `css/highlight.css` are written by the build.

use std::{
    fs,
    path::{Path, PathBuf},
};

use scriba_parser::{SyntaxHighlighter, syntax::SyntaxError};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Asset processing errors.
#[derive(Debug, Error)]
pub enum AssetError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal error.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Invalid asset path.
    #[error("invalid asset path: {0}")]
    InvalidPath(PathBuf),

    /// Highlight theme could not be rendered.
    #[error("syntax theme error: {0}")]
    Syntax(#[from] SyntaxError),
}

/// Result type for asset operations.
pub type Result<T> = std::result::Result<T, AssetError>;

/// Copies static files and writes the generated stylesheets.
#[derive(Debug, Default)]
pub struct AssetProcessor;

impl AssetProcessor {
    /// Create a new asset processor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Copy every non-hidden file from `source_dir` into `dest_dir`.
    ///
    /// Returns the site paths of the copied files.
    pub fn process(&self, source_dir: &Path, dest_dir: &Path) -> Result<Vec<String>> {
        info!(
            source = %source_dir.display(),
            dest = %dest_dir.display(),
            "processing assets"
        );

        let mut copied = Vec::new();

        if !source_dir.exists() {
            debug!("source directory does not exist, skipping");
            return Ok(copied);
        }

        for entry in WalkDir::new(source_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(source_dir)
                .map_err(|_| AssetError::InvalidPath(entry.path().to_path_buf()))?;
            let dest_path = dest_dir.join(relative);
            copy_file(entry.path(), &dest_path)?;

            debug!(src = %entry.path().display(), dest = %dest_path.display(), "copied asset");
            copied.push(format!("/{}", relative.display()).replace('\\', "/"));
        }

        info!(count = copied.len(), "assets processed");
        Ok(copied)
    }

    /// Write `css/site.css` and `css/highlight.css` into the output directory.
    pub fn write_stylesheets(
        &self,
        output_dir: &Path,
        highlighter: &SyntaxHighlighter,
        light_theme: &str,
        dark_theme: &str,
    ) -> Result<()> {
        let css_dir = output_dir.join("css");
        fs::create_dir_all(&css_dir)?;

        fs::write(css_dir.join("site.css"), SITE_CSS)?;
        fs::write(
            css_dir.join("highlight.css"),
            highlighter.stylesheet(light_theme, dark_theme)?,
        )?;

        debug!(light = light_theme, dark = dark_theme, "wrote stylesheets");
        Ok(())
    }
}

/// Copy a single file, creating parent directories.
pub fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest)?;
    Ok(())
}

/// Base stylesheet for the built-in templates.
pub const SITE_CSS: &str = r#":root {
    --color-primary: #db2777;
    --color-bg: #ffffff;
    --color-bg-muted: #f3f4f6;
    --color-text: #111827;
    --color-text-muted: #6b7280;
    --color-border: #e5e7eb;
    color-scheme: light;
}

.dark {
    --color-primary: #f472b6;
    --color-bg: #030712;
    --color-bg-muted: #111827;
    --color-text: #f3f4f6;
    --color-text-muted: #9ca3af;
    --color-border: #374151;
    color-scheme: dark;
}

*, *::before, *::after { box-sizing: border-box; }

body {
    margin: 0 auto;
    max-width: 64rem;
    padding: 0 1.5rem;
    font-family: system-ui, -apple-system, 'Segoe UI', sans-serif;
    line-height: 1.7;
    color: var(--color-text);
    background: var(--color-bg);
}

a { color: var(--color-primary); text-decoration: none; }
a:hover { text-decoration: underline; }

.sr-only {
    position: absolute;
    width: 1px;
    height: 1px;
    overflow: hidden;
    clip: rect(0, 0, 0, 0);
}

.site-header {
    display: flex;
    align-items: center;
    justify-content: space-between;
    padding: 2.5rem 0;
}
.site-header.sticky { position: sticky; top: 0; z-index: 50; background: var(--color-bg); }
.site-brand { display: flex; align-items: center; gap: 0.75rem; font-size: 1.5rem; font-weight: 600; color: var(--color-text); }
.site-nav { display: flex; align-items: center; gap: 1.25rem; }
.site-nav a { color: var(--color-text); font-weight: 500; }
.theme-toggle, .search-toggle { background: none; border: 0; cursor: pointer; color: var(--color-text); font-size: 1.25rem; }

.site-footer { margin: 4rem 0 2rem; text-align: center; color: var(--color-text-muted); font-size: 0.875rem; }
.social-links { display: flex; justify-content: center; gap: 1rem; margin-bottom: 0.5rem; }
.social::before { content: attr(class); }

.post-items { list-style: none; padding: 0; }
.post-item { padding: 2rem 0; border-bottom: 1px solid var(--color-border); }
.post-item h2 { margin: 0.25rem 0; font-size: 1.5rem; }
.post-title { color: var(--color-text); }
.post-summary { color: var(--color-text-muted); }
.tag { margin-right: 0.75rem; font-size: 0.875rem; font-weight: 500; text-transform: uppercase; }
.draft-badge { font-size: 0.75rem; color: var(--color-text-muted); border: 1px solid var(--color-border); padding: 0 0.4rem; }

.list-grid { display: grid; grid-template-columns: 14rem 1fr; gap: 2rem; }
.tag-sidebar { background: var(--color-bg-muted); padding: 1rem; border-radius: 0.5rem; }
.tag-sidebar ul { list-style: none; padding: 0; }
.tag-sidebar .active h3 { color: var(--color-primary); font-size: 0.875rem; text-transform: uppercase; }

.pagination { display: flex; justify-content: space-between; padding: 1.5rem 0; }
.tag-cloud { display: flex; flex-wrap: wrap; gap: 1rem; list-style: none; padding: 0; }

.post-header { text-align: center; padding: 1.5rem 0; border-bottom: 1px solid var(--color-border); }
.post-header h1 { font-size: 2.5rem; line-height: 1.2; margin: 0.5rem 0; }
.post-meta { color: var(--color-text-muted); }
.post-grid { display: grid; grid-template-columns: 14rem 1fr; gap: 2rem; }
.post-sidebar { padding-top: 2rem; font-size: 0.875rem; }
.post-authors { list-style: none; padding: 0; }
.post-author { display: flex; align-items: center; gap: 0.5rem; }
.avatar { border-radius: 9999px; }
.post-nav { display: flex; justify-content: space-between; gap: 1rem; padding: 2rem 0; }
.post-nav h2 { font-size: 0.75rem; text-transform: uppercase; color: var(--color-text-muted); }
.banner img { width: 100%; max-height: 24rem; object-fit: cover; }

.prose { max-width: 48rem; padding: 2rem 0; }
.prose img { max-width: 100%; height: auto; }
.prose pre { overflow-x: auto; padding: 1rem; border-radius: 0.5rem; background: var(--color-bg-muted); }
.prose code { font-size: 0.9em; }
.prose table { border-collapse: collapse; }
.prose th, .prose td { border: 1px solid var(--color-border); padding: 0.25rem 0.75rem; }
.heading-anchor::before { content: '#'; margin-left: -1em; padding-right: 0.25em; opacity: 0; }
h2:hover .heading-anchor::before, h3:hover .heading-anchor::before { opacity: 0.5; }
.code-title { font-family: monospace; font-size: 0.875rem; padding: 0.5rem 1rem; background: var(--color-border); border-radius: 0.5rem 0.5rem 0 0; }
.markdown-alert { border-left: 0.25rem solid var(--color-primary); padding: 0.5rem 1rem; }
.markdown-alert-title { font-weight: 600; }
.math-display { overflow-x: auto; text-align: center; }
.csl-entry { margin-bottom: 0.5rem; }
.toc ul { padding-left: 1rem; }

.home-header { border-bottom: 1px solid var(--color-border); padding-bottom: 1.5rem; }
.home-header h1 { font-size: 3rem; margin: 0; }
.more { text-align: right; }
.newsletter { display: flex; flex-wrap: wrap; justify-content: center; gap: 0.5rem; padding: 2rem 0; }
.newsletter-title { width: 100%; text-align: center; font-weight: 600; }
.newsletter input { padding: 0.5rem 1rem; border: 1px solid var(--color-border); border-radius: 0.375rem; }
.newsletter button, .button { padding: 0.5rem 1rem; border: 0; border-radius: 0.375rem; background: var(--color-primary); color: #fff; }

.author-card { text-align: center; padding: 2rem 0; }
.author-role, .author-company { color: var(--color-text-muted); margin: 0; }
.not-found { text-align: center; padding: 6rem 0; }
.not-found h1 { font-size: 6rem; margin: 0; }

.search-dialog { width: min(36rem, 90vw); border: 1px solid var(--color-border); border-radius: 0.5rem; background: var(--color-bg); color: var(--color-text); }
.search-dialog input { width: 100%; padding: 0.75rem; font-size: 1rem; border: 0; border-bottom: 1px solid var(--color-border); background: transparent; color: inherit; }
.search-results { list-style: none; padding: 0; }

@media (max-width: 768px) {
    .list-grid, .post-grid { grid-template-columns: 1fr; }
    .tag-sidebar, .post-sidebar { display: none; }
}
"#;

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_process_assets() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        fs::create_dir_all(source.path().join("static/images")).unwrap();
        fs::write(source.path().join("static/images/logo.png"), b"png").unwrap();
        fs::write(source.path().join("favicon.ico"), b"ico").unwrap();
        fs::write(source.path().join(".DS_Store"), b"junk").unwrap();

        let copied = AssetProcessor::new().process(source.path(), dest.path()).unwrap();

        assert_eq!(copied, vec!["/favicon.ico", "/static/images/logo.png"]);
        assert!(dest.path().join("static/images/logo.png").exists());
        assert!(!dest.path().join(".DS_Store").exists());
    }

    #[test]
    fn test_missing_source_dir() {
        let dest = TempDir::new().unwrap();
        let copied = AssetProcessor::new()
            .process(&dest.path().join("missing"), dest.path())
            .unwrap();
        assert!(copied.is_empty());
    }

    #[test]
    fn test_write_stylesheets() {
        let dest = TempDir::new().unwrap();
        let highlighter = SyntaxHighlighter::new();

        AssetProcessor::new()
            .write_stylesheets(dest.path(), &highlighter, "InspiredGitHub", "base16-ocean.dark")
            .unwrap();

        let highlight = fs::read_to_string(dest.path().join("css/highlight.css")).unwrap();
        assert!(highlight.contains(".dark"));
        assert!(dest.path().join("css/site.css").exists());
    }

    #[test]
    fn test_unknown_theme_fails() {
        let dest = TempDir::new().unwrap();
        let result = AssetProcessor::new().write_stylesheets(
            dest.path(),
            &SyntaxHighlighter::new(),
            "no-such-theme",
            "base16-ocean.dark",
        );
        assert!(matches!(result, Err(AssetError::Syntax(_))));
    }
}
