//! HTML template system for page generation.
//!
//! Templates are plain HTML with `{{ variable }}` and `{{ variable? }}`
//! placeholders. The built-in set can be replaced file by file from a
//! `layouts/` directory: `layouts/post.html` overrides the `post` template.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, info};

/// Template rendering errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Missing required variable.
    #[error("missing required variable: {0}")]
    MissingVariable(String),

    /// Template not found.
    #[error("template not found: {0}")]
    NotFound(String),

    /// Invalid template syntax.
    #[error("invalid template syntax: {0}")]
    InvalidSyntax(String),

    /// Failed to read a layout override.
    #[error("failed to read layout {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Template context with variables for interpolation.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    variables: HashMap<String, String>,
}

impl TemplateContext {
    /// Create a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a variable into the context.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    /// Insert a variable only when the value is non-empty.
    pub fn insert_non_empty(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.variables.insert(key.into(), value);
        }
    }

    /// Create context with initial variables.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Get a variable value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    /// Check if a variable exists.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }
}

/// A simple template that supports variable interpolation.
///
/// Substituted values are never rescanned, so rendered post bodies may contain
/// `{{` freely.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    content: String,
}

impl Template {
    /// Create a new template with the given name and content.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Get the template name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render the template with the given context.
    pub fn render(&self, context: &TemplateContext) -> Result<String> {
        let mut result = self.content.clone();
        let mut pos = 0;

        while let Some(start) = result[pos..].find("{{") {
            let start = pos + start;
            let end = result[start..].find("}}").ok_or_else(|| {
                TemplateError::InvalidSyntax(format!("unclosed {{{{ in template `{}`", self.name))
            })?;
            let end = start + end + 2;

            let var_name = result[start + 2..end - 2].trim();

            let (var_name, optional) = match var_name.strip_suffix('?') {
                Some(stripped) => (stripped.trim_end(), true),
                None => (var_name, false),
            };

            let value = match context.get(var_name) {
                Some(v) => v.to_string(),
                None if optional => String::new(),
                None => return Err(TemplateError::MissingVariable(var_name.to_string())),
            };

            result.replace_range(start..end, &value);
            pos = start + value.len();
        }

        Ok(result)
    }
}

/// Registry of templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
}

impl TemplateRegistry {
    /// Create a new registry with the built-in templates.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.register_defaults();
        registry
    }

    fn register_defaults(&mut self) {
        self.register(Template::new("base", DEFAULT_BASE_TEMPLATE));
        self.register(Template::new("post", DEFAULT_POST_TEMPLATE));
        self.register(Template::new("post_simple", DEFAULT_POST_SIMPLE_TEMPLATE));
        self.register(Template::new("post_banner", DEFAULT_POST_BANNER_TEMPLATE));
        self.register(Template::new("list", DEFAULT_LIST_TEMPLATE));
        self.register(Template::new("tags", DEFAULT_TAGS_TEMPLATE));
        self.register(Template::new("author", DEFAULT_AUTHOR_TEMPLATE));
        self.register(Template::new("home", DEFAULT_HOME_TEMPLATE));
        self.register(Template::new("not_found", DEFAULT_NOT_FOUND_TEMPLATE));
    }

    /// Replace templates with `*.html` files from a layouts directory.
    ///
    /// Returns the number of templates loaded. A missing directory is not an error.
    pub fn load_overrides(&mut self, dir: &Path) -> Result<usize> {
        if !dir.is_dir() {
            return Ok(0);
        }

        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| TemplateError::Io { path, source }
        };

        let mut count = 0;
        for entry in fs::read_dir(dir).map_err(io_err(dir))? {
            let path = entry.map_err(io_err(dir))?.path();
            if path.extension().is_none_or(|ext| ext != "html") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let content = fs::read_to_string(&path).map_err(io_err(&path))?;
            debug!(template = name, path = %path.display(), "loaded layout override");
            self.register(Template::new(name, content));
            count += 1;
        }

        if count > 0 {
            info!(count, dir = %dir.display(), "loaded layout overrides");
        }
        Ok(count)
    }

    /// Register a template.
    pub fn register(&mut self, template: Template) {
        self.templates.insert(template.name.clone(), template);
    }

    /// Get a template by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    /// Render a named template with the given context.
    pub fn render(&self, name: &str, context: &TemplateContext) -> Result<String> {
        let template = self
            .get(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;
        template.render(context)
    }
}

/// Default page shell: head, header, footer.
pub const DEFAULT_BASE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="{{ lang }}" data-theme-default="{{ theme }}">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{{ title }}</title>
    <meta name="description" content="{{ description? }}">
    <meta name="author" content="{{ author? }}">
    <link rel="canonical" href="{{ canonical_url }}">
    <meta property="og:title" content="{{ title }}">
    <meta property="og:description" content="{{ description? }}">
    <meta property="og:url" content="{{ canonical_url }}">
    <meta property="og:site_name" content="{{ site_title }}">
    <meta property="og:locale" content="{{ locale }}">
    <meta property="og:type" content="{{ og_type }}">
    <meta property="og:image" content="{{ og_image? }}">
    <meta name="twitter:card" content="summary_large_image">
    <link rel="alternate" type="application/rss+xml" title="{{ site_title }}" href="/feed.xml">
    <link rel="stylesheet" href="/css/site.css">
    <link rel="stylesheet" href="/css/highlight.css">
    <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/katex@0.16.11/dist/katex.min.css">
    <script>
        (function () {
            var stored = localStorage.getItem('theme');
            var preferred = document.documentElement.dataset.themeDefault;
            var dark = stored ? stored === 'dark'
                : preferred === 'dark' || (preferred === 'system' && window.matchMedia('(prefers-color-scheme: dark)').matches);
            document.documentElement.classList.toggle('dark', dark);
        })();
    </script>
    {{ head_extra? }}
</head>
<body>
    <header class="site-header{{ sticky_class? }}">
        <a class="site-brand" href="/" aria-label="{{ header_title }}">{{ logo_html? }}<span>{{ header_title }}</span></a>
        <nav class="site-nav">
            <a href="/blog">Blog</a>
            <a href="/tags">Tags</a>
            <a href="/about">About</a>
            {{ search_button? }}
            <button type="button" class="theme-toggle" aria-label="Toggle dark mode"
                onclick="var d=document.documentElement.classList.toggle('dark');localStorage.setItem('theme',d?'dark':'light')">&#9680;</button>
        </nav>
    </header>
    <main class="site-main">
        {{ content }}
    </main>
    <footer class="site-footer">
        <div class="social-links">{{ social_html? }}</div>
        <p>{{ author? }} &middot; &copy; {{ year }} &middot; <a href="/">{{ site_title }}</a></p>
    </footer>
    <script defer src="https://cdn.jsdelivr.net/npm/katex@0.16.11/dist/katex.min.js"></script>
    <script>
        document.addEventListener('DOMContentLoaded', function () {
            if (!window.katex) return;
            document.querySelectorAll('.math').forEach(function (el) {
                katex.render(el.textContent, el, { displayMode: el.classList.contains('math-display'), throwOnError: false });
            });
        });
    </script>
    {{ body_extra? }}
</body>
</html>"##;

/// Default post layout with table of contents and author sidebar.
pub const DEFAULT_POST_TEMPLATE: &str = r#"<article class="post post-layout">
    <header class="post-header">
        {{ date_html? }}
        <h1>{{ title }}</h1>
        <p class="post-meta">{{ reading_time }}</p>
    </header>
    <div class="post-grid">
        <aside class="post-sidebar">
            <ul class="post-authors">{{ authors_html? }}</ul>
            {{ tags_html? }}
            {{ toc_html? }}
        </aside>
        <div class="post-body">
            <div class="prose">{{ content }}</div>
            <div class="post-links">{{ source_html? }}</div>
            {{ comments_html? }}
        </div>
    </div>
    <footer class="post-footer">
        {{ post_nav_html? }}
        <a href="/blog">&larr; Back to the blog</a>
    </footer>
</article>
<script type="application/ld+json">{{ structured_data }}</script>"#;

/// Single-column post layout.
pub const DEFAULT_POST_SIMPLE_TEMPLATE: &str = r#"<article class="post post-simple">
    <header class="post-header">
        {{ date_html? }}
        <h1>{{ title }}</h1>
        <p class="post-meta">{{ reading_time }}</p>
    </header>
    <div class="prose">{{ content }}</div>
    {{ comments_html? }}
    <footer class="post-footer">
        {{ post_nav_html? }}
    </footer>
</article>
<script type="application/ld+json">{{ structured_data }}</script>"#;

/// Post layout with a full-width banner image.
pub const DEFAULT_POST_BANNER_TEMPLATE: &str = r#"<article class="post post-banner">
    <header class="post-header">
        <h1>{{ title }}</h1>
        <div class="banner">{{ banner_html? }}</div>
        {{ date_html? }}
        <p class="post-meta">{{ reading_time }}</p>
    </header>
    <div class="prose">{{ content }}</div>
    {{ comments_html? }}
    <footer class="post-footer">
        {{ post_nav_html? }}
    </footer>
</article>
<script type="application/ld+json">{{ structured_data }}</script>"#;

/// Paginated post listing with a tag sidebar.
pub const DEFAULT_LIST_TEMPLATE: &str = r#"<section class="post-list">
    <h1>{{ title }}</h1>
    <div class="list-grid">
        <aside class="tag-sidebar">{{ sidebar_html? }}</aside>
        <div>
            <ul class="post-items">
                {{ items }}
            </ul>
            {{ pagination? }}
        </div>
    </div>
</section>"#;

/// All tags with counts.
pub const DEFAULT_TAGS_TEMPLATE: &str = r#"<section class="tags-index">
    <h1>Tags</h1>
    <ul class="tag-cloud">
        {{ items }}
    </ul>
</section>"#;

/// Author profile page.
pub const DEFAULT_AUTHOR_TEMPLATE: &str = r#"<section class="author">
    <div class="author-card">
        {{ avatar_html? }}
        <h1>{{ name }}</h1>
        <p class="author-role">{{ occupation? }}</p>
        <p class="author-company">{{ company? }}</p>
        <div class="social-links">{{ social_html? }}</div>
    </div>
    <div class="prose">{{ content }}</div>
</section>"#;

/// Landing page with the latest posts.
pub const DEFAULT_HOME_TEMPLATE: &str = r#"<section class="home">
    <header class="home-header">
        <h1>Latest</h1>
        <p>{{ description? }}</p>
    </header>
    <ul class="post-items">
        {{ items }}
    </ul>
    {{ more_html? }}
    {{ newsletter_html? }}
</section>"#;

/// Page served for unknown routes.
pub const DEFAULT_NOT_FOUND_TEMPLATE: &str = r#"<section class="not-found">
    <h1>404</h1>
    <p>Sorry we couldn't find this page.</p>
    <p>But dont worry, you can find plenty of other things on our homepage.</p>
    <a class="button" href="/">Back to homepage</a>
</section>"#;
