//! Content types and structures.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    config::Config,
    frontmatter::{AuthorFrontmatter, Frontmatter, PostLayout},
};

/// Reading speed used for reading time estimates.
pub const WORDS_PER_MINUTE: f64 = 200.0;

/// Length of generated summaries, in characters.
pub const SUMMARY_LENGTH: usize = 160;

/// URL prefix of every post.
pub const BLOG_PREFIX: &str = "blog";

/// Type of content source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Markdown content (.md files).
    Markdown,
    /// Markdown with JSX components (.mdx files).
    Mdx,
}

impl ContentType {
    /// Determine content type from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "md" | "markdown" => Some(Self::Markdown),
            "mdx" => Some(Self::Mdx),
            _ => None,
        }
    }

    /// Get the file extension for this content type.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Mdx => "mdx",
        }
    }
}

/// Location of a post relative to the content directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPath {
    /// Path relative to the content directory.
    pub path: PathBuf,

    /// Slug derived from the path, `/`-separated.
    pub slug: String,

    /// Content type based on extension.
    pub content_type: ContentType,
}

impl ContentPath {
    /// Derive the slug of a content file.
    ///
    /// - `hello.md` → `hello`
    /// - `nested-route/introducing.mdx` → `nested-route/introducing`
    /// - `guide/index.md` → `guide`
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        let content_type = ContentType::from_extension(extension)?;
        let stem = path.file_stem()?.to_str()?;

        let mut segments: Vec<String> = path
            .parent()
            .map(|parent| {
                parent
                    .components()
                    .filter_map(|c| match c {
                        std::path::Component::Normal(s) => s.to_str().map(str::to_string),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        if stem != "index" || segments.is_empty() {
            segments.push(stem.to_string());
        }

        Some(Self {
            path: path.to_path_buf(),
            slug: segments.join("/"),
            content_type,
        })
    }

    /// Site-relative path, e.g. `blog/hello`.
    pub fn site_path(&self) -> String {
        format!("{BLOG_PREFIX}/{}", self.slug)
    }

    /// Get the URL path for this content.
    pub fn url_path(&self) -> String {
        format!("/{}", self.site_path())
    }
}

/// Parsed content with metadata and rendered HTML.
#[derive(Debug, Clone)]
pub struct ParsedContent {
    /// Parsed front matter metadata.
    pub frontmatter: Frontmatter,

    /// Rendered HTML content.
    pub html: String,

    /// Raw source content (without front matter).
    pub raw: String,

    /// Table of contents extracted from headings.
    pub toc: Vec<TocEntry>,
}

/// Table of contents entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Heading level (1-6).
    pub level: u8,

    /// Heading text.
    pub text: String,

    /// Anchor ID for linking.
    pub id: String,
}

/// Estimated reading time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingTime {
    /// Display text, e.g. `"3 min read"`.
    pub text: String,
    pub minutes: f64,
    /// Milliseconds.
    pub time: u64,
    pub words: usize,
}

impl ReadingTime {
    /// Estimate reading time of `text`.
    pub fn from_text(text: &str) -> Self {
        let words = count_words(text);
        let minutes = words as f64 / WORDS_PER_MINUTE;
        // Round to hundredths before ceiling so float noise does not add a minute.
        let displayed = ((minutes * 100.0).round() / 100.0).ceil() as u64;

        Self {
            text: format!("{displayed} min read"),
            minutes,
            time: (minutes * 60_000.0).round() as u64,
            words,
        }
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30ff}'
        | '\u{3400}'..='\u{4dbf}'
        | '\u{4e00}'..='\u{9fff}'
        | '\u{ac00}'..='\u{d7af}'
        | '\u{f900}'..='\u{faff}')
}

/// Count words; every CJK character is a word on its own.
pub fn count_words(text: &str) -> usize {
    let mut words = 0;
    let mut in_word = false;

    for c in text.chars() {
        if is_cjk(c) {
            words += 1;
            in_word = false;
        } else if c.is_whitespace() {
            in_word = false;
        } else if !in_word {
            words += 1;
            in_word = true;
        }
    }

    words
}

/// A fully processed blog post.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Slug relative to the content directory.
    pub slug: String,

    /// Site-relative path, `blog/<slug>`.
    pub path: String,

    /// URL path, `/blog/<slug>`.
    pub url: String,

    pub title: String,

    #[serde(default)]
    pub date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub lastmod: Option<DateTime<Utc>>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub draft: bool,

    /// Authored summary or an excerpt of the body.
    pub summary: String,

    #[serde(default)]
    pub images: Vec<String>,

    pub authors: Vec<String>,

    pub layout: PostLayout,

    #[serde(default)]
    pub bibliography: Option<String>,

    #[serde(default)]
    pub canonical_url: Option<String>,

    /// Rendered HTML content.
    pub content: String,

    pub reading_time: ReadingTime,

    #[serde(default)]
    pub toc: Vec<TocEntry>,

    pub content_type: ContentType,

    /// Source file path.
    #[serde(default)]
    pub source_path: Option<PathBuf>,
}

impl Post {
    /// Create a post from parsed content and its location.
    pub fn from_parsed(content: ParsedContent, content_path: &ContentPath) -> Self {
        let fm = content.frontmatter;

        let reading_time = ReadingTime::from_text(&content.raw);

        let summary = fm
            .summary
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| {
                let plain_text = strip_html(&content.html);
                let plain_text = plain_text.split_whitespace().collect::<Vec<_>>().join(" ");
                truncate_at_word_boundary(&plain_text, SUMMARY_LENGTH)
            });

        Self {
            slug: content_path.slug.clone(),
            path: content_path.site_path(),
            url: content_path.url_path(),
            title: fm.title,
            date: fm.date,
            lastmod: fm.lastmod,
            tags: fm.tags,
            draft: fm.draft,
            summary,
            images: fm.images,
            authors: fm.authors,
            layout: fm.layout.unwrap_or_default(),
            bibliography: fm.bibliography,
            canonical_url: fm.canonical_url,
            content: content.html,
            reading_time,
            toc: content.toc,
            content_type: content_path.content_type,
            source_path: Some(content_path.path.clone()),
        }
    }

    /// The post without its body.
    pub fn core_content(&self) -> CoreContent {
        CoreContent {
            slug: self.slug.clone(),
            path: self.path.clone(),
            url: self.url.clone(),
            title: self.title.clone(),
            date: self.date,
            lastmod: self.lastmod,
            tags: self.tags.clone(),
            draft: self.draft,
            summary: self.summary.clone(),
            images: self.images.clone(),
            authors: self.authors.clone(),
            layout: self.layout,
            reading_time: self.reading_time.clone(),
        }
    }

    /// schema.org `BlogPosting` JSON-LD for this post.
    pub fn structured_data(&self, config: &Config, authors: &[&Author]) -> serde_json::Value {
        let image = self
            .images
            .first()
            .map(String::as_str)
            .unwrap_or(config.social_banner.as_str());
        let image = if image.starts_with('/') {
            config.url_for(image)
        } else {
            image.to_string()
        };

        let date_published = self.date.map(|d| d.to_rfc3339());
        let date_modified = self.lastmod.or(self.date).map(|d| d.to_rfc3339());

        let author: Vec<_> = if authors.is_empty() {
            vec![json!({ "@type": "Person", "name": config.author })]
        } else {
            authors
                .iter()
                .map(|a| json!({ "@type": "Person", "name": a.name }))
                .collect()
        };

        json!({
            "@context": "https://schema.org",
            "@type": "BlogPosting",
            "headline": self.title,
            "datePublished": date_published,
            "dateModified": date_modified,
            "description": self.summary,
            "image": image,
            "url": config.url_for(&self.path),
            "author": author,
        })
    }
}

/// Listing view of a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreContent {
    pub slug: String,
    pub path: String,
    pub url: String,
    pub title: String,
    pub date: Option<DateTime<Utc>>,
    pub lastmod: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub draft: bool,
    pub summary: String,
    pub images: Vec<String>,
    pub authors: Vec<String>,
    pub layout: PostLayout,
    pub reading_time: ReadingTime,
}

/// An author profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    /// File stem, referenced from post `authors`.
    pub slug: String,
    pub name: String,
    pub avatar: Option<String>,
    pub occupation: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub twitter: Option<String>,
    pub bluesky: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub layout: Option<String>,
    /// Rendered biography.
    pub content: String,
}

impl Author {
    pub fn new(slug: impl Into<String>, fm: AuthorFrontmatter, content: String) -> Self {
        let slug = slug.into();
        let name = if fm.name.trim().is_empty() {
            slug.clone()
        } else {
            fm.name
        };

        Self {
            slug,
            name,
            avatar: fm.avatar,
            occupation: fm.occupation,
            company: fm.company,
            email: fm.email,
            twitter: fm.twitter,
            bluesky: fm.bluesky,
            linkedin: fm.linkedin,
            github: fm.github,
            layout: fm.layout,
            content,
        }
    }
}

/// Strip HTML tags from content.
pub fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                if in_tag {
                    result.push(' ');
                }
                in_tag = false;
            }
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }

    result
}

/// Truncate text at word boundary, respecting UTF-8 character boundaries.
pub fn truncate_at_word_boundary(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        return text.to_string();
    }

    let truncate_byte_idx = text
        .char_indices()
        .nth(max_chars)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());

    let truncated = &text[..truncate_byte_idx];

    if let Some(last_space_byte) = truncated.rfind(' ') {
        format!("{}...", &truncated[..last_space_byte])
    } else {
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::env::MapEnv;

    fn parsed(fm: Frontmatter, html: &str, raw: &str) -> ParsedContent {
        ParsedContent {
            frontmatter: fm,
            html: html.to_string(),
            raw: raw.to_string(),
            toc: Vec::new(),
        }
    }

    #[test]
    fn test_content_type_from_extension() {
        assert_eq!(
            ContentType::from_extension("md"),
            Some(ContentType::Markdown)
        );
        assert_eq!(ContentType::from_extension("MDX"), Some(ContentType::Mdx));
        assert_eq!(ContentType::from_extension("txt"), None);
    }

    #[test]
    fn test_content_path_simple() {
        let cp = ContentPath::from_path(Path::new("code-sample.mdx")).expect("parse path");

        assert_eq!(cp.slug, "code-sample");
        assert_eq!(cp.site_path(), "blog/code-sample");
        assert_eq!(cp.url_path(), "/blog/code-sample");
        assert_eq!(cp.content_type, ContentType::Mdx);
    }

    #[test]
    fn test_content_path_nested_and_index() {
        let nested = ContentPath::from_path(Path::new("nested-route/introducing.md")).unwrap();
        assert_eq!(nested.slug, "nested-route/introducing");

        let index = ContentPath::from_path(Path::new("guide/index.md")).unwrap();
        assert_eq!(index.slug, "guide");

        let root_index = ContentPath::from_path(Path::new("index.md")).unwrap();
        assert_eq!(root_index.slug, "index");
    }

    #[test]
    fn test_reading_time() {
        let text = "word ".repeat(450);
        let rt = ReadingTime::from_text(&text);
        assert_eq!(rt.words, 450);
        assert_eq!(rt.text, "3 min read");
        assert_eq!(rt.time, 135_000);

        assert_eq!(ReadingTime::from_text("").text, "0 min read");
        assert_eq!(ReadingTime::from_text(&"a ".repeat(200)).text, "1 min read");
    }

    #[test]
    fn test_count_words_cjk() {
        assert_eq!(count_words("你好世界"), 4);
        assert_eq!(count_words("Hello 世界 again"), 4);
        assert_eq!(count_words("  spaced   out  "), 2);
    }

    #[test]
    fn test_post_from_parsed() {
        let fm = Frontmatter {
            title: "Hello".to_string(),
            tags: vec!["rust".to_string()],
            authors: vec!["default".to_string()],
            ..Default::default()
        };
        let cp = ContentPath::from_path(Path::new("hello.md")).unwrap();
        let post = Post::from_parsed(parsed(fm, "<p>First   paragraph.</p>", "First paragraph."), &cp);

        assert_eq!(post.url, "/blog/hello");
        assert_eq!(post.path, "blog/hello");
        assert_eq!(post.summary, "First paragraph.");
        assert_eq!(post.layout, PostLayout::PostLayout);
        assert_eq!(post.reading_time.words, 2);
        assert_eq!(post.core_content().tags, vec!["rust"]);
    }

    #[test]
    fn test_authored_summary_wins() {
        let fm = Frontmatter {
            title: "Hello".to_string(),
            summary: Some("Authored".to_string()),
            ..Default::default()
        };
        let cp = ContentPath::from_path(Path::new("hello.md")).unwrap();
        let post = Post::from_parsed(parsed(fm, "<p>Body</p>", "Body"), &cp);
        assert_eq!(post.summary, "Authored");
    }

    #[test]
    fn test_structured_data() {
        let config = Config::from_toml_str(
            "title = \"T\"\nauthor = \"Tails\"\nsiteUrl = \"https://example.com\"\nsocialBanner = \"/static/card.png\"",
            &MapEnv::new(),
        )
        .unwrap();
        let fm = Frontmatter {
            title: "Hello".to_string(),
            date: Some(Utc.with_ymd_and_hms(2024, 1, 14, 0, 0, 0).unwrap()),
            summary: Some("About hello".to_string()),
            ..Default::default()
        };
        let cp = ContentPath::from_path(Path::new("hello.md")).unwrap();
        let post = Post::from_parsed(parsed(fm, "", ""), &cp);

        let data = post.structured_data(&config, &[]);
        assert_eq!(data["@type"], "BlogPosting");
        assert_eq!(data["headline"], "Hello");
        assert_eq!(data["image"], "https://example.com/static/card.png");
        assert_eq!(data["url"], "https://example.com/blog/hello");
        assert_eq!(data["dateModified"], data["datePublished"]);
        assert_eq!(data["author"][0]["name"], "Tails");
    }

    #[test]
    fn test_author_name_falls_back_to_slug() {
        let author = Author::new("sparrowhawk", AuthorFrontmatter::default(), String::new());
        assert_eq!(author.name, "sparrowhawk");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Hello <strong>World</strong></p>").split_whitespace().collect::<Vec<_>>(),
            vec!["Hello", "World"]
        );
        assert_eq!(strip_html("No tags here"), "No tags here");
    }

    #[test]
    fn test_truncate_at_word_boundary() {
        let text = "Hello world this is a test";
        assert_eq!(truncate_at_word_boundary(text, 100), text);
        assert_eq!(truncate_at_word_boundary(text, 11), "Hello...");
        assert_eq!(truncate_at_word_boundary(text, 12), "Hello world...");

        let chinese_text = "你好世界 Hello World";
        assert_eq!(truncate_at_word_boundary(chinese_text, 7), "你好世界...");
    }
}
