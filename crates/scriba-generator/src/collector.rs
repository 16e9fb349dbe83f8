//! Content collection and organization.
//!
//! Walks the content directory, parses posts in parallel and builds the tag
//! index, author table and post ordering the generators work from.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use rayon::prelude::*;
use scriba_core::{
    Author, AuthorFrontmatter, Config, ContentPath, ContentType, Post, frontmatter::parse_document,
    slugify,
};
use scriba_parser::ParserRegistry;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Content collection errors.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal error.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Parser error.
    #[error("parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Invalid content path.
    #[error("invalid content path: {0}")]
    InvalidPath(PathBuf),
}

/// Result type for collector operations.
pub type Result<T> = std::result::Result<T, CollectorError>;

/// Collected site content.
#[derive(Debug, Default)]
pub struct SiteContent {
    /// Posts, newest first. Drafts are present only when the build includes them.
    pub posts: Vec<Post>,

    /// Tag index over published posts.
    pub tags: TagIndex,

    /// Author profiles by slug.
    pub authors: BTreeMap<String, Author>,
}

/// Posts adjacent to one post in date order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Neighbours<'a> {
    /// The next older post.
    pub prev: Option<&'a Post>,
    /// The next newer post.
    pub next: Option<&'a Post>,
}

impl SiteContent {
    /// Look up a post by slug.
    pub fn post(&self, slug: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.slug == slug)
    }

    /// Posts that are not drafts, newest first.
    pub fn published(&self) -> Vec<&Post> {
        self.posts.iter().filter(|p| !p.draft).collect()
    }

    /// Older and newer neighbours of a post.
    pub fn neighbours(&self, slug: &str) -> Neighbours<'_> {
        let Some(idx) = self.posts.iter().position(|p| p.slug == slug) else {
            return Neighbours::default();
        };

        Neighbours {
            prev: self.posts.get(idx + 1),
            next: idx.checked_sub(1).and_then(|i| self.posts.get(i)),
        }
    }

    /// Posts carrying a tag, newest first.
    pub fn posts_for_tag(&self, tag_slug: &str) -> Vec<&Post> {
        self.posts
            .iter()
            .filter(|p| p.tags.iter().any(|t| slugify(t) == tag_slug))
            .collect()
    }

    /// Author profiles of a post, in front matter order. Unknown slugs are skipped.
    pub fn authors_for(&self, post: &Post) -> Vec<&Author> {
        post.authors
            .iter()
            .filter_map(|slug| self.authors.get(slug))
            .collect()
    }
}

/// Tag slug to post count, urls and display name.
///
/// Only published posts are counted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagIndex {
    counts: BTreeMap<String, usize>,
    urls: BTreeMap<String, Vec<String>>,
    names: BTreeMap<String, String>,
}

impl TagIndex {
    /// Build the index from posts, ignoring drafts.
    pub fn from_posts<'a>(posts: impl IntoIterator<Item = &'a Post>) -> Self {
        let mut index = Self::default();

        for post in posts.into_iter().filter(|p| !p.draft) {
            for tag in &post.tags {
                let slug = slugify(tag);
                if slug.is_empty() {
                    continue;
                }
                *index.counts.entry(slug.clone()).or_default() += 1;
                index
                    .urls
                    .entry(slug.clone())
                    .or_default()
                    .push(post.url.clone());
                index.names.entry(slug).or_insert_with(|| tag.clone());
            }
        }

        index
    }

    /// Tag slug to count.
    pub fn counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }

    /// Number of posts carrying a tag.
    pub fn count(&self, slug: &str) -> usize {
        self.counts.get(slug).copied().unwrap_or(0)
    }

    /// Urls of posts carrying a tag.
    pub fn urls(&self, slug: &str) -> &[String] {
        self.urls.get(slug).map(Vec::as_slice).unwrap_or_default()
    }

    /// Display name of a tag, as first written in front matter.
    pub fn name<'a>(&'a self, slug: &'a str) -> &'a str {
        self.names.get(slug).map(String::as_str).unwrap_or(slug)
    }

    /// Tags sorted by count descending, then by slug.
    pub fn by_count(&self) -> Vec<(&str, usize)> {
        let mut tags: Vec<_> = self.counts.iter().map(|(t, c)| (t.as_str(), *c)).collect();
        tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        tags
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// `tag-data.json` contents: slug to count.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.counts)
    }
}

/// Content collector that walks directories and parses files.
#[derive(Debug)]
pub struct ContentCollector {
    config: Config,
    parser: ParserRegistry,
    content_dir: PathBuf,
    authors_dir: Option<PathBuf>,
}

impl ContentCollector {
    /// Create a new content collector.
    #[must_use]
    pub fn new(config: Config, content_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            parser: ParserRegistry::new(),
            content_dir: content_dir.into(),
            authors_dir: None,
        }
    }

    /// Set the author profiles directory.
    #[must_use]
    pub fn with_authors_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.authors_dir = Some(dir.into());
        self
    }

    /// The parser registry used for posts and author biographies.
    pub fn parser(&self) -> &ParserRegistry {
        &self.parser
    }

    /// Collect all content from the content directory.
    pub fn collect(&self) -> Result<SiteContent> {
        info!(dir = %self.content_dir.display(), "collecting content");

        let files = find_content_files(&self.content_dir)?;
        info!(count = files.len(), "found content files");

        let posts: Vec<Post> = files
            .par_iter()
            .filter_map(|path| match self.parse_file(path) {
                Ok(post) if post.draft && !self.config.build.drafts => {
                    debug!(url = %post.url, "skipping draft");
                    None
                }
                Ok(post) => Some(post),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to parse file");
                    None
                }
            })
            .collect();

        let mut posts = drop_duplicate_slugs(posts);
        sort_by_date(&mut posts);

        let tags = TagIndex::from_posts(&posts);
        let authors = match &self.authors_dir {
            Some(dir) => self.collect_authors(dir)?,
            None => BTreeMap::new(),
        };

        info!(
            posts = posts.len(),
            tags = tags.len(),
            authors = authors.len(),
            "content collection complete"
        );

        Ok(SiteContent {
            posts,
            tags,
            authors,
        })
    }

    /// Parse a single content file into a post.
    fn parse_file(&self, path: &Path) -> Result<Post> {
        debug!(path = %path.display(), "parsing file");

        let content = fs::read_to_string(path)?;

        let relative_path = path.strip_prefix(&self.content_dir).unwrap_or(path);
        let content_path = ContentPath::from_path(relative_path)
            .ok_or_else(|| CollectorError::InvalidPath(path.to_path_buf()))?;

        let parsed = self
            .parser
            .parse(&content, path)
            .map_err(|e| CollectorError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        Ok(Post::from_parsed(parsed, &content_path))
    }

    /// Read author profiles. A profile that cannot be read or parsed is skipped.
    fn collect_authors(&self, dir: &Path) -> Result<BTreeMap<String, Author>> {
        let mut authors = BTreeMap::new();

        for path in find_content_files(dir)? {
            let Some(slug) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to read author");
                    continue;
                }
            };
            match parse_document::<AuthorFrontmatter>(&content, &path) {
                Ok((frontmatter, body)) => {
                    let (html, _) = self.parser.markdown().render(&body);
                    debug!(author = slug, "loaded author");
                    authors.insert(slug.to_string(), Author::new(slug, frontmatter, html));
                }
                Err(e) => warn!(path = %path.display(), error = %e, "failed to parse author"),
            }
        }

        Ok(authors)
    }
}

/// Find Markdown and MDX files below a directory, skipping hidden entries.
pub fn find_content_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(ext) = entry.path().extension()
            && ContentType::from_extension(&ext.to_string_lossy()).is_some()
        {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Keep the first post for each slug. Later posts with the same slug are
/// dropped with a warning.
fn drop_duplicate_slugs(posts: Vec<Post>) -> Vec<Post> {
    let mut seen = HashSet::new();
    posts
        .into_iter()
        .filter(|post| {
            let first = seen.insert(post.slug.clone());
            if !first {
                warn!(
                    url = %post.url,
                    title = %post.title,
                    "duplicate post slug, skipping"
                );
            }
            first
        })
        .collect()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// Sort posts newest first. Undated posts go last, ordered by title.
pub fn sort_by_date(posts: &mut [Post]) {
    posts.sort_by(|a, b| match (&b.date, &a.date) {
        (Some(b_date), Some(a_date)) => b_date.cmp(a_date).then_with(|| a.title.cmp(&b.title)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.title.cmp(&b.title),
    });
}

/// Paginate a slice of items. Pages are numbered from 1.
pub fn paginate<T>(items: &[T], page: usize, per_page: usize) -> (&[T], usize) {
    let per_page = per_page.max(1);
    let total_pages = items.len().div_ceil(per_page);
    let start = page.saturating_sub(1) * per_page;
    let end = (start + per_page).min(items.len());

    if start >= items.len() {
        (&[], total_pages)
    } else {
        (&items[start..end], total_pages)
    }
}

#[cfg(test)]
mod tests {
    use scriba_core::MapEnv;

    use super::*;

    fn test_config(drafts: bool) -> Config {
        let mut config = Config::from_toml_str(
            "title = \"Test Blog\"\nsiteUrl = \"https://example.com\"\n",
            &MapEnv::new(),
        )
        .unwrap();
        config.build.drafts = drafts;
        config
    }

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn sample_site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let blog = dir.path().join("blog");
        write(
            &blog,
            "old.md",
            "---\ntitle: Old\ndate: 2023-01-01\ntags: [Go, data structures]\n---\nOld post.\n",
        );
        write(
            &blog,
            "new.md",
            "---\ntitle: New\ndate: 2024-06-01\ntags: [go]\n---\nNew post.\n",
        );
        write(
            &blog,
            "guide/index.mdx",
            "---\ntitle: Guide\ndate: 2024-01-01\ntags: [rust]\n---\nimport X from './x'\n\nGuide.\n",
        );
        write(
            &blog,
            "draft.md",
            "---\ntitle: Draft\ndate: 2025-01-01\ntags: [go, secret]\ndraft: true\n---\nWip.\n",
        );
        write(&blog, "broken.md", "---\ndate: 2024-02-02\n---\nNo title.\n");
        write(&blog, ".hidden/skip.md", "---\ntitle: Hidden\n---\n");
        write(&blog, "notes.txt", "not content");
        write(
            &dir.path().join("authors"),
            "default.md",
            "---\nname: Jane Doe\noccupation: Writer\n---\nHello **there**.\n",
        );
        dir
    }

    #[test]
    fn test_collect_orders_and_filters() {
        let site = sample_site();
        let collector = ContentCollector::new(test_config(false), site.path().join("blog"))
            .with_authors_dir(site.path().join("authors"));

        let content = collector.collect().unwrap();
        let slugs: Vec<_> = content.posts.iter().map(|p| p.slug.as_str()).collect();

        assert_eq!(slugs, vec!["new", "guide", "old"]);
        assert_eq!(content.post("guide").unwrap().url, "/blog/guide");
        assert_eq!(content.authors["default"].name, "Jane Doe");
        assert!(content.authors["default"].content.contains("<strong>there</strong>"));
    }

    #[test]
    fn test_collect_with_drafts() {
        let site = sample_site();
        let collector = ContentCollector::new(test_config(true), site.path().join("blog"));

        let content = collector.collect().unwrap();

        assert_eq!(content.posts.len(), 4);
        assert_eq!(content.posts[0].slug, "draft");
        assert_eq!(content.published().len(), 3);
        // drafts never count towards tags
        assert_eq!(content.tags.count("go"), 2);
        assert_eq!(content.tags.count("secret"), 0);
    }

    #[test]
    fn test_tag_index() {
        let site = sample_site();
        let content = ContentCollector::new(test_config(false), site.path().join("blog"))
            .collect()
            .unwrap();

        assert_eq!(content.tags.count("go"), 2);
        assert_eq!(content.tags.count("data-structures"), 1);
        assert_eq!(content.tags.name("data-structures"), "data structures");
        assert_eq!(content.tags.urls("rust"), ["/blog/guide".to_string()]);
        assert_eq!(content.tags.by_count()[0], ("go", 2));

        let json = content.tags.to_json().unwrap();
        assert_eq!(json, r#"{"data-structures":1,"go":2,"rust":1}"#);
    }

    #[test]
    fn test_neighbours() {
        let site = sample_site();
        let content = ContentCollector::new(test_config(false), site.path().join("blog"))
            .collect()
            .unwrap();

        let middle = content.neighbours("guide");
        assert_eq!(middle.prev.unwrap().slug, "old");
        assert_eq!(middle.next.unwrap().slug, "new");

        let newest = content.neighbours("new");
        assert!(newest.next.is_none());
        assert!(content.neighbours("missing").prev.is_none());
    }

    #[test]
    fn test_posts_for_tag() {
        let site = sample_site();
        let content = ContentCollector::new(test_config(false), site.path().join("blog"))
            .collect()
            .unwrap();

        let go: Vec<_> = content.posts_for_tag("go").iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(go, vec!["new", "old"]);
    }

    #[test]
    fn test_duplicate_slug_keeps_first() {
        let dir = tempfile::tempdir().unwrap();
        let blog = dir.path().join("blog");
        write(&blog, "hello/index.md", "---\ntitle: Folder\ndate: 2024-01-01\n---\nA\n");
        write(&blog, "hello.md", "---\ntitle: File\ndate: 2024-02-01\n---\nB\n");
        write(&blog, "other.md", "---\ntitle: Other\ndate: 2024-03-01\n---\nC\n");

        let content = ContentCollector::new(test_config(false), blog)
            .collect()
            .unwrap();

        let slugs: Vec<_> = content.posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["other", "hello"]);
        assert_eq!(content.post("hello").unwrap().title, "Folder");
    }

    #[test]
    fn test_unreadable_author_is_skipped() {
        let site = sample_site();
        fs::write(site.path().join("authors/garbled.md"), [0xff, 0xfe, 0x00]).unwrap();

        let content = ContentCollector::new(test_config(false), site.path().join("blog"))
            .with_authors_dir(site.path().join("authors"))
            .collect()
            .unwrap();

        assert_eq!(content.posts.len(), 3);
        assert!(content.authors.contains_key("default"));
        assert!(!content.authors.contains_key("garbled"));
    }

    #[test]
    fn test_missing_content_dir() {
        let content = ContentCollector::new(test_config(false), "/nonexistent/scriba")
            .collect()
            .unwrap();
        assert!(content.posts.is_empty());
        assert!(content.tags.is_empty());
    }

    #[test]
    fn test_paginate() {
        let items = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10];

        let (page1, total) = paginate(&items, 1, 3);
        assert_eq!(page1, &[1, 2, 3]);
        assert_eq!(total, 4);

        let (page4, _) = paginate(&items, 4, 3);
        assert_eq!(page4, &[10]);

        let (page5, _) = paginate(&items, 5, 3);
        assert!(page5.is_empty());

        let (empty, total) = paginate::<i32>(&[], 1, 0);
        assert!(empty.is_empty());
        assert_eq!(total, 0);
    }
}
