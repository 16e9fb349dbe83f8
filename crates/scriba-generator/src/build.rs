//! Build orchestration.
//!
//! Coordinates the full site build process.

use std::{
    fs,
    io::BufWriter,
    path::{Path, PathBuf},
    time::Instant,
};

use rayon::prelude::*;
use scriba_core::{Author, AuthorFrontmatter, Config, Post};
use scriba_search::{SearchError, SearchIndex};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    assets::{AssetError, AssetProcessor},
    collector::{CollectorError, ContentCollector, SiteContent, paginate},
    html::{HtmlError, HtmlGenerator, output_path, page_path},
    robots::RobotsGenerator,
    rss::{RssError, RssGenerator},
    sitemap::{SitemapError, SitemapGenerator},
    template::{TemplateError, TemplateRegistry},
};

/// Build errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Collector error.
    #[error("collector error: {0}")]
    Collector(#[from] CollectorError),

    /// Template loading error.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// HTML generation error.
    #[error("HTML error: {0}")]
    Html(#[from] HtmlError),

    /// RSS generation error.
    #[error("RSS error: {0}")]
    Rss(#[from] RssError),

    /// Sitemap generation error.
    #[error("sitemap error: {0}")]
    Sitemap(#[from] SitemapError),

    /// Asset error.
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),

    /// Search documents error.
    #[error("search error: {0}")]
    Search(#[from] SearchError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Build statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildStats {
    /// Number of post pages generated.
    pub posts: usize,

    /// Number of listing, tag and other pages generated.
    pub pages: usize,

    /// Number of tag listing pages generated.
    pub tag_pages: usize,

    /// Number of RSS feeds written.
    pub feeds: usize,

    /// Number of static files copied.
    pub assets: usize,

    /// Build duration in milliseconds.
    pub duration_ms: u64,
}

/// Site builder that orchestrates the build process.
#[derive(Debug)]
pub struct Builder {
    config: Config,
    content_dir: PathBuf,
    output_dir: PathBuf,
    authors_dir: Option<PathBuf>,
    static_dir: Option<PathBuf>,
    layouts_dir: Option<PathBuf>,
}

impl Builder {
    /// Create a new builder.
    #[must_use]
    pub fn new(
        config: Config,
        content_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            content_dir: content_dir.into(),
            output_dir: output_dir.into(),
            authors_dir: None,
            static_dir: None,
            layouts_dir: None,
        }
    }

    /// Create a builder with every directory taken from the `build` settings,
    /// resolved against the site root.
    #[must_use]
    pub fn from_site_root(config: Config, root: &Path) -> Self {
        let build = config.build.clone();
        Self::new(config, root.join(&build.content_dir), root.join(&build.output_dir))
            .with_authors_dir(root.join(&build.authors_dir))
            .with_static_dir(root.join(&build.static_dir))
            .with_layouts_dir(root.join("layouts"))
    }

    /// Set the author profiles directory.
    #[must_use]
    pub fn with_authors_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.authors_dir = Some(dir.into());
        self
    }

    /// Set the static assets directory.
    #[must_use]
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Set the directory holding template overrides.
    #[must_use]
    pub fn with_layouts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.layouts_dir = Some(dir.into());
        self
    }

    /// Override the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Execute the full build process.
    pub fn build(&self) -> Result<BuildStats> {
        let start = Instant::now();
        let mut stats = BuildStats::default();

        info!(
            content = %self.content_dir.display(),
            output = %self.output_dir.display(),
            "starting build"
        );

        // 1. Clean output directory
        self.clean_output()?;

        // 2. Collect content
        let mut collector = ContentCollector::new(self.config.clone(), &self.content_dir);
        if let Some(dir) = &self.authors_dir {
            collector = collector.with_authors_dir(dir);
        }
        let content = collector.collect()?;

        // 3. Load templates
        let mut templates = TemplateRegistry::new();
        if let Some(dir) = &self.layouts_dir {
            templates.load_overrides(dir)?;
        }
        let generator = HtmlGenerator::with_templates(self.config.clone(), templates);

        // 4. Generate pages
        stats.posts = self.generate_posts(&generator, &content)?;
        stats.pages = self.generate_listing_pages(&generator, &content)?;
        stats.tag_pages = self.generate_tag_pages(&generator, &content)?;
        stats.pages += stats.tag_pages;

        // 5. Feeds, sitemap, robots
        if self.config.feed.enabled {
            stats.feeds = self.generate_feeds(&content)?;
        }
        self.generate_sitemap(&content)?;
        RobotsGenerator::new(self.config.clone()).write(&self.output_dir)?;

        // 6. Data files
        self.write_data_files(&content)?;

        // 7. Stylesheets and static assets
        let assets = AssetProcessor::new();
        assets.write_stylesheets(
            &self.output_dir,
            collector.parser().highlighter(),
            &self.config.build.syntax_theme,
            &self.config.build.syntax_theme_dark,
        )?;
        if let Some(static_dir) = &self.static_dir {
            stats.assets = assets.process(static_dir, &self.output_dir)?.len();
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            posts = stats.posts,
            pages = stats.pages,
            tag_pages = stats.tag_pages,
            feeds = stats.feeds,
            assets = stats.assets,
            duration_ms = stats.duration_ms,
            "build complete"
        );

        Ok(stats)
    }

    /// Clean the output directory.
    fn clean_output(&self) -> Result<()> {
        if self.output_dir.exists() {
            debug!(dir = %self.output_dir.display(), "cleaning output directory");
            fs::remove_dir_all(&self.output_dir)?;
        }
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    fn write_page(&self, path: &str, html: &str) -> Result<()> {
        let output_path = output_path(&self.output_dir, path);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output_path, html)?;
        debug!(path = %output_path.display(), "wrote page");
        Ok(())
    }

    /// Generate one page per post. A post that fails to render is logged and skipped.
    fn generate_posts(&self, generator: &HtmlGenerator, content: &SiteContent) -> Result<usize> {
        info!(count = content.posts.len(), "generating post pages");

        let results: Vec<_> = content
            .posts
            .par_iter()
            .map(|post| {
                let html = generator.generate_post(post, content)?;
                self.write_page(&post.path, &html)?;
                Ok::<_, BuildError>(())
            })
            .collect();

        let mut count = 0;
        for (result, post) in results.into_iter().zip(&content.posts) {
            match result {
                Ok(()) => count += 1,
                Err(e) => warn!(url = %post.url, error = %e, "failed to generate post"),
            }
        }

        Ok(count)
    }

    /// Home, `/blog` pages, `/tags`, `/about` and `404.html`.
    fn generate_listing_pages(
        &self,
        generator: &HtmlGenerator,
        content: &SiteContent,
    ) -> Result<usize> {
        let posts: Vec<&Post> = content.posts.iter().collect();
        let mut count = 0;

        self.write_page("", &generator.generate_home(&posts)?)?;
        count += 1;

        count += self.write_paginated(generator, "All Posts", "blog", &posts, content)?;

        self.write_page("tags", &generator.generate_tags_index(&content.tags)?)?;
        count += 1;

        let fallback;
        let author = match content.authors.get("default") {
            Some(author) => author,
            None => {
                fallback = Author::new(
                    "default",
                    AuthorFrontmatter {
                        name: self.config.author.clone(),
                        ..Default::default()
                    },
                    String::new(),
                );
                &fallback
            }
        };
        self.write_page("about", &generator.generate_author(author)?)?;
        count += 1;

        fs::write(self.output_dir.join("404.html"), generator.generate_not_found()?)?;
        count += 1;

        Ok(count)
    }

    /// Paginated listing of published posts for every tag.
    fn generate_tag_pages(&self, generator: &HtmlGenerator, content: &SiteContent) -> Result<usize> {
        let mut count = 0;

        for slug in content.tags.counts().keys() {
            let posts: Vec<&Post> = content
                .posts_for_tag(slug)
                .into_iter()
                .filter(|p| !p.draft)
                .collect();
            let title = content.tags.name(slug).to_string();
            count += self.write_paginated(generator, &title, &format!("tags/{slug}"), &posts, content)?;
        }

        Ok(count)
    }

    fn write_paginated(
        &self,
        generator: &HtmlGenerator,
        title: &str,
        base_path: &str,
        posts: &[&Post],
        content: &SiteContent,
    ) -> Result<usize> {
        let per_page = self.config.build.posts_per_page;
        let (_, total) = paginate(posts, 1, per_page);
        let total = total.max(1);

        for page in 1..=total {
            let (items, _) = paginate(posts, page, per_page);
            let html =
                generator.generate_list_page(title, items, page, total, base_path, &content.tags)?;
            self.write_page(&page_path(base_path, page), &html)?;
        }

        Ok(total)
    }

    /// `feed.xml` and, when enabled, one feed per tag.
    fn generate_feeds(&self, content: &SiteContent) -> Result<usize> {
        let generator = RssGenerator::new(self.config.clone());
        let published = content.published();

        let mut file = BufWriter::new(fs::File::create(self.output_dir.join("feed.xml"))?);
        generator.write_to(&published, &mut file)?;
        let mut count = 1;

        if self.config.feed.tag_feeds {
            for slug in content.tags.counts().keys() {
                let posts: Vec<&Post> = content
                    .posts_for_tag(slug)
                    .into_iter()
                    .filter(|p| !p.draft)
                    .collect();
                let xml = generator.generate_for_tag(&posts, content.tags.name(slug), slug)?;

                let dir = self.output_dir.join("tags").join(slug);
                fs::create_dir_all(&dir)?;
                fs::write(dir.join("feed.xml"), xml)?;
                count += 1;
            }
        }

        info!(count, "generated RSS feeds");
        Ok(count)
    }

    fn generate_sitemap(&self, content: &SiteContent) -> Result<()> {
        let generator = SitemapGenerator::new(self.config.clone());
        let output_path = self.output_dir.join("sitemap.xml");

        let mut file = BufWriter::new(fs::File::create(&output_path)?);
        generator.write_to(content, &mut file)?;

        info!(path = %output_path.display(), "generated sitemap");
        Ok(())
    }

    /// `tag-data.json` and, for kbar search, the search documents.
    fn write_data_files(&self, content: &SiteContent) -> Result<()> {
        fs::write(self.output_dir.join("tag-data.json"), content.tags.to_json()?)?;

        if let Some(path) = self.config.search_documents_path() {
            let index = SearchIndex::from_posts(&content.posts);
            let path = self.output_dir.join(path.trim_start_matches('/'));
            index.write_to_file(&path)?;
            info!(path = %path.display(), documents = index.len(), "wrote search documents");
        }

        Ok(())
    }
}
