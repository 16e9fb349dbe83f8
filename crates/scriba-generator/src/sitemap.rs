//! Sitemap generation.

use std::io::Write;

use chrono::{DateTime, Utc};
use scriba_core::Config;
use thiserror::Error;
use tracing::debug;

use crate::collector::SiteContent;

/// Sitemap generation errors.
#[derive(Debug, Error)]
pub enum SitemapError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sitemap operations.
pub type Result<T> = std::result::Result<T, SitemapError>;

/// Routes that exist on every site.
pub const STATIC_ROUTES: [&str; 4] = ["", "blog", "tags", "about"];

/// Change frequency for sitemap entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFreq {
    Daily,
    Weekly,
    Monthly,
}

impl ChangeFreq {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

/// A sitemap URL entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapUrl {
    /// Absolute URL.
    pub loc: String,

    /// Last modification date.
    pub lastmod: Option<DateTime<Utc>>,

    pub changefreq: Option<ChangeFreq>,

    /// Priority (0.0 to 1.0).
    pub priority: Option<f32>,
}

/// Sitemap generator.
#[derive(Debug)]
pub struct SitemapGenerator {
    config: Config,
}

impl SitemapGenerator {
    /// Create a new sitemap generator.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Entries for published posts followed by the static routes.
    ///
    /// Posts use `lastmod`, falling back to `date`. Static routes are stamped with `now`.
    pub fn urls(&self, site: &SiteContent, now: DateTime<Utc>) -> Vec<SitemapUrl> {
        let posts = site.published().into_iter().map(|post| SitemapUrl {
            loc: self.config.url_for(&post.path),
            lastmod: post.lastmod.or(post.date),
            changefreq: Some(ChangeFreq::Monthly),
            priority: Some(0.8),
        });

        let routes = STATIC_ROUTES.iter().map(|route| SitemapUrl {
            loc: self.config.url_for(route),
            lastmod: Some(now),
            changefreq: Some(if route.is_empty() {
                ChangeFreq::Daily
            } else {
                ChangeFreq::Weekly
            }),
            priority: Some(if route.is_empty() { 1.0 } else { 0.5 }),
        });

        posts.chain(routes).collect()
    }

    /// Generate sitemap XML.
    pub fn generate(&self, site: &SiteContent) -> String {
        let urls = self.urls(site, Utc::now());
        debug!(count = urls.len(), "generating sitemap");

        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
        xml.push('\n');

        for url in &urls {
            xml.push_str(&url_to_xml(url));
        }

        xml.push_str("</urlset>\n");
        xml
    }

    /// Write sitemap to a writer.
    pub fn write_to<W: Write>(&self, site: &SiteContent, writer: &mut W) -> Result<()> {
        writer.write_all(self.generate(site).as_bytes())?;
        Ok(())
    }
}

fn url_to_xml(url: &SitemapUrl) -> String {
    let mut xml = String::from("  <url>\n");

    xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&url.loc)));

    if let Some(lastmod) = &url.lastmod {
        xml.push_str(&format!(
            "    <lastmod>{}</lastmod>\n",
            lastmod.format("%Y-%m-%d")
        ));
    }

    if let Some(changefreq) = &url.changefreq {
        xml.push_str(&format!(
            "    <changefreq>{}</changefreq>\n",
            changefreq.as_str()
        ));
    }

    if let Some(priority) = &url.priority {
        xml.push_str(&format!("    <priority>{priority:.1}</priority>\n"));
    }

    xml.push_str("  </url>\n");
    xml
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
