//! RSS feed generation.
//!
//! Produces the site-wide `feed.xml` and one feed per tag.

use std::io::Write;

use chrono::Utc;
use rss::{ChannelBuilder, GuidBuilder, Item, ItemBuilder};
use scriba_core::{Config, Post};
use thiserror::Error;
use tracing::debug;

/// RSS generation errors.
#[derive(Debug, Error)]
pub enum RssError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for RSS operations.
pub type Result<T> = std::result::Result<T, RssError>;

/// RSS feed generator.
#[derive(Debug)]
pub struct RssGenerator {
    config: Config,
}

impl RssGenerator {
    /// Create a new RSS generator.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Generate the site feed. Drafts are skipped and at most `feed.limit` posts are included.
    pub fn generate(&self, posts: &[&Post]) -> Result<String> {
        self.generate_channel(posts, &self.config.title, "")
    }

    /// Generate the feed of one tag.
    pub fn generate_for_tag(&self, posts: &[&Post], tag_name: &str, tag_slug: &str) -> Result<String> {
        let title = format!("{} - {tag_name}", self.config.title);
        self.generate_channel(posts, &title, &format!("tags/{tag_slug}"))
    }

    fn generate_channel(&self, posts: &[&Post], title: &str, path: &str) -> Result<String> {
        let limit = self.config.feed.limit;
        let items: Vec<Item> = posts
            .iter()
            .filter(|p| !p.draft)
            .take(limit)
            .map(|post| self.post_to_item(post))
            .collect();

        debug!(count = items.len(), limit, title, "generating RSS feed");

        let description: &str = if self.config.description.is_empty() {
            title
        } else {
            &self.config.description
        };

        let channel = ChannelBuilder::default()
            .title(title)
            .link(self.config.url_for(path))
            .description(description)
            .language(Some(self.config.language.clone()))
            .managing_editor(self.author_field())
            .webmaster(self.author_field())
            .last_build_date(Some(
                posts
                    .iter()
                    .filter_map(|p| p.lastmod.or(p.date))
                    .max()
                    .unwrap_or_else(Utc::now)
                    .to_rfc2822(),
            ))
            .items(items)
            .build();

        Ok(channel.to_string())
    }

    /// Convert a post to an RSS item.
    fn post_to_item(&self, post: &Post) -> Item {
        let url = self.config.url_for(&post.path);
        let guid = GuidBuilder::default().value(&url).permalink(true).build();

        let mut builder = ItemBuilder::default();
        builder.title(Some(post.title.clone()));
        builder.link(Some(url));
        builder.guid(Some(guid));
        builder.description(Some(post.summary.clone()));
        builder.author(self.author_field());

        if let Some(date) = post.date {
            builder.pub_date(Some(date.to_rfc2822()));
        }

        let categories: Vec<_> = post
            .tags
            .iter()
            .map(|tag| rss::Category {
                name: tag.clone(),
                domain: None,
            })
            .collect();
        if !categories.is_empty() {
            builder.categories(categories);
        }

        builder.build()
    }

    /// RSS author fields are an email address with an optional name.
    fn author_field(&self) -> Option<String> {
        if self.config.email.is_empty() {
            return None;
        }
        if self.config.author.is_empty() {
            Some(self.config.email.clone())
        } else {
            Some(format!("{} ({})", self.config.email, self.config.author))
        }
    }

    /// Write the site feed to a writer.
    pub fn write_to<W: Write>(&self, posts: &[&Post], writer: &mut W) -> Result<()> {
        let xml = self.generate(posts)?;
        writer.write_all(xml.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use scriba_core::{ContentPath, MapEnv};
    use scriba_parser::ParserRegistry;

    use super::*;

    fn test_config() -> Config {
        Config::from_toml_str(
            "title = \"Test Blog\"\nauthor = \"Jane\"\nemail = \"jane@example.com\"\ndescription = \"A test blog\"\nsiteUrl = \"https://example.com\"\n",
            &MapEnv::new(),
        )
        .unwrap()
    }

    fn post(slug: &str, date: &str, draft: bool) -> Post {
        let source = format!(
            "---\ntitle: {slug} title\ndate: {date}\ntags: [rust, web]\ndraft: {draft}\nsummary: About {slug}\n---\nBody\n"
        );
        let path = format!("{slug}.md");
        let path = Path::new(&path);
        let parsed = ParserRegistry::new().parse(&source, path).unwrap();
        Post::from_parsed(parsed, &ContentPath::from_path(path).unwrap())
    }

    #[test]
    fn test_generate_rss() {
        let generator = RssGenerator::new(test_config());
        let first = post("first", "2024-02-01", false);
        let second = post("second", "2024-01-01", false);

        let xml = generator.generate(&[&first, &second]).unwrap();

        assert!(xml.contains("<title>Test Blog</title>"));
        assert!(xml.contains("<link>https://example.com/</link>"));
        assert!(xml.contains("<link>https://example.com/blog/first</link>"));
        assert!(xml.contains("<description><![CDATA[About second]]></description>"));
        assert!(xml.contains("<category>rust</category>"));
        assert!(xml.contains("jane@example.com (Jane)"));
        assert!(xml.contains("<pubDate>Thu, "));
    }

    #[test]
    fn test_rss_limit_and_drafts() {
        let mut config = test_config();
        config.feed.limit = 1;
        let generator = RssGenerator::new(config);

        let draft = post("draft", "2025-01-01", true);
        let first = post("first", "2024-02-01", false);
        let second = post("second", "2024-01-01", false);

        let xml = generator.generate(&[&draft, &first, &second]).unwrap();

        assert!(!xml.contains("draft title"));
        assert!(xml.contains("first title"));
        assert!(!xml.contains("second title"));
    }

    #[test]
    fn test_tag_feed() {
        let generator = RssGenerator::new(test_config());
        let first = post("first", "2024-02-01", false);

        let xml = generator.generate_for_tag(&[&first], "Rust", "rust").unwrap();

        assert!(xml.contains("<title>Test Blog - Rust</title>"));
        assert!(xml.contains("<link>https://example.com/tags/rust</link>"));
    }
}
