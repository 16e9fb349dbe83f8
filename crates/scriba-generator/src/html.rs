//! HTML generation from collected content.
//!
//! Every page is an inner template wrapped in the `base` shell.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use scriba_core::{Author, Config, Post, PostLayout, slugify};
use scriba_parser::{html_escape, mdx::TocInlineOptions};
use thiserror::Error;
use tracing::debug;

use crate::{
    collector::{Neighbours, SiteContent, TagIndex},
    integrations,
    template::{TemplateContext, TemplateError, TemplateRegistry},
};

/// HTML generation errors.
#[derive(Debug, Error)]
pub enum HtmlError {
    /// Template error.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// Structured data serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for HTML generation.
pub type Result<T> = std::result::Result<T, HtmlError>;

/// Head metadata of one page.
#[derive(Debug, Clone)]
struct PageMeta<'a> {
    title: String,
    description: &'a str,
    /// Site-relative path without leading slash.
    path: &'a str,
    canonical_url: Option<&'a str>,
    og_type: &'static str,
    image: Option<&'a str>,
}

/// HTML page generator.
#[derive(Debug)]
pub struct HtmlGenerator {
    templates: TemplateRegistry,
    config: Config,
}

impl HtmlGenerator {
    /// Create a new HTML generator with the built-in templates.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            templates: TemplateRegistry::new(),
            config,
        }
    }

    /// Create a generator with custom templates.
    #[must_use]
    pub fn with_templates(config: Config, templates: TemplateRegistry) -> Self {
        Self { templates, config }
    }

    /// Generate the page for one post.
    pub fn generate_post(&self, post: &Post, site: &SiteContent) -> Result<String> {
        debug!(url = %post.url, layout = post.layout.as_str(), "generating post");

        let authors = site.authors_for(post);
        let structured_data = post.structured_data(&self.config, &authors);
        // keep `</script>` inside strings from closing the JSON-LD block
        let structured_data = serde_json::to_string(&structured_data)?.replace("</", "<\\/");

        let mut ctx = TemplateContext::new()
            .with_var("title", html_escape(&post.title))
            .with_var("content", &post.content)
            .with_var("reading_time", &post.reading_time.text)
            .with_var("structured_data", structured_data);

        ctx.insert_non_empty("date_html", post.date.map(date_html).unwrap_or_default());
        ctx.insert_non_empty("tags_html", post_tags_html(&post.tags));
        ctx.insert_non_empty("authors_html", authors_html(&authors));
        ctx.insert_non_empty("toc_html", toc_html(post));
        ctx.insert_non_empty("source_html", self.source_links_html(post));
        ctx.insert_non_empty(
            "comments_html",
            integrations::comments_html(&self.config, &self.config.url_for(&post.path), &post.path),
        );
        ctx.insert_non_empty("post_nav_html", post_nav_html(site.neighbours(&post.slug)));

        let banner = post
            .images
            .first()
            .map(String::as_str)
            .unwrap_or(&self.config.social_banner);
        if !banner.is_empty() {
            ctx.insert(
                "banner_html",
                format!(
                    r#"<img src="{}" alt="{}" loading="lazy" />"#,
                    html_escape(banner),
                    html_escape(&post.title)
                ),
            );
        }

        let template = match post.layout {
            PostLayout::PostLayout => "post",
            PostLayout::PostSimple => "post_simple",
            PostLayout::PostBanner => "post_banner",
        };
        let inner_html = self.templates.render(template, &ctx)?;

        self.wrap(
            PageMeta {
                title: format!("{} | {}", post.title, self.config.title),
                description: &post.summary,
                path: &post.path,
                canonical_url: post.canonical_url.as_deref(),
                og_type: "article",
                image: post.images.first().map(String::as_str),
            },
            &inner_html,
        )
    }

    /// Generate the landing page with the latest posts.
    pub fn generate_home(&self, posts: &[&Post]) -> Result<String> {
        let max_display = self.config.build.max_display;
        let items: String = posts.iter().take(max_display).map(|p| list_item_html(p)).collect();

        let mut ctx = TemplateContext::new().with_var("items", items_or_empty(items));
        ctx.insert_non_empty("description", html_escape(&self.config.description));
        ctx.insert_non_empty("newsletter_html", integrations::newsletter_html(&self.config));
        if posts.len() > max_display {
            ctx.insert(
                "more_html",
                r#"<p class="more"><a href="/blog" aria-label="All posts">All Posts &rarr;</a></p>"#,
            );
        }

        let inner_html = self.templates.render("home", &ctx)?;
        self.wrap(
            PageMeta {
                title: self.config.title.clone(),
                description: &self.config.description,
                path: "",
                canonical_url: None,
                og_type: "website",
                image: None,
            },
            &inner_html,
        )
    }

    /// Generate one page of a post listing.
    ///
    /// `base_path` is the site-relative listing path, e.g. `blog` or `tags/rust`.
    pub fn generate_list_page(
        &self,
        title: &str,
        posts: &[&Post],
        current: usize,
        total: usize,
        base_path: &str,
        tags: &TagIndex,
    ) -> Result<String> {
        let items: String = posts.iter().map(|p| list_item_html(p)).collect();

        let mut ctx = TemplateContext::new()
            .with_var("title", html_escape(title))
            .with_var("items", items_or_empty(items));
        ctx.insert_non_empty("sidebar_html", tag_sidebar_html(tags, base_path));
        if let Some(pagination) = pagination_html(current, total, &format!("/{base_path}")) {
            ctx.insert("pagination", pagination);
        }

        let inner_html = self.templates.render("list", &ctx)?;

        let path = page_path(base_path, current);
        self.wrap(
            PageMeta {
                title: format!("{title} | {}", self.config.title),
                description: &self.config.description,
                path: &path,
                canonical_url: None,
                og_type: "website",
                image: None,
            },
            &inner_html,
        )
    }

    /// Generate the tags overview page.
    pub fn generate_tags_index(&self, tags: &TagIndex) -> Result<String> {
        let items: String = tags
            .by_count()
            .into_iter()
            .map(|(slug, count)| {
                format!(
                    r#"<li><a class="tag" href="/tags/{slug}" aria-label="View posts tagged {name}">{name}</a> <span class="count">({count})</span></li>"#,
                    name = html_escape(tags.name(slug)),
                )
            })
            .collect();

        let ctx = TemplateContext::new().with_var(
            "items",
            if items.is_empty() {
                "<li>No tags found.</li>".to_string()
            } else {
                items
            },
        );
        let inner_html = self.templates.render("tags", &ctx)?;

        self.wrap(
            PageMeta {
                title: format!("Tags | {}", self.config.title),
                description: "Things I blog about",
                path: "tags",
                canonical_url: None,
                og_type: "website",
                image: None,
            },
            &inner_html,
        )
    }

    /// Generate an author profile page.
    pub fn generate_author(&self, author: &Author) -> Result<String> {
        let mut ctx = TemplateContext::new()
            .with_var("name", html_escape(&author.name))
            .with_var("content", &author.content);

        if let Some(avatar) = &author.avatar {
            ctx.insert(
                "avatar_html",
                format!(
                    r#"<img class="avatar" src="{}" alt="avatar" width="192" height="192" />"#,
                    html_escape(avatar)
                ),
            );
        }
        ctx.insert_non_empty("occupation", author.occupation.as_deref().map(html_escape).unwrap_or_default());
        ctx.insert_non_empty("company", author.company.as_deref().map(html_escape).unwrap_or_default());

        let links = [
            ("mail", author.email.as_deref()),
            ("github", author.github.as_deref()),
            ("linkedin", author.linkedin.as_deref()),
            ("x", author.twitter.as_deref()),
            ("bluesky", author.bluesky.as_deref()),
        ];
        ctx.insert_non_empty(
            "social_html",
            links
                .into_iter()
                .filter_map(|(kind, href)| href.filter(|h| !h.is_empty()).map(|h| social_link_html(kind, h)))
                .collect::<String>(),
        );

        let inner_html = self.templates.render("author", &ctx)?;
        self.wrap(
            PageMeta {
                title: format!("About - {} | {}", author.name, self.config.title),
                description: &self.config.description,
                path: "about",
                canonical_url: None,
                og_type: "profile",
                image: author.avatar.as_deref(),
            },
            &inner_html,
        )
    }

    /// Generate the page served for unknown routes.
    pub fn generate_not_found(&self) -> Result<String> {
        let inner_html = self.templates.render("not_found", &TemplateContext::new())?;
        self.wrap(
            PageMeta {
                title: format!("Page Not Found | {}", self.config.title),
                description: &self.config.description,
                path: "404",
                canonical_url: None,
                og_type: "website",
                image: None,
            },
            &inner_html,
        )
    }

    /// Wrap inner HTML in the base shell.
    fn wrap(&self, meta: PageMeta<'_>, inner_html: &str) -> Result<String> {
        let config = &self.config;
        let canonical_url = meta
            .canonical_url
            .map(str::to_string)
            .unwrap_or_else(|| config.url_for(meta.path));

        let mut ctx = TemplateContext::new()
            .with_var("lang", &config.language)
            .with_var("theme", config.theme.as_str())
            .with_var("locale", &config.locale)
            .with_var("title", html_escape(&meta.title))
            .with_var("canonical_url", html_escape(&canonical_url))
            .with_var("og_type", meta.og_type)
            .with_var("site_title", html_escape(&config.title))
            .with_var("header_title", html_escape(config.header_title()))
            .with_var("year", Utc::now().year().to_string())
            .with_var("content", inner_html);

        ctx.insert_non_empty("description", html_escape(meta.description));
        ctx.insert_non_empty("author", html_escape(&config.author));
        if config.sticky_nav {
            ctx.insert("sticky_class", " sticky");
        }
        if !config.site_logo.is_empty() {
            ctx.insert(
                "logo_html",
                format!(
                    r#"<img class="site-logo" src="{}" alt="" width="32" height="32" />"#,
                    html_escape(&config.site_logo)
                ),
            );
        }

        let image = meta.image.unwrap_or(&config.social_banner);
        if !image.is_empty() {
            let image = if image.starts_with('/') {
                config.url_for(image)
            } else {
                image.to_string()
            };
            ctx.insert("og_image", html_escape(&image));
        }

        ctx.insert_non_empty(
            "social_html",
            config
                .social_links()
                .into_iter()
                .map(|link| social_link_html(link.kind, link.href))
                .collect::<String>(),
        );
        ctx.insert_non_empty("head_extra", integrations::analytics_html(&config.analytics));
        ctx.insert_non_empty("search_button", integrations::search_button_html(config));
        ctx.insert_non_empty("body_extra", integrations::search_script_html(config));

        Ok(self.templates.render("base", &ctx)?)
    }

    /// "View on GitHub" and "Discuss on X" links of a post.
    fn source_links_html(&self, post: &Post) -> String {
        let discuss = format!(
            r#"<a href="https://x.com/search?q={}" rel="nofollow">Discuss on X</a>"#,
            html_escape(&self.config.url_for(&post.path))
        );

        let source = match (&post.source_path, self.config.site_repo.is_empty()) {
            (Some(source), false) => format!(
                r#" &bull; <a href="{}/blob/main/{}/{}">View on GitHub</a>"#,
                html_escape(self.config.site_repo.trim_end_matches('/')),
                html_escape(self.config.build.content_dir.trim_matches('/')),
                html_escape(&source.to_string_lossy().replace('\\', "/")),
            ),
            _ => String::new(),
        };

        format!("{discuss}{source}")
    }
}

/// Output file for a site-relative path: `blog/a` → `<out>/blog/a/index.html`.
pub fn output_path(output_dir: &Path, path: &str) -> PathBuf {
    let path = path.trim_matches('/');
    if path.is_empty() {
        output_dir.join("index.html")
    } else {
        output_dir.join(path).join("index.html")
    }
}

/// Site-relative path of a listing page. Page 1 lives at the listing root.
pub fn page_path(base_path: &str, page: usize) -> String {
    if page <= 1 {
        base_path.to_string()
    } else {
        format!("{base_path}/page/{page}")
    }
}

fn items_or_empty(items: String) -> String {
    if items.is_empty() {
        "<li>No posts found.</li>".to_string()
    } else {
        items
    }
}

fn date_html(date: DateTime<Utc>) -> String {
    format!(
        r#"<time datetime="{}">{}</time>"#,
        date.to_rfc3339(),
        date.format("%A, %B %-d, %Y")
    )
}

fn tag_link_html(tag: &str) -> String {
    format!(
        r#"<a class="tag" href="/tags/{}">{}</a>"#,
        slugify(tag),
        html_escape(tag)
    )
}

fn post_tags_html(tags: &[String]) -> String {
    if tags.is_empty() {
        return String::new();
    }
    let links: String = tags.iter().map(|t| tag_link_html(t)).collect();
    format!(r#"<div class="post-tags"><h2>Tags</h2>{links}</div>"#)
}

fn authors_html(authors: &[&Author]) -> String {
    authors
        .iter()
        .map(|author| {
            let avatar = author
                .avatar
                .as_deref()
                .map(|a| {
                    format!(
                        r#"<img class="avatar" src="{}" alt="avatar" width="38" height="38" />"#,
                        html_escape(a)
                    )
                })
                .unwrap_or_default();
            let twitter = author
                .twitter
                .as_deref()
                .filter(|t| !t.is_empty())
                .map(|t| {
                    format!(
                        r#"<a href="{}">{}</a>"#,
                        html_escape(t),
                        html_escape(t.trim_end_matches('/').rsplit('/').next().unwrap_or(t))
                    )
                })
                .unwrap_or_default();
            format!(
                r#"<li class="post-author">{avatar}<span class="name">{}</span>{twitter}</li>"#,
                html_escape(&author.name)
            )
        })
        .collect()
}

fn toc_html(post: &Post) -> String {
    if post.toc.is_empty() {
        return String::new();
    }
    let options = TocInlineOptions {
        from_heading: 2,
        as_disclosure: true,
        ..Default::default()
    };
    let html = options.render(&post.toc);
    if html.contains("<li>") { html } else { String::new() }
}

fn post_nav_html(neighbours: Neighbours<'_>) -> String {
    let mut parts = Vec::new();
    if let Some(prev) = neighbours.prev {
        parts.push(format!(
            r#"<div class="post-prev"><h2>Previous Article</h2><a href="{}">{}</a></div>"#,
            prev.url,
            html_escape(&prev.title)
        ));
    }
    if let Some(next) = neighbours.next {
        parts.push(format!(
            r#"<div class="post-next"><h2>Next Article</h2><a href="{}">{}</a></div>"#,
            next.url,
            html_escape(&next.title)
        ));
    }

    if parts.is_empty() {
        String::new()
    } else {
        format!(r#"<nav class="post-nav">{}</nav>"#, parts.concat())
    }
}

fn social_link_html(kind: &str, href: &str) -> String {
    let href = if kind == "mail" && !href.starts_with("mailto:") {
        format!("mailto:{href}")
    } else {
        href.to_string()
    };
    format!(
        r#"<a class="social social-{kind}" href="{}" target="_blank" rel="noopener noreferrer"><span class="sr-only">{kind}</span></a>"#,
        html_escape(&href)
    )
}

fn tag_sidebar_html(tags: &TagIndex, base_path: &str) -> String {
    if tags.is_empty() {
        return String::new();
    }

    let current = base_path.strip_prefix("tags/");
    let items: String = tags
        .counts()
        .iter()
        .map(|(slug, count)| {
            let name = html_escape(tags.name(slug));
            if current == Some(slug.as_str()) {
                format!(r#"<li class="active"><h3>{name} ({count})</h3></li>"#)
            } else {
                format!(r#"<li><a href="/tags/{slug}" aria-label="View posts tagged {name}">{name} ({count})</a></li>"#)
            }
        })
        .collect();

    format!(r#"<h3><a href="/blog">All Posts</a></h3><ul>{items}</ul>"#)
}

/// Generate HTML for a list item.
pub fn list_item_html(post: &Post) -> String {
    let date = post.date.map(date_html).unwrap_or_default();
    let tags: String = post.tags.iter().map(|t| tag_link_html(t)).collect();
    let draft = if post.draft {
        r#" <span class="draft-badge">Draft</span>"#
    } else {
        ""
    };

    format!(
        r#"<li class="post-item">
    <article>
        <dl><dt class="sr-only">Published on</dt><dd>{date}</dd></dl>
        <h2><a href="{url}" class="post-title">{title}</a>{draft}</h2>
        <div class="post-tags">{tags}</div>
        <p class="post-summary">{summary}</p>
    </article>
</li>"#,
        url = post.url,
        title = html_escape(&post.title),
        summary = html_escape(&post.summary),
    )
}

/// Generate pagination HTML.
pub fn pagination_html(current: usize, total: usize, base_url: &str) -> Option<String> {
    if total <= 1 {
        return None;
    }

    let prev = if current > 1 {
        format!(
            r#"<a href="/{}" rel="prev">Previous</a>"#,
            page_path(base_url.trim_start_matches('/'), current - 1)
        )
    } else {
        r#"<button disabled>Previous</button>"#.to_string()
    };
    let next = if current < total {
        format!(
            r#"<a href="/{}" rel="next">Next</a>"#,
            page_path(base_url.trim_start_matches('/'), current + 1)
        )
    } else {
        r#"<button disabled>Next</button>"#.to_string()
    };

    Some(format!(
        r#"<nav class="pagination">{prev}<span>{current} of {total}</span>{next}</nav>"#
    ))
}

#[cfg(test)]
mod tests {
    use scriba_core::{ContentPath, MapEnv};
    use scriba_parser::ParserRegistry;

    use super::*;

    fn test_config(extra: &str) -> Config {
        let toml = format!(
            "title = \"Test Blog\"\nauthor = \"Jane\"\nsiteUrl = \"https://example.com\"\nsiteRepo = \"https://github.com/me/blog\"\nsocialBanner = \"/static/banner.png\"\n{extra}"
        );
        Config::from_toml_str(&toml, &MapEnv::new()).unwrap()
    }

    fn post(relative: &str, source: &str) -> Post {
        let path = Path::new(relative);
        let parsed = ParserRegistry::new().parse(source, path).unwrap();
        Post::from_parsed(parsed, &ContentPath::from_path(path).unwrap())
    }

    fn site(posts: Vec<Post>) -> SiteContent {
        let tags = TagIndex::from_posts(&posts);
        SiteContent {
            posts,
            tags,
            ..Default::default()
        }
    }

    fn sample_site() -> SiteContent {
        site(vec![
            post(
                "newer.md",
                "---\ntitle: Newer & Better\ndate: 2024-02-01\ntags: [Rust]\n---\n## Intro\n\nBody.\n",
            ),
            post(
                "older.md",
                "---\ntitle: Older\ndate: 2023-02-01\ntags: [Rust, web dev]\nlayout: PostSimple\n---\nOld body.\n",
            ),
        ])
    }

    #[test]
    fn test_generate_post() {
        let site = sample_site();
        let generator = HtmlGenerator::new(test_config(""));

        let html = generator.generate_post(&site.posts[1], &site).unwrap();

        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("<title>Older | Test Blog</title>"));
        assert!(html.contains("post-simple"));
        assert!(html.contains(r#"<link rel="canonical" href="https://example.com/blog/older">"#));
        assert!(html.contains(r#"href="/blog/newer""#));
        assert!(html.contains("Next Article"));
        assert!(!html.contains("Previous Article"));
        assert!(html.contains(r#""@type":"BlogPosting""#));
        assert!(html.contains(r#"content="https://example.com/static/banner.png""#));
        assert!(!html.contains("class=\"comments\""));
    }

    #[test]
    fn test_post_layout_and_links() {
        let site = sample_site();
        let generator = HtmlGenerator::new(test_config(""));

        let html = generator.generate_post(&site.posts[0], &site).unwrap();

        assert!(html.contains("post-layout"));
        assert!(html.contains("<title>Newer &amp; Better | Test Blog</title>"));
        assert!(html.contains(r#"<a class="tag" href="/tags/rust">Rust</a>"#));
        assert!(html.contains("https://github.com/me/blog/blob/main/data/blog/newer.md"));
        assert!(html.contains(r##"<a href="#intro">Intro</a>"##));
        assert!(html.contains("Thursday, February 1, 2024"));
    }

    #[test]
    fn test_post_with_comments() {
        let site = sample_site();
        let generator = HtmlGenerator::new(test_config(
            "[comments]\nprovider = \"disqus\"\n[comments.disqusConfig]\nshortname = \"tb\"\n",
        ));

        let html = generator.generate_post(&site.posts[0], &site).unwrap();
        assert!(html.contains("tb.disqus.com"));
    }

    #[test]
    fn test_generate_home() {
        let site = sample_site();
        let mut config = test_config("description = \"Notes\"\n[newsletter]\nprovider = \"mailchimp\"\n");
        config.build.max_display = 1;
        let generator = HtmlGenerator::new(config);

        let html = generator.generate_home(&site.published()).unwrap();

        assert!(html.contains("<title>Test Blog</title>"));
        assert!(html.contains("Newer &amp; Better"));
        assert!(!html.contains(r#"href="/blog/older""#));
        assert!(html.contains("All Posts &rarr;"));
        assert!(html.contains(r#"class="newsletter""#));
    }

    #[test]
    fn test_generate_list_page() {
        let site = sample_site();
        let generator = HtmlGenerator::new(test_config(""));
        let posts = site.published();

        let html = generator
            .generate_list_page("All Posts", &posts[1..], 2, 2, "blog", &site.tags)
            .unwrap();

        assert!(html.contains(r#"href="https://example.com/blog/page/2""#));
        assert!(html.contains(r#"<a href="/blog" rel="prev">Previous</a>"#));
        assert!(html.contains("2 of 2"));
        assert!(html.contains(r#"<a href="/tags/web-dev" aria-label="View posts tagged web dev">web dev (1)</a>"#));
    }

    #[test]
    fn test_generate_tags_index() {
        let site = sample_site();
        let generator = HtmlGenerator::new(test_config(""));

        let html = generator.generate_tags_index(&site.tags).unwrap();

        let rust = html.find("/tags/rust").unwrap();
        let web = html.find("/tags/web-dev").unwrap();
        assert!(rust < web);
        assert!(html.contains("<span class=\"count\">(2)</span>"));
    }

    #[test]
    fn test_generate_author_and_not_found() {
        let generator = HtmlGenerator::new(test_config(""));
        let author = Author::new(
            "default",
            scriba_core::AuthorFrontmatter {
                name: "Jane Doe".to_string(),
                occupation: Some("Writer".to_string()),
                github: Some("https://github.com/jane".to_string()),
                ..Default::default()
            },
            "<p>Bio</p>".to_string(),
        );

        let html = generator.generate_author(&author).unwrap();
        assert!(html.contains("<h1>Jane Doe</h1>"));
        assert!(html.contains("<p>Bio</p>"));
        assert!(html.contains("social-github"));

        let html = generator.generate_not_found().unwrap();
        assert!(html.contains("<h1>404</h1>"));
    }

    #[test]
    fn test_pagination_html() {
        assert!(pagination_html(1, 1, "/blog").is_none());

        let html = pagination_html(1, 3, "/blog").unwrap();
        assert!(html.contains(r#"<a href="/blog/page/2" rel="next">Next</a>"#));
        assert!(html.contains("<button disabled>Previous</button>"));

        let html = pagination_html(3, 3, "/tags/rust").unwrap();
        assert!(html.contains(r#"<a href="/tags/rust/page/2" rel="prev">Previous</a>"#));
    }

    #[test]
    fn test_output_path() {
        let out = Path::new("out");
        assert_eq!(output_path(out, ""), PathBuf::from("out/index.html"));
        assert_eq!(output_path(out, "blog/a"), PathBuf::from("out/blog/a/index.html"));
        assert_eq!(page_path("blog", 1), "blog");
        assert_eq!(page_path("blog", 3), "blog/page/3");
    }
}
