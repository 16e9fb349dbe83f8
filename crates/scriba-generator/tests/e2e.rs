//! End-to-end tests for Scriba.
//!
//! These tests exercise the demo site and verify core functionality.

use std::{fs, path::Path};

use scriba_core::{Config, MapEnv};
use scriba_generator::{Builder, ContentCollector};
use scriba_parser::ParserRegistry;

const SITE_ROOT: &str = "../../demos/blog";

fn site_config() -> Option<Config> {
    let config_path = Path::new(SITE_ROOT).join("config.toml");
    if !config_path.exists() {
        // Skip if running from different working directory
        return None;
    }
    let env = MapEnv::new().with("GISCUS_REPO", "scriba-blog/starter");
    Some(Config::load_with(&config_path, &env).expect("Config should load"))
}

#[test]
fn test_demo_config_loads() {
    let Some(config) = site_config() else {
        return;
    };

    assert_eq!(config.title, "Scriba Starter Blog");
    assert_eq!(config.header_title(), "Scriba");
    assert_eq!(config.site_url, "https://scriba-starter-blog.example.com");
    assert_eq!(config.search_documents_path(), Some("search.json"));
    assert_eq!(config.build.content_dir, "data/blog");

    let giscus = config
        .comments
        .as_ref()
        .and_then(|c| c.giscus_config.as_ref())
        .expect("giscus settings");
    assert_eq!(giscus.repo, "scriba-blog/starter");
    assert_eq!(giscus.repository_id, "");
}

#[test]
fn test_demo_config_load_is_repeatable() {
    let config_path = Path::new(SITE_ROOT).join("config.toml");
    if !config_path.exists() {
        return;
    }

    let env = MapEnv::new();
    let first = Config::load_with(&config_path, &env).expect("first load");
    let second = Config::load_with(&config_path, &env).expect("second load");
    assert_eq!(first, second);
}

#[test]
fn test_demo_posts_parse() {
    let registry = ParserRegistry::new();
    let posts_dir = Path::new(SITE_ROOT).join("data/blog");
    if !posts_dir.exists() {
        return;
    }

    let hello = posts_dir.join("hello-world.md");
    let content = fs::read_to_string(&hello).expect("Failed to read");
    let parsed = registry.parse(&content, &hello).expect("Should parse");
    assert_eq!(parsed.frontmatter.title, "Hello, World!");
    assert!(!parsed.frontmatter.draft);
    assert!(parsed.toc.iter().any(|t| t.id == "writing-posts"));

    let mdx = posts_dir.join("introducing-mdx.mdx");
    let content = fs::read_to_string(&mdx).expect("Failed to read");
    let parsed = registry.parse(&content, &mdx).expect("Should parse");
    assert!(!parsed.html.contains("import Note"));
    assert!(!parsed.html.contains("<TOCInline"));
    assert!(parsed.html.contains("<nav class=\"toc\">"));
    assert!(parsed.html.contains("href=\"#components\""));

    let cited = posts_dir.join("game-theory.md");
    let content = fs::read_to_string(&cited).expect("Failed to read");
    let parsed = registry.parse(&content, &cited).expect("Should parse");
    assert!(parsed.html.contains("Nash"));
    assert!(parsed.html.contains("1950"));
}

#[test]
fn test_demo_content_collects() {
    let Some(config) = site_config() else {
        return;
    };

    let root = Path::new(SITE_ROOT);
    let site = ContentCollector::new(config, root.join("data/blog"))
        .with_authors_dir(root.join("data/authors"))
        .collect()
        .expect("Should collect");

    let slugs: Vec<_> = site.posts.iter().map(|p| p.slug.as_str()).collect();
    assert_eq!(
        slugs,
        vec![
            "nested-route/introducing-multi-part-posts",
            "introducing-mdx",
            "hello-world",
            "game-theory",
        ]
    );
    assert_eq!(site.tags.count("guide"), 2);
    assert!(site.authors.contains_key("sparrowhawk"));

    let nested = site
        .post("nested-route/introducing-multi-part-posts")
        .expect("nested post");
    assert_eq!(site.authors_for(nested).len(), 2);
}

#[test]
fn test_demo_site_builds() {
    let Some(config) = site_config() else {
        return;
    };

    let output = tempfile::tempdir().expect("temp dir");
    let stats = Builder::from_site_root(config, Path::new(SITE_ROOT))
        .with_output_dir(output.path())
        .build()
        .expect("Build should succeed");

    assert_eq!(stats.posts, 4);
    assert_eq!(stats.assets, 2);

    let out = output.path();
    assert!(out.join("index.html").exists());
    assert!(out.join("blog/hello-world/index.html").exists());
    assert!(
        out.join("blog/nested-route/introducing-multi-part-posts/index.html")
            .exists()
    );
    assert!(!out.join("blog/upcoming-feature").exists());
    assert!(out.join("static/images/logo.svg").exists());
    assert!(out.join("tags/guide/feed.xml").exists());

    let feed = fs::read_to_string(out.join("feed.xml")).expect("feed");
    assert!(feed.contains("<title>Scriba Starter Blog</title>"));
    assert!(!feed.contains("Upcoming Feature"));

    let sitemap = fs::read_to_string(out.join("sitemap.xml")).expect("sitemap");
    assert!(sitemap.contains("https://scriba-starter-blog.example.com/blog/game-theory"));

    let search = fs::read_to_string(out.join("search.json")).expect("search documents");
    let docs: serde_json::Value = serde_json::from_str(&search).expect("valid JSON");
    assert_eq!(docs.as_array().map(Vec::len), Some(4));

    let not_found = fs::read_to_string(out.join("404.html")).expect("404");
    assert!(not_found.contains("blown away by the wind"));

    let about = fs::read_to_string(out.join("about/index.html")).expect("about");
    assert!(about.contains("Tails Azimuth"));
}
