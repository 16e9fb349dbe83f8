//! Scriba Generator Library
//!
//! Static blog generation engine for Scriba.
//!
//! # Modules
//!
//! - [`template`] - HTML templates with variable interpolation and file overrides
//! - [`html`] - Page generation for posts, listings, tags and authors
//! - [`integrations`] - Analytics, comments, search and newsletter embeds
//! - [`collector`] - Content collection, tag index and pagination
//! - [`rss`] - Site and per-tag RSS feeds
//! - [`sitemap`] - XML sitemap generation
//! - [`robots`] - robots.txt
//! - [`assets`] - Static files and generated stylesheets
//! - [`build`] - Build orchestration

pub mod assets;
pub mod build;
pub mod collector;
pub mod html;
pub mod integrations;
pub mod robots;
pub mod rss;
pub mod sitemap;
pub mod template;

pub use assets::AssetProcessor;
pub use build::{BuildStats, Builder};
pub use collector::{ContentCollector, SiteContent, TagIndex};
pub use html::HtmlGenerator;
pub use robots::RobotsGenerator;
pub use rss::RssGenerator;
pub use sitemap::SitemapGenerator;
pub use template::{Template, TemplateContext, TemplateRegistry};
