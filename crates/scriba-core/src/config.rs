//! Site configuration record.
//!
//! The configuration is declared once in a TOML file, read at the start of a
//! build, and never mutated afterwards. Keys use the camelCase names templates
//! expect (`siteUrl`, `socialBanner`, `analytics.googleAnalyticsId`, ...). The
//! key set is closed: an unrecognized key is a load error rather than something
//! silently ignored.
//!
//! String values may reference environment variables as `${NAME}`; see
//! [`crate::env`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    env::{EnvSource, ProcessEnv, interpolate},
    error::{CoreError, Result},
};

/// Main configuration structure for Scriba.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Site title.
    pub title: String,

    /// Site author name.
    #[serde(default)]
    pub author: String,

    /// Title shown in the header, falls back to `title`.
    #[serde(default)]
    pub header_title: String,

    /// Site description for meta tags.
    #[serde(default)]
    pub description: String,

    /// Language code used in `<html lang>`.
    #[serde(default = "default_language")]
    pub language: String,

    /// Initial colour theme.
    #[serde(default)]
    pub theme: Theme,

    /// Absolute site URL (e.g., "https://example.com").
    pub site_url: String,

    /// Source repository of the site.
    #[serde(default)]
    pub site_repo: String,

    /// Logo path.
    #[serde(default)]
    pub site_logo: String,

    /// Default social card image.
    #[serde(default)]
    pub social_banner: String,

    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub github: String,
    #[serde(default)]
    pub x: String,
    #[serde(default)]
    pub facebook: String,
    #[serde(default)]
    pub youtube: String,
    #[serde(default)]
    pub linkedin: String,
    #[serde(default)]
    pub threads: String,
    #[serde(default)]
    pub instagram: String,
    #[serde(default)]
    pub medium: String,
    #[serde(default)]
    pub bluesky: String,
    #[serde(default)]
    pub mastodon: String,

    /// Locale used for date formatting hints.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Keep the navigation bar pinned while scrolling.
    #[serde(default)]
    pub sticky_nav: bool,

    /// Analytics identifiers.
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Comment widget selection.
    #[serde(default)]
    pub comments: Option<CommentsConfig>,

    /// Search provider selection.
    #[serde(default)]
    pub search: Option<SearchConfig>,

    /// Newsletter provider selection.
    #[serde(default)]
    pub newsletter: Option<NewsletterConfig>,

    /// Build settings.
    #[serde(default)]
    pub build: BuildConfig,

    /// RSS feed settings.
    #[serde(default)]
    pub feed: FeedConfig,
}

/// Colour theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Follow the operating system preference.
    #[default]
    System,
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }
}

/// Analytics identifiers. Empty values disable the matching provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnalyticsConfig {
    #[serde(default)]
    pub google_analytics_id: String,
    #[serde(default)]
    pub umami_website_id: String,
    #[serde(default)]
    pub plausible_data_domain: String,
    #[serde(default)]
    pub posthog_project_api_key: String,
    #[serde(default)]
    pub simple_analytics: bool,
}

/// An enabled analytics provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsProvider<'a> {
    Google { measurement_id: &'a str },
    Umami { website_id: &'a str },
    Plausible { data_domain: &'a str },
    Posthog { api_key: &'a str },
    SimpleAnalytics,
}

impl AnalyticsConfig {
    /// All providers with a non-empty identifier.
    pub fn providers(&self) -> Vec<AnalyticsProvider<'_>> {
        let mut providers = Vec::new();
        if !self.google_analytics_id.is_empty() {
            providers.push(AnalyticsProvider::Google {
                measurement_id: &self.google_analytics_id,
            });
        }
        if !self.umami_website_id.is_empty() {
            providers.push(AnalyticsProvider::Umami {
                website_id: &self.umami_website_id,
            });
        }
        if !self.plausible_data_domain.is_empty() {
            providers.push(AnalyticsProvider::Plausible {
                data_domain: &self.plausible_data_domain,
            });
        }
        if !self.posthog_project_api_key.is_empty() {
            providers.push(AnalyticsProvider::Posthog {
                api_key: &self.posthog_project_api_key,
            });
        }
        if self.simple_analytics {
            providers.push(AnalyticsProvider::SimpleAnalytics);
        }
        providers
    }
}

/// Comment service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentsProvider {
    Giscus,
    Utterances,
    Disqus,
}

/// Comment widget configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CommentsConfig {
    pub provider: CommentsProvider,
    #[serde(default)]
    pub giscus_config: Option<GiscusConfig>,
    #[serde(default)]
    pub utterances_config: Option<UtterancesConfig>,
    #[serde(default)]
    pub disqus_config: Option<DisqusConfig>,
}

/// The selected comment provider together with its settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActiveComments<'a> {
    Giscus(&'a GiscusConfig),
    Utterances(&'a UtterancesConfig),
    Disqus(&'a DisqusConfig),
}

impl CommentsConfig {
    /// Settings of the selected provider, if they were declared.
    pub fn active(&self) -> Option<ActiveComments<'_>> {
        match self.provider {
            CommentsProvider::Giscus => self.giscus_config.as_ref().map(ActiveComments::Giscus),
            CommentsProvider::Utterances => self
                .utterances_config
                .as_ref()
                .map(ActiveComments::Utterances),
            CommentsProvider::Disqus => self.disqus_config.as_ref().map(ActiveComments::Disqus),
        }
    }
}

/// giscus settings. Identifiers usually come from the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GiscusConfig {
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub repository_id: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub category_id: String,
    /// How a page is mapped to a discussion.
    #[serde(default = "default_mapping")]
    pub mapping: String,
    /// `"1"` shows reactions on the main post.
    #[serde(default = "default_reactions")]
    pub reactions: String,
    /// `"1"` emits discussion metadata.
    #[serde(default = "default_metadata")]
    pub metadata: String,
    #[serde(default = "default_giscus_theme")]
    pub theme: String,
    #[serde(default = "default_giscus_dark_theme")]
    pub dark_theme: String,
    /// Custom theme stylesheet, overrides `theme` when set.
    #[serde(default, rename = "themeURL")]
    pub theme_url: String,
    #[serde(default = "default_giscus_lang")]
    pub lang: String,
}

/// utterances settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UtterancesConfig {
    #[serde(default)]
    pub repo: String,
    #[serde(default = "default_mapping")]
    pub issue_term: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_utterances_theme")]
    pub theme: String,
    #[serde(default = "default_utterances_dark_theme")]
    pub dark_theme: String,
}

/// Disqus settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DisqusConfig {
    #[serde(default)]
    pub shortname: String,
}

/// Search service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProvider {
    Kbar,
    Algolia,
}

/// Search configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SearchConfig {
    pub provider: SearchProvider,
    #[serde(default)]
    pub kbar_config: Option<KbarConfig>,
    #[serde(default)]
    pub algolia_config: Option<AlgoliaConfig>,
}

/// The selected search provider together with its settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActiveSearch<'a> {
    Kbar(&'a KbarConfig),
    Algolia(&'a AlgoliaConfig),
}

impl SearchConfig {
    /// Settings of the selected provider, if they were declared.
    pub fn active(&self) -> Option<ActiveSearch<'_>> {
        match self.provider {
            SearchProvider::Kbar => self.kbar_config.as_ref().map(ActiveSearch::Kbar),
            SearchProvider::Algolia => self.algolia_config.as_ref().map(ActiveSearch::Algolia),
        }
    }
}

/// Local command-palette search backed by a JSON document list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KbarConfig {
    /// Output-relative path of the search documents.
    #[serde(default = "default_search_documents_path")]
    pub search_documents_path: String,
}

/// Algolia DocSearch settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AlgoliaConfig {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub index_name: String,
}

/// Newsletter service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsletterProvider {
    Mailchimp,
    Buttondown,
    Convertkit,
    Klaviyo,
    Revue,
    Emailoctopus,
    Beehiiv,
}

impl NewsletterProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mailchimp => "mailchimp",
            Self::Buttondown => "buttondown",
            Self::Convertkit => "convertkit",
            Self::Klaviyo => "klaviyo",
            Self::Revue => "revue",
            Self::Emailoctopus => "emailoctopus",
            Self::Beehiiv => "beehiiv",
        }
    }
}

/// Newsletter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewsletterConfig {
    pub provider: NewsletterProvider,
    /// Form action receiving the subscription request.
    #[serde(default = "default_newsletter_endpoint")]
    pub endpoint: String,
}

/// Build configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BuildConfig {
    /// Directory holding blog posts.
    #[serde(default = "default_content_dir")]
    pub content_dir: String,

    /// Directory holding author profiles.
    #[serde(default = "default_authors_dir")]
    pub authors_dir: String,

    /// Directory copied verbatim into the output.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    /// Output directory for generated site.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Whether to publish drafts.
    #[serde(default)]
    pub drafts: bool,

    /// Syntax highlighting theme for the light scheme.
    #[serde(default = "default_syntax_theme")]
    pub syntax_theme: String,

    /// Syntax highlighting theme for the dark scheme.
    #[serde(default = "default_syntax_theme_dark")]
    pub syntax_theme_dark: String,

    /// Posts per listing page.
    #[serde(default = "default_posts_per_page")]
    pub posts_per_page: usize,

    /// Posts shown on the home page.
    #[serde(default = "default_max_display")]
    pub max_display: usize,
}

/// RSS feed configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FeedConfig {
    /// Whether RSS feeds are generated.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of items per feed.
    #[serde(default = "default_feed_limit")]
    pub limit: usize,

    /// Also write one feed per tag.
    #[serde(default = "default_true")]
    pub tag_feeds: bool,
}

// Default value functions
fn default_language() -> String {
    "en-us".to_string()
}

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_mapping() -> String {
    "pathname".to_string()
}

fn default_reactions() -> String {
    "1".to_string()
}

fn default_metadata() -> String {
    "0".to_string()
}

fn default_giscus_theme() -> String {
    "light".to_string()
}

fn default_giscus_dark_theme() -> String {
    "transparent_dark".to_string()
}

fn default_giscus_lang() -> String {
    "en".to_string()
}

fn default_utterances_theme() -> String {
    "github-light".to_string()
}

fn default_utterances_dark_theme() -> String {
    "github-dark".to_string()
}

fn default_search_documents_path() -> String {
    "search.json".to_string()
}

fn default_newsletter_endpoint() -> String {
    "/api/newsletter".to_string()
}

fn default_content_dir() -> String {
    "data/blog".to_string()
}

fn default_authors_dir() -> String {
    "data/authors".to_string()
}

fn default_static_dir() -> String {
    "public".to_string()
}

fn default_output_dir() -> String {
    "out".to_string()
}

fn default_syntax_theme() -> String {
    "InspiredGitHub".to_string()
}

fn default_syntax_theme_dark() -> String {
    "base16-ocean.dark".to_string()
}

fn default_posts_per_page() -> usize {
    5
}

fn default_max_display() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_feed_limit() -> usize {
    20
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            content_dir: default_content_dir(),
            authors_dir: default_authors_dir(),
            static_dir: default_static_dir(),
            output_dir: default_output_dir(),
            drafts: false,
            syntax_theme: default_syntax_theme(),
            syntax_theme_dark: default_syntax_theme_dark(),
            posts_per_page: default_posts_per_page(),
            max_display: default_max_display(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: default_feed_limit(),
            tag_feeds: true,
        }
    }
}

impl Default for KbarConfig {
    fn default() -> Self {
        Self {
            search_documents_path: default_search_documents_path(),
        }
    }
}

/// A configured social profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocialLink<'a> {
    /// Platform name, also used as the icon key.
    pub kind: &'static str,
    /// Profile URL, or an address for `mail`.
    pub href: &'a str,
}

impl Config {
    /// Load configuration from a TOML file, substituting process environment values.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, &ProcessEnv)
    }

    /// Load configuration from a TOML file with an explicit environment.
    pub fn load_with(path: &Path, env: &dyn EnvSource) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content, env).map_err(|e| match e {
            CoreError::Config { message, source } => CoreError::Config {
                message: format!("{}: {message}", path.display()),
                source,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str, env: &dyn EnvSource) -> Result<Self> {
        let mut value: toml::Value = toml::from_str(content)
            .map_err(|e| CoreError::config_with_source("failed to parse TOML", e))?;

        substitute_env(&mut value, env);

        let config: Config = value
            .try_into()
            .map_err(|e| CoreError::config_with_source("invalid configuration", e))?;

        for warning in config.warnings() {
            tracing::warn!("{warning}");
        }

        Ok(config)
    }

    /// Advisory findings about the configuration. Never fatal.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.title.is_empty() {
            warnings.push("title is empty".to_string());
        }

        if self.site_url.is_empty() {
            warnings.push("siteUrl is empty".to_string());
        } else if self.site_url.ends_with('/') {
            warnings.push("siteUrl should not have a trailing slash".to_string());
        } else if !self.site_url.starts_with("http://") && !self.site_url.starts_with("https://") {
            warnings.push("siteUrl should start with http:// or https://".to_string());
        }

        if let Some(comments) = self.comments.as_ref().filter(|c| c.active().is_none()) {
            warnings.push(format!(
                "comments provider `{:?}` selected without its settings block",
                comments.provider
            ));
        }

        if let Some(search) = self.search.as_ref().filter(|s| s.active().is_none()) {
            warnings.push(format!(
                "search provider `{:?}` selected without its settings block",
                search.provider
            ));
        }

        warnings
    }

    /// Get the full URL for a path.
    pub fn url_for(&self, path: &str) -> String {
        let base = self.site_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Title shown in the header.
    pub fn header_title(&self) -> &str {
        if self.header_title.is_empty() {
            &self.title
        } else {
            &self.header_title
        }
    }

    /// Configured social profiles, in display order.
    pub fn social_links(&self) -> Vec<SocialLink<'_>> {
        [
            ("mail", self.email.as_str()),
            ("github", &self.github),
            ("facebook", &self.facebook),
            ("youtube", &self.youtube),
            ("linkedin", &self.linkedin),
            ("mastodon", &self.mastodon),
            ("x", &self.x),
            ("bluesky", &self.bluesky),
            ("instagram", &self.instagram),
            ("threads", &self.threads),
            ("medium", &self.medium),
        ]
        .into_iter()
        .filter(|(_, href)| !href.is_empty())
        .map(|(kind, href)| SocialLink { kind, href })
        .collect()
    }

    /// Search documents path when the kbar provider is active.
    pub fn search_documents_path(&self) -> Option<&str> {
        match self.search.as_ref()?.active()? {
            ActiveSearch::Kbar(kbar) => Some(kbar.search_documents_path.as_str()),
            ActiveSearch::Algolia(_) => None,
        }
    }
}

/// Apply `${NAME}` substitution to every string in a TOML tree.
fn substitute_env(value: &mut toml::Value, env: &dyn EnvSource) {
    match value {
        toml::Value::String(s) if s.contains("${") => *s = interpolate(s, env),
        toml::Value::Array(items) => items.iter_mut().for_each(|v| substitute_env(v, env)),
        toml::Value::Table(table) => table
            .iter_mut()
            .for_each(|(_, v)| substitute_env(v, env)),
        _ => {}
    }
}
