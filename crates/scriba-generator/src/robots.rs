//! robots.txt generation.

use std::{fs, path::Path};

use scriba_core::Config;
use tracing::info;

/// Robots.txt generator.
#[derive(Debug)]
pub struct RobotsGenerator {
    config: Config,
}

impl RobotsGenerator {
    /// Create a new robots generator.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Allow every crawler and point it at the sitemap.
    pub fn generate(&self) -> String {
        let site_url = self.config.site_url.trim_end_matches('/');
        format!(
            "User-agent: *\nAllow: /\n\nHost: {site_url}\nSitemap: {}\n",
            self.config.url_for("sitemap.xml")
        )
    }

    /// Write `robots.txt` into the output directory.
    pub fn write(&self, output_dir: &Path) -> std::io::Result<()> {
        info!("generating robots.txt");
        fs::write(output_dir.join("robots.txt"), self.generate())
    }
}
