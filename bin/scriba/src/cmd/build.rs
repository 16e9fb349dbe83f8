//! Build command - generates the static site

use std::{path::Path, time::Instant};

use color_eyre::eyre::{Result, WrapErr};
use scriba_core::Config;
use scriba_generator::{BuildStats, Builder};

use super::print_config_warnings;
use crate::site_root;

/// Run the build command.
///
/// Builds the site described by `config_path`. Content, author, static and layout
/// directories are resolved against the config file's directory. `output`
/// overrides `build.outputDir`.
pub fn run(
    config_path: &Path,
    output: Option<&Path>,
    drafts: bool,
    site_url: Option<&str>,
) -> Result<BuildStats> {
    let start = Instant::now();
    tracing::info!(?config_path, ?output, drafts, ?site_url, "Starting build");

    let mut config = Config::load(config_path).wrap_err("Failed to load configuration")?;
    print_config_warnings(&config);

    if drafts {
        config.build.drafts = true;
    }

    if let Some(url) = site_url {
        tracing::info!(site_url = url, "Overriding siteUrl from CLI");
        config.site_url = url.trim_end_matches('/').to_string();
    }

    tracing::debug!(?config, "Loaded configuration");

    let mut builder = Builder::from_site_root(config, &site_root(config_path));
    if let Some(output) = output {
        builder = builder.with_output_dir(output);
    }

    let stats = builder.build().wrap_err("Build failed")?;
    let duration = start.elapsed();

    println!();
    println!("  Build completed successfully!");
    println!();
    println!("  Posts:      {}", stats.posts);
    println!("  Pages:      {}", stats.pages);
    println!("  Tag pages:  {}", stats.tag_pages);
    println!("  Feeds:      {}", stats.feeds);
    println!("  Assets:     {}", stats.assets);
    println!();
    println!("  Duration:   {:.2}s", duration.as_secs_f64());
    println!("  Output:     {}", builder.output_dir().display());
    println!();

    tracing::info!(?stats, ?duration, "Build completed successfully");

    Ok(stats)
}
