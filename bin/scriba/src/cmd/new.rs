//! New command - scaffold a blog post

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{Timelike, Utc};
use color_eyre::eyre::{Result, WrapErr, bail};
use scriba_core::{Config, Frontmatter, PostLayout, frontmatter::to_yaml_block, slugify};

use crate::site_root;

/// Options for a new post.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub layout: Option<PostLayout>,
    pub draft: bool,
    pub mdx: bool,
}

/// Run the new command.
///
/// Writes `<contentDir>/<slug>.md` (or `.mdx`) with front matter and returns its path.
/// An existing file is never overwritten.
pub fn run(config_path: &Path, post: &NewPost) -> Result<PathBuf> {
    tracing::info!(?config_path, title = %post.title, "Creating new post");

    let config = Config::load(config_path).wrap_err("Failed to load configuration")?;
    let content_dir = site_root(config_path).join(&config.build.content_dir);

    let slug = file_stem(&post.title);
    if slug.is_empty() {
        bail!("Title `{}` does not produce a usable file name", post.title);
    }

    let ext = if post.mdx { "mdx" } else { "md" };
    let file_path = content_dir.join(format!("{slug}.{ext}"));
    if file_path.exists() {
        bail!("{} already exists", file_path.display());
    }

    fs::create_dir_all(&content_dir).wrap_err("Failed to create content directory")?;
    fs::write(&file_path, render(post)?).wrap_err("Failed to write file")?;

    tracing::info!(?file_path, "Created new post");
    println!("Created: {}", file_path.display());

    Ok(file_path)
}

/// Slug with runs of `-` collapsed, used as the file name.
fn file_stem(title: &str) -> String {
    slugify(title)
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Front matter block followed by a placeholder body.
fn render(post: &NewPost) -> Result<String> {
    let now = Utc::now();
    let frontmatter = Frontmatter {
        title: post.title.clone(),
        date: now.with_nanosecond(0),
        tags: post.tags.clone(),
        draft: post.draft,
        summary: post.summary.clone(),
        layout: post.layout,
        authors: vec!["default".to_string()],
        ..Default::default()
    };

    let block = to_yaml_block(&frontmatter).wrap_err("Failed to render front matter")?;
    Ok(format!("{block}\nWrite your post here.\n"))
}
