//! Front matter parsing for posts and author profiles.

use std::{collections::BTreeMap, path::Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};

use crate::{
    date::deserialize_optional,
    error::{CoreError, Result},
};

/// Front matter of a blog post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frontmatter {
    /// Post title (required).
    pub title: String,

    /// Publication date.
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub date: Option<DateTime<Utc>>,

    /// Last modification date.
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub lastmod: Option<DateTime<Utc>>,

    /// Tags for the post.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Whether this is a draft.
    #[serde(default)]
    pub draft: bool,

    /// Summary for listings and meta tags.
    #[serde(default)]
    pub summary: Option<String>,

    /// Social card images. A single string is accepted.
    #[serde(default, deserialize_with = "string_or_list")]
    pub images: Vec<String>,

    /// Author slugs.
    #[serde(default = "default_authors")]
    pub authors: Vec<String>,

    /// Post layout.
    #[serde(default)]
    pub layout: Option<PostLayout>,

    /// BibTeX file, relative to the post.
    #[serde(default)]
    pub bibliography: Option<String>,

    /// Canonical URL when the post was first published elsewhere.
    #[serde(default)]
    pub canonical_url: Option<String>,

    /// Any other keys.
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

fn default_authors() -> Vec<String> {
    vec!["default".to_string()]
}

/// Layout used to render a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostLayout {
    /// Sidebar with author details and tags.
    #[default]
    PostLayout,
    /// Single column.
    PostSimple,
    /// Banner image above the title.
    PostBanner,
}

impl PostLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PostLayout => "PostLayout",
            Self::PostSimple => "PostSimple",
            Self::PostBanner => "PostBanner",
        }
    }
}

/// Front matter of an author profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorFrontmatter {
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub bluesky: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub github: Option<String>,
    #[serde(default)]
    pub layout: Option<String>,
}

fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        None(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) if s.is_empty() => Vec::new(),
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
        OneOrMany::None(()) => Vec::new(),
    })
}

/// Delimiter types for front matter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontmatterFormat {
    /// YAML front matter delimited by `---`.
    Yaml,
    /// TOML front matter delimited by `+++`.
    Toml,
}

impl FrontmatterFormat {
    /// Get the delimiter string for this format.
    pub fn delimiter(&self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
        }
    }
}

/// Split content into front matter and body.
///
/// Delimiters must sit on their own line.
pub fn split_frontmatter(content: &str) -> Option<(FrontmatterFormat, &str, &str)> {
    let content = content.trim_start_matches('\u{feff}').trim_start();

    let format = if content.starts_with("---") {
        FrontmatterFormat::Yaml
    } else if content.starts_with("+++") {
        FrontmatterFormat::Toml
    } else {
        return None;
    };

    let delimiter = format.delimiter();
    let after_first = content[delimiter.len()..].strip_prefix(['\r', '\n'].as_slice())?;
    let after_first = after_first.strip_prefix('\n').unwrap_or(after_first);

    let mut offset = 0;
    for line in after_first.split_inclusive('\n') {
        if line.trim_end() == delimiter {
            let frontmatter = after_first[..offset].trim();
            let body = after_first[offset + line.len()..].trim_start_matches(['\r', '\n']);
            return Some((format, frontmatter, body));
        }
        offset += line.len();
    }

    None
}

/// Parse a document with front matter of type `T`.
///
/// A document without front matter yields `T::default()` and the whole text as body.
pub fn parse_document<T>(content: &str, path: &Path) -> Result<(T, String)>
where
    T: DeserializeOwned + Default,
{
    let Some((format, fm_str, body)) = split_frontmatter(content) else {
        return Ok((T::default(), content.to_string()));
    };

    let frontmatter: T = match format {
        FrontmatterFormat::Yaml => {
            serde_yaml::from_str(fm_str).map_err(|e| CoreError::frontmatter(path, e.to_string()))?
        }
        FrontmatterFormat::Toml => {
            toml::from_str(fm_str).map_err(|e| CoreError::frontmatter(path, e.to_string()))?
        }
    };

    Ok((frontmatter, body.to_string()))
}

/// Parse post front matter from a string.
pub fn parse_frontmatter(content: &str, path: &Path) -> Result<(Frontmatter, String)> {
    let (frontmatter, body): (Frontmatter, String) = parse_document(content, path)?;
    if frontmatter.title.trim().is_empty() {
        return Err(CoreError::frontmatter(path, "missing `title`"));
    }
    Ok((frontmatter, body))
}

/// Render post front matter back to a YAML block, including delimiters.
pub fn to_yaml_block(frontmatter: &Frontmatter) -> Result<String> {
    let yaml = serde_yaml::to_string(frontmatter)?;
    Ok(format!("---\n{yaml}---\n"))
}

#[cfg(test)]
mod tests {
    use chrono::Datelike;

    use super::*;

    #[test]
    fn test_split_yaml_frontmatter() {
        let content = "---\ntitle: Hello\n---\n\nBody content";
        let (format, fm, body) = split_frontmatter(content).unwrap();

        assert_eq!(format, FrontmatterFormat::Yaml);
        assert_eq!(fm, "title: Hello");
        assert_eq!(body, "Body content");
    }

    #[test]
    fn test_split_ignores_inline_dashes() {
        let content = "---\ntitle: a---b\n---\nBody --- here";
        let (_, fm, body) = split_frontmatter(content).unwrap();

        assert_eq!(fm, "title: a---b");
        assert_eq!(body, "Body --- here");
    }

    #[test]
    fn test_split_toml_frontmatter() {
        let content = "+++\ntitle = \"Hello\"\n+++\n\nBody content";
        let (format, fm, body) = split_frontmatter(content).unwrap();

        assert_eq!(format, FrontmatterFormat::Toml);
        assert_eq!(fm, "title = \"Hello\"");
        assert_eq!(body, "Body content");
    }

    #[test]
    fn test_no_frontmatter() {
        assert!(split_frontmatter("Just regular content").is_none());
        assert!(split_frontmatter("---\nnever closed").is_none());
    }

    #[test]
    fn test_parse_yaml_post() {
        let content = r#"---
title: 'Introducing Multi-part Posts with Nested Routing'
date: '2021-05-02'
lastmod: '2021-05-03'
tags: ['multi-author', 'next-js', 'feature']
draft: false
summary: 'The blog template supports posts in nested sub-folders.'
images: '/static/images/ocean.jpeg'
layout: PostSimple
canonicalUrl: https://example.com/original
series: routing
---

# Hello World
"#;
        let (fm, body) = parse_frontmatter(content, Path::new("nested.md")).unwrap();

        assert_eq!(fm.title, "Introducing Multi-part Posts with Nested Routing");
        assert_eq!(fm.date.unwrap().day(), 2);
        assert_eq!(fm.lastmod.unwrap().day(), 3);
        assert_eq!(fm.tags, vec!["multi-author", "next-js", "feature"]);
        assert_eq!(fm.images, vec!["/static/images/ocean.jpeg"]);
        assert_eq!(fm.authors, vec!["default"]);
        assert_eq!(fm.layout, Some(PostLayout::PostSimple));
        assert_eq!(fm.canonical_url.as_deref(), Some("https://example.com/original"));
        assert!(fm.extra.contains_key("series"));
        assert!(body.starts_with("# Hello World"));
    }

    #[test]
    fn test_parse_toml_post() {
        let content = r#"+++
title = "TOML Post"
date = 2024-01-14
tags = ["rust"]
authors = ["default", "sparrowhawk"]
images = ["/a.png", "/b.png"]
draft = true
+++

Body"#;
        let (fm, body) = parse_frontmatter(content, Path::new("toml.md")).unwrap();

        assert_eq!(fm.title, "TOML Post");
        assert_eq!(fm.date.unwrap().year(), 2024);
        assert!(fm.draft);
        assert_eq!(fm.authors, vec!["default", "sparrowhawk"]);
        assert_eq!(fm.images.len(), 2);
        assert_eq!(body, "Body");
    }

    #[test]
    fn test_missing_title_is_an_error() {
        let content = "---\ndate: 2024-01-01\n---\nBody";
        let err = parse_frontmatter(content, Path::new("untitled.md")).unwrap_err();
        assert!(err.to_string().contains("untitled.md"));
    }

    #[test]
    fn test_malformed_frontmatter_names_file() {
        let content = "---\ntitle: [unclosed\n---\nBody";
        let err = parse_frontmatter(content, Path::new("broken.md")).unwrap_err();
        assert!(matches!(err, CoreError::Frontmatter { .. }));
    }

    #[test]
    fn test_title_and_tags_round_trip() {
        let content = "---\ntitle: 'Go: slices, arrays & maps'\ntags: ['go', 'Data Structures', 'C++']\n---\nBody";
        let (fm, _) = parse_frontmatter(content, Path::new("a.md")).unwrap();

        let block = to_yaml_block(&fm).unwrap();
        let (again, _) = parse_frontmatter(&format!("{block}Body"), Path::new("a.md")).unwrap();

        assert_eq!(again.title, fm.title);
        assert_eq!(again.tags, fm.tags);
        assert_eq!(again, fm);
    }

    #[test]
    fn test_parse_author() {
        let content = "---\nname: Tails Azimuth\navatar: /static/images/avatar.png\noccupation: Professor of Atmospheric Science\ngithub: https://github.com\n---\nBio here.";
        let (author, bio): (AuthorFrontmatter, String) =
            parse_document(content, Path::new("default.md")).unwrap();

        assert_eq!(author.name, "Tails Azimuth");
        assert_eq!(author.occupation.as_deref(), Some("Professor of Atmospheric Science"));
        assert_eq!(bio, "Bio here.");
    }
}
