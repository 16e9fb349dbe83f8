//! Scriba Core Library
//!
//! Site configuration, front matter, content types and error handling for the
//! Scriba blog generator.

pub mod config;
pub mod content;
pub mod date;
pub mod env;
pub mod error;
pub mod frontmatter;
pub mod slug;

pub use config::Config;
pub use content::{
    Author, ContentPath, ContentType, CoreContent, ParsedContent, Post, ReadingTime, TocEntry,
};
pub use env::{EnvSource, MapEnv, ProcessEnv};
pub use error::{CoreError, Result};
pub use frontmatter::{AuthorFrontmatter, Frontmatter, PostLayout};
pub use slug::{Slugger, slugify};
