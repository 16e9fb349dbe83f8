//! Scriba CLI
//!
//! Personal blog engine: Markdown/MDX posts in, a static site out.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, bail};
use scriba::cmd::new::NewPost;
use scriba_core::PostLayout;

/// Command-line interface for Scriba.
#[derive(Parser)]
#[command(name = "scriba", version, about = "A personal blog engine")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Build the site
    Build {
        /// Output directory (defaults to build.outputDir)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Include draft posts
        #[arg(long)]
        drafts: bool,
        /// Override siteUrl (e.g., https://example.com)
        #[arg(long)]
        site_url: Option<String>,
    },
    /// Start development server with live reload
    Watch {
        /// Port to listen on
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
        /// Open browser automatically
        #[arg(long)]
        open: bool,
    },
    /// Create a new post
    New {
        /// Post title
        title: String,
        /// Comma-separated tags
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Summary shown in listings
        #[arg(short, long)]
        summary: Option<String>,
        /// Layout (PostLayout, PostSimple, PostBanner)
        #[arg(short, long)]
        layout: Option<String>,
        /// Mark the post as a draft
        #[arg(long)]
        draft: bool,
        /// Create an .mdx file
        #[arg(long)]
        mdx: bool,
    },
    /// Validate configuration and content
    Check {
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
}

fn parse_layout(name: &str) -> Result<PostLayout> {
    Ok(match name {
        "PostLayout" => PostLayout::PostLayout,
        "PostSimple" => PostLayout::PostSimple,
        "PostBanner" => PostLayout::PostBanner,
        other => bail!("Unknown layout `{other}`, expected PostLayout, PostSimple or PostBanner"),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    scriba::init_tracing(cli.verbose);

    match cli.command {
        Commands::Build {
            output,
            drafts,
            site_url,
        } => {
            scriba::cmd::build::run(&cli.config, output.as_deref(), drafts, site_url.as_deref())?;
        }
        Commands::Watch { port, open } => {
            scriba::cmd::watch::run(&cli.config, port, open).await?;
        }
        Commands::New {
            title,
            tags,
            summary,
            layout,
            draft,
            mdx,
        } => {
            let post = NewPost {
                title,
                tags,
                summary,
                layout: layout.as_deref().map(parse_layout).transpose()?,
                draft,
                mdx,
            };
            scriba::cmd::new::run(&cli.config, &post)?;
        }
        Commands::Check { strict } => {
            scriba::cmd::check::run(&cli.config, strict)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_cli_build_command_parsing() {
        let args = ["scriba", "build", "--output", "dist"];
        let cli = Cli::parse_from(args);

        assert_eq!(cli.config, PathBuf::from("config.toml"));
        assert_eq!(cli.verbose, 0);

        match cli.command {
            Commands::Build {
                output,
                drafts,
                site_url,
            } => {
                assert_eq!(output, Some(PathBuf::from("dist")));
                assert!(!drafts);
                assert!(site_url.is_none());
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_cli_build_with_drafts_and_site_url() {
        let args = ["scriba", "build", "--drafts", "--site-url", "https://example.com"];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::Build {
                output,
                drafts,
                site_url,
            } => {
                assert!(output.is_none());
                assert!(drafts);
                assert_eq!(site_url.as_deref(), Some("https://example.com"));
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_cli_watch_command_parsing() {
        let args = ["scriba", "watch", "--port", "8080", "--open"];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::Watch { port, open } => {
                assert_eq!(port, 8080);
                assert!(open);
            }
            _ => panic!("Expected Watch command"),
        }
    }

    #[test]
    fn test_cli_new_command_parsing() {
        let args = [
            "scriba",
            "new",
            "My First Post",
            "--tags",
            "rust,web",
            "--layout",
            "PostBanner",
            "--draft",
        ];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::New {
                title,
                tags,
                layout,
                draft,
                mdx,
                ..
            } => {
                assert_eq!(title, "My First Post");
                assert_eq!(tags, vec!["rust", "web"]);
                assert_eq!(layout.as_deref(), Some("PostBanner"));
                assert!(draft);
                assert!(!mdx);
            }
            _ => panic!("Expected New command"),
        }
    }

    #[test]
    fn test_cli_check_command_parsing() {
        let args = ["scriba", "check", "--strict"];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::Check { strict } => assert!(strict),
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let args = ["scriba", "check", "-vv", "--config", "site.toml"];
        let cli = Cli::parse_from(args);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, PathBuf::from("site.toml"));
    }

    #[test]
    fn test_parse_layout() {
        assert_eq!(parse_layout("PostSimple").unwrap(), PostLayout::PostSimple);
        assert!(parse_layout("Wide").is_err());
    }
}
