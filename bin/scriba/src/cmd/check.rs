//! Check command - validate configuration and content

use std::{collections::HashSet, path::Path};

use color_eyre::eyre::{Result, WrapErr, bail};
use scriba_core::{Config, ContentPath, Post};
use scriba_generator::collector::find_content_files;
use scriba_parser::{Bibliography, ParserRegistry};

use crate::site_root;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Number of content files checked.
    pub checked: usize,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Run the check command.
///
/// Validates configuration and all content files.
pub fn run(config_path: &Path, strict: bool) -> Result<()> {
    tracing::info!(?config_path, strict, "Checking configuration and content");

    let result = validate(config_path)?;

    println!();
    println!("Summary:");
    println!("  Files:    {}", result.checked);
    println!("  Errors:   {}", result.errors.len());
    println!("  Warnings: {}", result.warnings.len());

    if result.has_errors() {
        println!();
        println!("Errors:");
        for err in &result.errors {
            println!("  ✗ {err}");
        }
    }

    if result.has_warnings() {
        println!();
        println!("Warnings:");
        for warn in &result.warnings {
            println!("  ⚠ {warn}");
        }
    }

    if result.has_errors() {
        bail!("Validation failed with {} error(s)", result.errors.len());
    }

    if strict && result.has_warnings() {
        bail!(
            "Validation failed with {} warning(s) (strict mode)",
            result.warnings.len()
        );
    }

    println!();
    println!("✓ All checks passed");

    Ok(())
}

/// Load the configuration and parse every post and author profile.
///
/// A configuration that cannot be loaded is an error for the command itself.
pub fn validate(config_path: &Path) -> Result<ValidationResult> {
    let config = Config::load(config_path).wrap_err("Failed to load configuration")?;
    let root = site_root(config_path);

    let mut result = ValidationResult::default();
    for warning in config.warnings() {
        result.add_warning(warning);
    }

    check_syntax_themes(&config, &mut result);

    let content_dir = root.join(&config.build.content_dir);
    if !content_dir.exists() {
        result.add_warning(format!(
            "content directory does not exist: {}",
            content_dir.display()
        ));
        return Ok(result);
    }

    let authors = author_slugs(&root.join(&config.build.authors_dir))?;
    let registry = ParserRegistry::new();

    for path in find_content_files(&content_dir)? {
        result.checked += 1;

        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                result.add_error(format!("{}: failed to read file: {e}", path.display()));
                continue;
            }
        };

        let parsed = match registry.parse(&content, &path) {
            Ok(parsed) => parsed,
            Err(e) => {
                result.add_error(format!("{}: {e}", path.display()));
                continue;
            }
        };

        if let Some(name) = &parsed.frontmatter.bibliography
            && let Err(e) = Bibliography::resolve(&path, name)
        {
            result.add_warning(format!("{}: {e}", path.display()));
        }

        let relative = path.strip_prefix(&content_dir).unwrap_or(&path);
        let Some(content_path) = ContentPath::from_path(relative) else {
            continue;
        };
        let post = Post::from_parsed(parsed, &content_path);

        if post.date.is_none() && !post.draft {
            result.add_warning(format!("{}: published post has no date", path.display()));
        }

        for author in post.authors.iter().filter(|a| !authors.contains(a.as_str())) {
            result.add_warning(format!(
                "{}: unknown author `{author}`",
                path.display()
            ));
        }
    }

    println!("  ✓ Checked {} content files", result.checked);
    Ok(result)
}

fn check_syntax_themes(config: &Config, result: &mut ValidationResult) {
    let highlighter = scriba_parser::SyntaxHighlighter::new();
    if let Err(e) =
        highlighter.stylesheet(&config.build.syntax_theme, &config.build.syntax_theme_dark)
    {
        result.add_error(format!("build: {e}"));
    }
}

/// Author profile slugs available under `dir`.
fn author_slugs(dir: &Path) -> Result<HashSet<String>> {
    let files = find_content_files(dir).wrap_err("Failed to read authors directory")?;
    Ok(files
        .iter()
        .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .collect())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write_site(root: &Path, config: &str) {
        fs::write(root.join("config.toml"), config).unwrap();
        fs::create_dir_all(root.join("data/blog")).unwrap();
        fs::create_dir_all(root.join("data/authors")).unwrap();
        fs::write(root.join("data/authors/default.md"), "---\nname: Jane\n---\n").unwrap();
    }

    const CONFIG: &str = "title = \"Blog\"\nsiteUrl = \"https://blog.example.com\"\n";

    #[test]
    fn test_clean_site_passes() {
        let site = tempfile::tempdir().unwrap();
        write_site(site.path(), CONFIG);
        fs::write(
            site.path().join("data/blog/ok.md"),
            "---\ntitle: Ok\ndate: 2024-01-01\n---\nBody\n",
        )
        .unwrap();

        let result = validate(&site.path().join("config.toml")).unwrap();
        assert_eq!(result.checked, 1);
        assert!(!result.has_errors());
        assert!(!result.has_warnings());
        assert!(run(&site.path().join("config.toml"), true).is_ok());
    }

    #[test]
    fn test_reports_problems() {
        let site = tempfile::tempdir().unwrap();
        write_site(site.path(), CONFIG);
        fs::write(site.path().join("data/blog/untitled.md"), "---\ndate: 2024-01-01\n---\n").unwrap();
        fs::write(
            site.path().join("data/blog/guest.md"),
            "---\ntitle: Guest\nauthors: [nobody]\nbibliography: refs.bib\n---\nBody\n",
        )
        .unwrap();

        let result = validate(&site.path().join("config.toml")).unwrap();

        assert_eq!(result.checked, 2);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("untitled.md"));
        assert!(result.warnings.iter().any(|w| w.contains("unknown author `nobody`")));
        assert!(result.warnings.iter().any(|w| w.contains("refs.bib")));
        assert!(result.warnings.iter().any(|w| w.contains("has no date")));
        assert!(run(&site.path().join("config.toml"), false).is_err());
    }

    #[test]
    fn test_strict_mode_fails_on_warnings() {
        let site = tempfile::tempdir().unwrap();
        write_site(
            site.path(),
            "title = \"Blog\"\nsiteUrl = \"https://blog.example.com/\"\n",
        );

        assert!(run(&site.path().join("config.toml"), false).is_ok());
        assert!(run(&site.path().join("config.toml"), true).is_err());
    }

    #[test]
    fn test_unknown_syntax_theme_is_error() {
        let site = tempfile::tempdir().unwrap();
        write_site(
            site.path(),
            "title = \"Blog\"\nsiteUrl = \"https://blog.example.com\"\n[build]\nsyntaxTheme = \"nope\"\n",
        );

        let result = validate(&site.path().join("config.toml")).unwrap();
        assert!(result.has_errors());
    }
}
