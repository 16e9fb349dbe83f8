//! BibTeX bibliographies and author–year citations.
//!
//! Posts naming a `bibliography` may cite entries as `[@key]` or
//! `[@first; @second]`. Each citation becomes a link to a generated reference
//! list appended to the post.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use thiserror::Error;

use crate::html_escape;

static CITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(@[\w:.#$%&+?<>~/-]+(?:\s*;\s*@[\w:.#$%&+?<>~/-]+)*)\]").unwrap()
});

/// Citation errors.
#[derive(Debug, Error)]
pub enum CitationError {
    #[error("cannot read bibliography {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bibliography not found: {0}")]
    NotFound(String),

    #[error("malformed BibTeX entry near `{0}`")]
    Malformed(String),
}

/// One bibliography entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BibEntry {
    pub key: String,
    pub kind: String,
    pub fields: HashMap<String, String>,
}

impl BibEntry {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Family names of all authors (or editors).
    pub fn family_names(&self) -> Vec<String> {
        let Some(authors) = self.field("author").or_else(|| self.field("editor")) else {
            return Vec::new();
        };

        authors
            .split(" and ")
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(|author| match author.split_once(',') {
                Some((family, _)) => family.trim().to_string(),
                None => author
                    .rsplit(' ')
                    .next()
                    .unwrap_or(author)
                    .trim()
                    .to_string(),
            })
            .collect()
    }

    pub fn year(&self) -> &str {
        self.field("year").unwrap_or("n.d.")
    }

    /// In-text label, e.g. `Smith & Jones, 2020`.
    pub fn label(&self) -> String {
        let names = self.family_names();
        let who = match names.as_slice() {
            [] => self.field("title").unwrap_or(&self.key).to_string(),
            [one] => one.clone(),
            [a, b] => format!("{a} & {b}"),
            [first, ..] => format!("{first} et al."),
        };
        format!("{who}, {}", self.year())
    }

    /// Reference list entry as HTML.
    pub fn reference_html(&self) -> String {
        let names = self.family_names();
        let authors = match names.as_slice() {
            [] => String::new(),
            [one] => format!("{one}. "),
            [init @ .., last] => format!("{}, & {last}. ", init.join(", ")),
        };

        let mut html = format!(
            "<div id=\"ref-{}\" class=\"csl-entry\">{}({}). ",
            html_escape(&self.key),
            html_escape(&authors),
            html_escape(self.year())
        );

        if let Some(title) = self.field("title") {
            html.push_str(&html_escape(title));
            html.push_str(". ");
        }

        let container = self
            .field("journal")
            .or_else(|| self.field("booktitle"))
            .or_else(|| self.field("publisher"));
        if let Some(container) = container {
            html.push_str(&format!("<i>{}</i>. ", html_escape(container)));
        }

        let link = self
            .field("doi")
            .map(|doi| format!("https://doi.org/{doi}"))
            .or_else(|| self.field("url").map(str::to_string));
        if let Some(link) = link {
            let link = html_escape(&link);
            html.push_str(&format!("<a href=\"{link}\">{link}</a>"));
        }

        html.push_str("</div>");
        html
    }
}

/// A parsed BibTeX file.
#[derive(Debug, Clone, Default)]
pub struct Bibliography {
    entries: HashMap<String, BibEntry>,
}

impl Bibliography {
    /// Parse BibTeX text.
    ///
    /// `@comment`, `@string` and `@preamble` blocks are skipped.
    pub fn parse(text: &str) -> Result<Self, CitationError> {
        let mut entries = HashMap::new();
        let mut rest = text;

        while let Some(at) = rest.find('@') {
            rest = &rest[at + 1..];
            let Some(open) = rest.find(['{', '(']) else {
                break;
            };
            let kind = rest[..open].trim().to_lowercase();
            let (body, after) = balanced(&rest[open..])
                .ok_or_else(|| CitationError::Malformed(snippet(rest)))?;
            rest = after;

            if matches!(kind.as_str(), "comment" | "string" | "preamble") || kind.is_empty() {
                continue;
            }

            let (key, fields) = body
                .split_once(',')
                .ok_or_else(|| CitationError::Malformed(snippet(body)))?;
            let key = key.trim().to_string();
            let fields = parse_fields(fields)?;

            entries.insert(key.clone(), BibEntry { key, kind, fields });
        }

        Ok(Self { entries })
    }

    /// Read and parse a BibTeX file.
    pub fn from_file(path: &Path) -> Result<Self, CitationError> {
        let text = std::fs::read_to_string(path).map_err(|source| CitationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Locate `name` next to `document` or in one of its ancestor directories.
    pub fn resolve(document: &Path, name: &str) -> Result<PathBuf, CitationError> {
        let candidate = Path::new(name);
        if candidate.is_absolute() {
            return candidate
                .exists()
                .then(|| candidate.to_path_buf())
                .ok_or_else(|| CitationError::NotFound(name.to_string()));
        }

        document
            .ancestors()
            .skip(1)
            .map(|dir| dir.join(candidate))
            .find(|p| p.is_file())
            .ok_or_else(|| CitationError::NotFound(name.to_string()))
    }

    pub fn get(&self, key: &str) -> Option<&BibEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Tracks citations within one document.
#[derive(Debug)]
pub struct CitationProcessor<'a> {
    bibliography: &'a Bibliography,
    cited: Vec<String>,
}

impl<'a> CitationProcessor<'a> {
    pub fn new(bibliography: &'a Bibliography) -> Self {
        Self {
            bibliography,
            cited: Vec::new(),
        }
    }

    /// Escape `text` as HTML, turning known citations into links.
    ///
    /// A bracket containing any unknown key is left as written.
    pub fn render_text(&mut self, text: &str) -> String {
        let bibliography = self.bibliography;
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for caps in CITATION_RE.captures_iter(text) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let keys: Vec<&str> = inner
                .as_str()
                .split(';')
                .map(|k| k.trim().trim_start_matches('@'))
                .collect();

            let Some(entries) = keys
                .iter()
                .map(|k| bibliography.get(k))
                .collect::<Option<Vec<_>>>()
            else {
                tracing::debug!(citation = whole.as_str(), "unknown citation key");
                continue;
            };

            out.push_str(&html_escape(&text[last..whole.start()]));
            let links: Vec<String> = entries
                .iter()
                .map(|entry| {
                    if !self.cited.contains(&entry.key) {
                        self.cited.push(entry.key.clone());
                    }
                    format!(
                        "<a href=\"#ref-{}\">{}</a>",
                        html_escape(&entry.key),
                        html_escape(&entry.label())
                    )
                })
                .collect();
            out.push_str(&format!(
                "<span class=\"citation\">({})</span>",
                links.join("; ")
            ));
            last = whole.end();
        }

        out.push_str(&html_escape(&text[last..]));
        out
    }

    /// Keys cited so far, in order of first use.
    pub fn cited(&self) -> &[String] {
        &self.cited
    }

    /// Reference list for everything cited, sorted by author then year.
    pub fn references_html(&self) -> Option<String> {
        if self.cited.is_empty() {
            return None;
        }

        let mut entries: Vec<&BibEntry> = self
            .cited
            .iter()
            .filter_map(|k| self.bibliography.get(k))
            .collect();
        entries.sort_by(|a, b| {
            a.family_names()
                .first()
                .cmp(&b.family_names().first())
                .then_with(|| a.year().cmp(b.year()))
        });

        let mut html = String::from(
            "<div id=\"refs\" class=\"references csl-bib-body\">\n<h2 id=\"references\">References</h2>\n",
        );
        for entry in entries {
            html.push_str(&entry.reference_html());
            html.push('\n');
        }
        html.push_str("</div>\n");
        Some(html)
    }
}

/// Split `{...}` or `(...)` at the start of `s` into its body and the remainder.
fn balanced(s: &str) -> Option<(&str, &str)> {
    let open = s.chars().next()?;
    let close = if open == '(' { ')' } else { '}' };
    let mut depth = 0usize;

    for (i, c) in s.char_indices() {
        if c == open || (open == '(' && c == '{') {
            depth += 1;
        } else if c == close || (open == '(' && c == '}') {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some((&s[1..i], &s[i + 1..]));
            }
        }
    }

    None
}

fn parse_fields(body: &str) -> Result<HashMap<String, String>, CitationError> {
    let mut fields = HashMap::new();
    let mut rest = body.trim_start();

    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else {
            break;
        };
        let name = rest[..eq].trim().trim_start_matches(',').trim().to_lowercase();
        let value_src = rest[eq + 1..].trim_start();

        let (value, after) = if value_src.starts_with('{') {
            balanced(value_src).ok_or_else(|| CitationError::Malformed(snippet(value_src)))?
        } else if let Some(quoted) = value_src.strip_prefix('"') {
            let end = quoted
                .find('"')
                .ok_or_else(|| CitationError::Malformed(snippet(value_src)))?;
            (&quoted[..end], &quoted[end + 1..])
        } else {
            let end = value_src.find(',').unwrap_or(value_src.len());
            (value_src[..end].trim(), &value_src[end..])
        };

        fields.insert(name, clean_value(value));
        rest = after.trim_start().trim_start_matches(',').trim_start();
    }

    Ok(fields)
}

/// Drop braces and collapse whitespace.
fn clean_value(value: &str) -> String {
    value
        .replace(['{', '}'], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn snippet(s: &str) -> String {
    s.chars().take(30).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BIB: &str = r#"
@comment{ generated by hand }

@article{Nash1950,
  title = {Equilibrium points in n-person games},
  author = {Nash, John F},
  journal = {Proceedings of the National Academy of Sciences},
  volume = 36,
  year = {1950},
  doi = {10.1073/pnas.36.1.48}
}

@book{Knuth1984,
  author = "Donald E. Knuth",
  title = "The {TeX}book",
  publisher = "Addison-Wesley",
  year = 1984,
}

@inproceedings{Lamport1978,
  author = {Leslie Lamport and Robert Shostak and Marshall Pease},
  title = {The Byzantine Generals Problem},
  year = {1982}
}
"#;

    #[test]
    fn test_parse_bibtex() {
        let bib = Bibliography::parse(BIB).unwrap();
        assert_eq!(bib.len(), 3);

        let nash = bib.get("Nash1950").unwrap();
        assert_eq!(nash.kind, "article");
        assert_eq!(nash.family_names(), vec!["Nash"]);
        assert_eq!(nash.year(), "1950");
        assert_eq!(nash.label(), "Nash, 1950");

        let knuth = bib.get("Knuth1984").unwrap();
        assert_eq!(knuth.fields["title"], "The TeXbook");
        assert_eq!(knuth.year(), "1984");
        assert_eq!(knuth.label(), "Knuth, 1984");

        let lamport = bib.get("Lamport1978").unwrap();
        assert_eq!(lamport.label(), "Lamport et al., 1982");
    }

    #[test]
    fn test_malformed_bibtex() {
        assert!(Bibliography::parse("@article{broken, title = {never closed").is_err());
    }

    #[test]
    fn test_render_citations() {
        let bib = Bibliography::parse(BIB).unwrap();
        let mut processor = CitationProcessor::new(&bib);

        let html = processor.render_text("Games [@Nash1950] & type [@Knuth1984; @Nash1950].");
        assert!(html.starts_with("Games <span class=\"citation\">(<a href=\"#ref-Nash1950\">Nash, 1950</a>)</span> &amp; type"));
        assert!(html.contains("Knuth, 1984</a>; <a href=\"#ref-Nash1950\">"));
        assert_eq!(processor.cited(), ["Nash1950", "Knuth1984"]);
    }

    #[test]
    fn test_unknown_key_left_untouched() {
        let bib = Bibliography::parse(BIB).unwrap();
        let mut processor = CitationProcessor::new(&bib);

        assert_eq!(processor.render_text("See [@missing]."), "See [@missing].");
        assert!(processor.references_html().is_none());
    }

    #[test]
    fn test_references_sorted() {
        let bib = Bibliography::parse(BIB).unwrap();
        let mut processor = CitationProcessor::new(&bib);
        processor.render_text("[@Nash1950] [@Knuth1984]");

        let refs = processor.references_html().unwrap();
        let knuth = refs.find("ref-Knuth1984").unwrap();
        let nash = refs.find("ref-Nash1950").unwrap();
        assert!(knuth < nash);
        assert!(refs.contains("https://doi.org/10.1073/pnas.36.1.48"));
        assert!(refs.contains("<i>Addison-Wesley</i>"));
    }

    #[test]
    fn test_resolve_in_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        let blog = dir.path().join("data/blog");
        std::fs::create_dir_all(&blog).unwrap();
        std::fs::write(dir.path().join("data/refs.bib"), BIB).unwrap();

        let found = Bibliography::resolve(&blog.join("post.md"), "refs.bib").unwrap();
        assert_eq!(found, dir.path().join("data/refs.bib"));
        assert!(Bibliography::resolve(&blog.join("post.md"), "none.bib").is_err());
    }
}
