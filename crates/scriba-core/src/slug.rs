//! GitHub-style slugs for tags and heading anchors.

use std::collections::HashMap;

/// Convert text to a URL-safe slug.
///
/// Lowercases, keeps letters, digits, `-` and `_`, turns every space into `-`
/// and drops everything else. Runs of spaces are not collapsed, matching the
/// anchors GitHub generates for headings.
pub fn slugify(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                Some(c)
            } else if c == ' ' {
                Some('-')
            } else {
                None
            }
        })
        .collect()
}

/// Slug generator that keeps slugs unique within one document.
///
/// The second occurrence of `intro` becomes `intro-1`, the third `intro-2`.
#[derive(Debug, Default, Clone)]
pub struct Slugger {
    occurrences: HashMap<String, usize>,
}

impl Slugger {
    /// Create an empty slugger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Slugify `text` and disambiguate against previous results.
    pub fn slug(&mut self, text: &str) -> String {
        let base = slugify(text);
        let mut candidate = base.clone();

        while self.occurrences.contains_key(&candidate) {
            let count = self.occurrences.entry(base.clone()).or_insert(0);
            *count += 1;
            candidate = format!("{base}-{count}");
        }

        self.occurrences.insert(candidate.clone(), 0);
        candidate
    }

    /// Forget all previously generated slugs.
    pub fn reset(&mut self) {
        self.occurrences.clear();
    }
}
