//! Search documents with an in-memory inverted index.

use std::{collections::HashMap, fs, path::Path};

use scriba_core::{CoreContent, Post};
use tracing::info;

use crate::Result;

/// One searchable post: its listing view without the body.
pub type SearchDocument = CoreContent;

/// Published posts plus an inverted index over title, summary and tags.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    documents: Vec<SearchDocument>,
    index: HashMap<String, Vec<usize>>,
}

impl SearchIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from posts, skipping drafts.
    pub fn from_posts<'a>(posts: impl IntoIterator<Item = &'a Post>) -> Self {
        let documents = posts
            .into_iter()
            .filter(|p| !p.draft)
            .map(Post::core_content)
            .collect();
        Self::from_documents(documents)
    }

    /// Build an index from listing documents.
    pub fn from_documents(documents: Vec<SearchDocument>) -> Self {
        let mut index = Self {
            documents,
            index: HashMap::new(),
        };
        index.build_inverted_index();
        index
    }

    pub fn documents(&self) -> &[SearchDocument] {
        &self.documents
    }

    fn build_inverted_index(&mut self) {
        self.index.clear();

        for (doc_idx, doc) in self.documents.iter().enumerate() {
            for term in document_terms(doc) {
                self.index.entry(term).or_default().push(doc_idx);
            }
        }

        for postings in self.index.values_mut() {
            postings.sort_unstable();
            postings.dedup();
        }

        info!(
            documents = self.documents.len(),
            terms = self.index.len(),
            "Built search index"
        );
    }

    /// Search the index for matching documents.
    ///
    /// Returns documents matching all query terms (AND search), in index order.
    pub fn search(&self, query: &str) -> Vec<&SearchDocument> {
        let query_terms = tokenize_text(query);

        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut result_indices: Option<Vec<usize>> = None;

        for term in &query_terms {
            let Some(postings) = self.index.get(term) else {
                return Vec::new();
            };
            match &mut result_indices {
                None => result_indices = Some(postings.clone()),
                Some(indices) => indices.retain(|idx| postings.binary_search(idx).is_ok()),
            }
        }

        result_indices
            .unwrap_or_default()
            .iter()
            .filter_map(|&idx| self.documents.get(idx))
            .collect()
    }

    /// Serialize the documents to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.documents)?)
    }

    /// Read documents back from JSON and rebuild the index.
    pub fn from_json(json: &str) -> Result<Self> {
        let documents: Vec<SearchDocument> = serde_json::from_str(json)?;
        Ok(Self::from_documents(documents))
    }

    /// Write the documents to a file, creating parent directories.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn document_terms(doc: &SearchDocument) -> Vec<String> {
    let mut terms = tokenize_text(&doc.title);
    terms.extend(tokenize_text(&doc.summary));
    for tag in &doc.tags {
        terms.extend(tokenize_text(tag));
    }
    terms.sort();
    terms.dedup();
    terms
}

/// Tokenize text into normalized terms.
///
/// Words of two or more characters are lowercased. CJK runs also yield single
/// characters and bigrams.
fn tokenize_text(text: &str) -> Vec<String> {
    let mut terms = Vec::new();

    for word in text.split(|c: char| !c.is_alphanumeric() || is_cjk_char(c)) {
        if word.chars().count() >= 2 {
            terms.push(word.to_lowercase());
        }
    }

    let cjk: Vec<char> = text.chars().filter(|c| is_cjk_char(*c)).collect();
    terms.extend(cjk.iter().map(char::to_string));
    terms.extend(cjk.windows(2).map(|pair| pair.iter().collect::<String>()));

    terms
}

fn is_cjk_char(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{3040}'..='\u{309F}'
        | '\u{30A0}'..='\u{30FF}'
        | '\u{AC00}'..='\u{D7AF}'
    )
}
