//! Input capabilities: document sources and tokenizers.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::store::DocumentId;

/// Trait for tokenization.
pub trait Tokenizer: Send + Sync {
    /// Split a raw text into tokens.
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Splits on whitespace and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }
}

/// Lowercases, splits on anything that is not alphanumeric (keeping `#`,
/// `@` and `_` so hashtags and mentions survive), and drops stopwords and
/// tokens shorter than `min_len` characters.
#[derive(Debug, Clone)]
pub struct SimpleTokenizer {
    min_len: usize,
    stopwords: HashSet<String>,
}

impl Default for SimpleTokenizer {
    fn default() -> Self {
        Self {
            min_len: 1,
            stopwords: HashSet::new(),
        }
    }
}

impl SimpleTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    pub fn stopwords<I, T>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.stopwords = words.into_iter().map(|w| w.as_ref().to_lowercase()).collect();
        self
    }

    /// A short English stopword list.
    pub fn english() -> Self {
        Self::new().min_len(2).stopwords([
            "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "in", "is",
            "it", "of", "on", "or", "that", "the", "to", "was", "were", "will", "with", "rt",
            "http", "https",
        ])
    }
}

impl Tokenizer for SimpleTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !(c.is_alphanumeric() || c == '#' || c == '@' || c == '_'))
            .filter(|tok| tok.chars().count() >= self.min_len.max(1))
            .filter(|tok| !self.stopwords.contains(*tok))
            .map(str::to_string)
            .collect()
    }
}

/// A single document handed to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub id: DocumentId,
    pub text: String,
}

/// Any component that can stream documents.
pub trait DocumentSource {
    /// Number of documents `documents` yields, used for progress reporting.
    fn count(&self) -> usize;

    /// Iterate over the documents. Every call starts from the beginning.
    fn documents(&self) -> Box<dyn Iterator<Item = Result<SourceDocument>> + '_>;
}

/// Documents held in memory.
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    docs: Vec<SourceDocument>,
}

impl VecSource {
    pub fn new(docs: Vec<SourceDocument>) -> Self {
        Self { docs }
    }

    /// Documents numbered from 1 in the given order.
    pub fn from_texts<I, T>(texts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let docs = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| SourceDocument {
                id: i as DocumentId + 1,
                text: text.into(),
            })
            .collect();
        Self { docs }
    }
}

impl DocumentSource for VecSource {
    fn count(&self) -> usize {
        self.docs.len()
    }

    fn documents(&self) -> Box<dyn Iterator<Item = Result<SourceDocument>> + '_> {
        Box::new(self.docs.iter().cloned().map(Ok))
    }
}

/// Every regular file directly inside a directory is one document, read
/// lazily. Files are sorted by path and numbered from 1.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    files: Vec<PathBuf>,
}

impl DirectorySource {
    /// Lists the regular files of `dir`, sorted by path.
    /// A directory entry that cannot be read fails the whole listing.
    pub fn open(dir: &Path) -> Result<Self> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(Self { files })
    }
}

impl DocumentSource for DirectorySource {
    fn count(&self) -> usize {
        self.files.len()
    }

    fn documents(&self) -> Box<dyn Iterator<Item = Result<SourceDocument>> + '_> {
        Box::new(self.files.iter().enumerate().map(|(i, path)| -> Result<SourceDocument> {
            let text = fs::read_to_string(path)?;
            Ok(SourceDocument {
                id: i as DocumentId + 1,
                text,
            })
        }))
    }
}
