use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::vectorizer::term::TermFrequency;

/// keep document count, token totals and per-term document frequencies
///
/// This is the first pass of a vocabulary build: every document is added
/// once, and every distinct term of the document bumps that term's document
/// frequency by one. Terms keep their discovery order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    /// documents added
    pub num_docs: u64,
    /// token occurrences across all documents
    pub num_pos: u64,
    /// distinct (document, term) pairs
    pub num_nnz: u64,
    // document frequency per term
    pub term_counts: IndexMap<Box<str>, u64>,
}

impl Corpus {
    /// Create a new instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tokenized document to the corpus
    pub fn add_document<T>(&mut self, tokens: &[T])
    where
        T: AsRef<str>,
    {
        let mut freq = TermFrequency::new();
        freq.add_terms(tokens);
        self.add_freq(&freq);
    }

    /// Add a document's term counts to the corpus
    pub fn add_freq(&mut self, freq: &TermFrequency) {
        self.num_docs += 1;
        self.num_pos += freq.term_sum();
        self.num_nnz += freq.term_num() as u64;
        for term in freq.term_set_iter() {
            self.term_counts
                .entry(term.into())
                .and_modify(|count| *count += 1)
                .or_insert(1);
        }
    }

    /// Get the number of documents in the corpus
    pub fn get_doc_num(&self) -> u64 {
        self.num_docs
    }

    /// Get the document frequency of a term
    pub fn get_term_count(&self, term: &str) -> u64 {
        self.term_counts.get(term).copied().unwrap_or(0)
    }

    /// Get the current vocabulary size (number of unique terms)
    #[inline]
    pub fn vocab_size(&self) -> usize {
        self.term_counts.len()
    }

    /// Second pass of a vocabulary build.
    ///
    /// Drops terms seen in fewer than `no_below` documents or in more than
    /// `no_above` (a fraction) of all documents, then keeps at most `keep_n`
    /// of the most frequent survivors. The returned order is the compacted
    /// index order.
    pub fn filter_extremes(&self, no_below: u64, no_above: f64, keep_n: Option<usize>) -> Vec<(&str, u64)> {
        let no_above_abs = (no_above * self.num_docs as f64) as u64;
        let mut kept: Vec<(&str, u64)> = self
            .term_counts
            .iter()
            .filter(|&(_, &df)| df >= no_below && (no_above >= 1.0 || df <= no_above_abs))
            .map(|(term, &df)| (&**term, df))
            .collect();

        if let Some(n) = keep_n {
            if kept.len() > n {
                kept.sort_by(|a, b| b.1.cmp(&a.1));
                kept.truncate(n);
            }
        }
        kept
    }
}
