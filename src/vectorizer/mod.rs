pub mod corpus;
pub mod dictionary;
pub mod index_map;
pub mod source;
pub mod term;
pub mod tfidf;

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::BatchConfig;
use crate::error::{PipelineError, Result};
use crate::store::batcher::{BatchStats, PersistenceBatcher};
use crate::store::{DocumentId, DocumentWord, RecordStore};
use crate::vectorizer::dictionary::DictionaryHandle;
use crate::vectorizer::source::{DocumentSource, Tokenizer};
use crate::vectorizer::tfidf::{DefaultWeightEngine, WeightEngine};

/// A document as (vocabulary index, term frequency) pairs.
pub type Bow = Vec<(u32, u32)>;

/// Bag-of-words vectors paired with the identities of their documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BowCorpus {
    documents: Vec<(DocumentId, Bow)>,
}

impl BowCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, document_id: DocumentId, bow: Bow) {
        self.documents.push((document_id, bow));
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocumentId, &[(u32, u32)])> {
        self.documents.iter().map(|(id, bow)| (*id, bow.as_slice()))
    }

    pub fn bows(&self) -> impl Iterator<Item = &[(u32, u32)]> {
        self.documents.iter().map(|(_, bow)| bow.as_slice())
    }

    /// Token occurrences over all documents.
    pub fn num_tokens(&self) -> u64 {
        self.bows()
            .flat_map(|bow| bow.iter())
            .map(|&(_, count)| count as u64)
            .sum()
    }
}

impl FromIterator<(DocumentId, Bow)> for BowCorpus {
    fn from_iter<I: IntoIterator<Item = (DocumentId, Bow)>>(iter: I) -> Self {
        Self {
            documents: iter.into_iter().collect(),
        }
    }
}

/// Turns documents into weighted document-term records.
///
/// `E` is the weighting engine, `DefaultWeightEngine` unless replaced.
#[derive(Debug, Clone, Default)]
pub struct CorpusVectorizer<E = DefaultWeightEngine>
where
    E: WeightEngine<f64>,
{
    batch: BatchConfig,
    _marker: PhantomData<E>,
}

impl<E> CorpusVectorizer<E>
where
    E: WeightEngine<f64>,
{
    pub fn new(batch: BatchConfig) -> Self {
        Self {
            batch,
            _marker: PhantomData,
        }
    }

    /// Vectorize every document of `source` against the dictionary.
    ///
    /// Writes one `DocumentWord` per (document, known word) pair and returns
    /// the bag-of-words corpus for training or inference. Pairs whose index
    /// does not resolve to a word are skipped. A zero document frequency
    /// aborts the run.
    pub fn vectorize<S>(
        &self,
        store: &mut S,
        handle: &mut DictionaryHandle,
        source: &dyn DocumentSource,
        tokenizer: &dyn Tokenizer,
    ) -> Result<BowCorpus>
    where
        S: RecordStore + ?Sized,
    {
        self.vectorize_with_stats(store, handle, source, tokenizer)
            .map(|(corpus, _)| corpus)
    }

    /// `vectorize`, also returning the write statistics. `records` is the
    /// number of `DocumentWord` rows written.
    pub fn vectorize_with_stats<S>(
        &self,
        store: &mut S,
        handle: &mut DictionaryHandle,
        source: &dyn DocumentSource,
        tokenizer: &dyn Tokenizer,
    ) -> Result<(BowCorpus, BatchStats)>
    where
        S: RecordStore + ?Sized,
    {
        info!("Saving document word vectors in corpus.");
        let dictionary_id = handle.dictionary().id;
        let num_docs = handle.dictionary().num_docs;
        let cache = handle.cache(&*store)?;

        let total = source.count();
        let mut corpus = BowCorpus::new();
        let mut batcher =
            PersistenceBatcher::<DocumentWord, S>::new(store, &self.batch, "document word vectors", total);

        for doc in source.documents() {
            let doc = doc?;
            let tokens = tokenizer.tokenize(&doc.text);
            let bow = cache.vocabulary.doc2bow(&tokens);

            for &(word_index, word_freq) in &bow {
                let Some(word_id) = cache.mapper.lookup(word_index) else {
                    continue;
                };
                let document_freq = cache.vocabulary.document_frequency(word_index).ok_or_else(|| {
                    PipelineError::DataIntegrity(format!("no document frequency for index {word_index}"))
                })?;
                let tfidf = E::weight(word_freq as u64, document_freq, num_docs)?;
                batcher.push(DocumentWord {
                    dictionary_id,
                    word_id,
                    document_id: doc.id,
                    word_index,
                    count: word_freq,
                    tfidf,
                })?;
            }
            batcher.item_done();
            corpus.push(doc.id, bow);
        }

        let stats = batcher.finish()?;
        info!(
            "Created {} word vector entries for {} documents",
            stats.records, stats.processed
        );
        Ok((corpus, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VocabularyConfig;
    use crate::store::memory::MemoryStore;
    use crate::vectorizer::dictionary::VocabularyBuilder;
    use crate::vectorizer::source::{VecSource, WhitespaceTokenizer};

    const TEXTS: [&str; 3] = ["cat dog", "dog bird", "cat bird fish"];

    fn setup() -> (MemoryStore, DictionaryHandle, VecSource) {
        let mut store = MemoryStore::new();
        let source = VecSource::from_texts(TEXTS);
        let builder = VocabularyBuilder::new(
            VocabularyConfig {
                minimum_frequency: 1,
                ..Default::default()
            },
            BatchConfig::default(),
        );
        let handle = builder
            .build_from_source(&mut store, "animals", None, "", &source, &WhitespaceTokenizer)
            .unwrap();
        (store, handle, source)
    }

    fn word_text(store: &MemoryStore, word_id: u64) -> String {
        store.words.iter().find(|w| w.id == word_id).unwrap().text.clone()
    }

    #[test]
    fn weights_follow_raw_count_times_log_ratio() {
        let (mut store, mut handle, source) = setup();
        let vectorizer: CorpusVectorizer = CorpusVectorizer::new(BatchConfig::default());
        let corpus = vectorizer
            .vectorize(&mut store, &mut handle, &source, &WhitespaceTokenizer)
            .unwrap();
        assert_eq!(corpus.len(), 3);

        let first: Vec<&DocumentWord> = store.document_words.iter().filter(|dw| dw.document_id == 1).collect();
        assert_eq!(first.len(), 2);
        let expected = (3.0f64 / 2.0).ln();
        for dw in &first {
            let text = word_text(&store, dw.word_id);
            assert!(text == "cat" || text == "dog");
            assert_eq!(dw.count, 1);
            assert!((dw.tfidf - expected).abs() < 1e-9);
        }

        let fish = store
            .document_words
            .iter()
            .find(|dw| word_text(&store, dw.word_id) == "fish")
            .unwrap();
        assert!((fish.tfidf - 3f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn repeated_terms_scale_the_weight() {
        let (mut store, mut handle, _) = setup();
        let source = VecSource::from_texts(["cat cat cat"]);
        let vectorizer: CorpusVectorizer = CorpusVectorizer::new(BatchConfig::default());
        let corpus = vectorizer
            .vectorize(&mut store, &mut handle, &source, &WhitespaceTokenizer)
            .unwrap();
        let dw = &store.document_words[0];
        assert_eq!(dw.count, 3);
        assert!((dw.tfidf - 3.0 * (1.5f64).ln()).abs() < 1e-9);
        assert_eq!(corpus.num_tokens(), 3);
    }

    #[test]
    fn unknown_tokens_produce_no_records() {
        let (mut store, mut handle, _) = setup();
        let source = VecSource::from_texts(["zebra lion", "cat zebra"]);
        let vectorizer: CorpusVectorizer = CorpusVectorizer::new(BatchConfig::default());
        let corpus = vectorizer
            .vectorize(&mut store, &mut handle, &source, &WhitespaceTokenizer)
            .unwrap();
        assert_eq!(corpus.len(), 2);
        assert!(corpus.iter().next().unwrap().1.is_empty());
        assert_eq!(store.document_words.len(), 1);
    }

    #[test]
    fn zero_document_frequency_aborts() {
        let (mut store, mut handle, source) = setup();
        for w in store.words.iter_mut() {
            w.document_frequency = 0;
        }
        handle.invalidate();
        let vectorizer: CorpusVectorizer = CorpusVectorizer::new(BatchConfig::default());
        let err = vectorizer
            .vectorize(&mut store, &mut handle, &source, &WhitespaceTokenizer)
            .unwrap_err();
        assert!(matches!(err, PipelineError::DataIntegrity(_)));
    }

    #[test]
    fn rerun_after_clearing_is_identical() {
        let (mut store, mut handle, source) = setup();
        let vectorizer: CorpusVectorizer = CorpusVectorizer::new(BatchConfig {
            batch_size: 2,
            ..Default::default()
        });
        let triples = |store: &MemoryStore| -> Vec<(u64, u64, u32, u64)> {
            let mut v: Vec<_> = store
                .document_words
                .iter()
                .map(|dw| (dw.document_id, dw.word_id, dw.count, dw.tfidf.to_bits()))
                .collect();
            v.sort_unstable();
            v
        };

        let (first_corpus, stats) = vectorizer
            .vectorize_with_stats(&mut store, &mut handle, &source, &WhitespaceTokenizer)
            .unwrap();
        let first = triples(&store);
        assert_eq!(stats.records, first.len());
        assert_eq!(stats.processed, 3);
        let id = handle.dictionary().id;
        assert_eq!(store.clear_document_words(id).unwrap(), first.len());

        let second_corpus = vectorizer
            .vectorize(&mut store, &mut handle, &source, &WhitespaceTokenizer)
            .unwrap();
        assert_eq!(first, triples(&store));
        assert_eq!(first_corpus, second_corpus);
    }
}
