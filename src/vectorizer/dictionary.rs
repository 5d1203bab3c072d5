use tracing::info;

use crate::config::{BatchConfig, VocabularyConfig};
use crate::error::Result;
use crate::store::batcher::PersistenceBatcher;
use crate::store::{DatasetId, Dictionary, NewDictionary, NewWord, RecordStore, WordId};
use crate::vectorizer::corpus::Corpus;
use crate::vectorizer::index_map::DictionaryCache;
use crate::vectorizer::source::{DocumentSource, Tokenizer};

/// Runtime handle of a persisted dictionary.
///
/// Owns the derived `DictionaryCache`, which is built from the word rows on
/// first use and kept until `invalidate` is called. Regenerating the words
/// of the dictionary requires invalidating the cache.
#[derive(Debug, Clone)]
pub struct DictionaryHandle {
    dictionary: Dictionary,
    cache: Option<DictionaryCache>,
}

impl DictionaryHandle {
    pub fn new(dictionary: Dictionary) -> Self {
        Self {
            dictionary,
            cache: None,
        }
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn into_dictionary(self) -> Dictionary {
        self.dictionary
    }

    /// Derived state, scanning the dictionary's words on first access.
    pub fn cache<S>(&mut self, store: &S) -> Result<&DictionaryCache>
    where
        S: RecordStore + ?Sized,
    {
        if self.cache.is_none() {
            info!("Building vocabulary cache for dictionary '{}'", self.dictionary.name);
            let words = store.words(self.dictionary.id)?;
            self.cache = Some(DictionaryCache::from_words(&words));
        }
        Ok(self.cache.get_or_insert_with(DictionaryCache::default))
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Drop the derived state; the next access rescans the words.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// Word identity of a compact index, `None` if unknown.
    pub fn get_word_id<S>(&mut self, store: &S, index: u32) -> Result<Option<WordId>>
    where
        S: RecordStore + ?Sized,
    {
        Ok(self.cache(store)?.mapper.lookup(index))
    }
}

/// Builds a dictionary from tokenized documents in two passes: tally, then
/// filter and compact.
#[derive(Debug, Clone, Default)]
pub struct VocabularyBuilder {
    config: VocabularyConfig,
    batch: BatchConfig,
}

impl VocabularyBuilder {
    pub fn new(config: VocabularyConfig, batch: BatchConfig) -> Self {
        Self { config, batch }
    }

    /// Build from already tokenized documents.
    pub fn build<S, I, D, T>(
        &self,
        store: &mut S,
        name: &str,
        dataset: Option<DatasetId>,
        settings: &str,
        documents: I,
    ) -> Result<DictionaryHandle>
    where
        S: RecordStore + ?Sized,
        I: IntoIterator<Item = D>,
        D: AsRef<[T]>,
        T: AsRef<str>,
    {
        info!("Building a dictionary from texts");
        let mut corpus = Corpus::new();
        for doc in documents {
            corpus.add_document(doc.as_ref());
        }
        self.persist(store, name, dataset, settings, &corpus)
    }

    /// Build by streaming a document source through a tokenizer.
    pub fn build_from_source<S>(
        &self,
        store: &mut S,
        name: &str,
        dataset: Option<DatasetId>,
        settings: &str,
        source: &dyn DocumentSource,
        tokenizer: &dyn Tokenizer,
    ) -> Result<DictionaryHandle>
    where
        S: RecordStore + ?Sized,
    {
        info!("Building a dictionary from {} documents", source.count());
        let mut corpus = Corpus::new();
        for doc in source.documents() {
            let doc = doc?;
            corpus.add_document(&tokenizer.tokenize(&doc.text));
        }
        self.persist(store, name, dataset, settings, &corpus)
    }

    fn persist<S>(
        &self,
        store: &mut S,
        name: &str,
        dataset: Option<DatasetId>,
        settings: &str,
        corpus: &Corpus,
    ) -> Result<DictionaryHandle>
    where
        S: RecordStore + ?Sized,
    {
        info!("Dictionary contains {} words. Filtering...", corpus.vocab_size());
        let kept = corpus.filter_extremes(
            self.config.minimum_frequency,
            self.config.maximum_fraction,
            self.config.keep_n,
        );
        info!("Dictionary contains {} words.", kept.len());

        let mut dictionary = store.create_dictionary(NewDictionary {
            name: name.to_string(),
            dataset,
            settings: settings.to_string(),
        })?;
        dictionary.num_docs = corpus.num_docs;
        dictionary.num_pos = corpus.num_pos;
        dictionary.num_nnz = corpus.num_nnz;
        store.save_dictionary(&dictionary)?;

        info!("Saving dictionary '{}' in the database", dictionary.name);
        let mut batcher =
            PersistenceBatcher::<NewWord, S>::new(store, &self.batch, "dictionary words", kept.len());
        for (index, (text, df)) in kept.into_iter().enumerate() {
            batcher.push(NewWord {
                dictionary_id: dictionary.id,
                index: index as u32,
                text: text.to_string(),
                document_frequency: df,
            })?;
            batcher.item_done();
        }
        batcher.finish()?;

        Ok(DictionaryHandle::new(dictionary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::BulkSink;

    fn tokenized(docs: &[&str]) -> Vec<Vec<String>> {
        docs.iter()
            .map(|d| d.split_whitespace().map(str::to_string).collect())
            .collect()
    }

    fn builder(minimum_frequency: u64) -> VocabularyBuilder {
        VocabularyBuilder::new(
            VocabularyConfig {
                minimum_frequency,
                ..Default::default()
            },
            BatchConfig::default(),
        )
    }

    #[test]
    fn surviving_indices_are_contiguous_and_frequent_enough() {
        let mut store = MemoryStore::new();
        let docs = tokenized(&["a b c d", "a b c", "a b", "a e", "f g a"]);
        let handle = builder(2).build(&mut store, "d", None, "", &docs).unwrap();

        let words = store.words(handle.dictionary().id).unwrap();
        let mut indices: Vec<u32> = words.iter().map(|w| w.index).collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..words.len() as u32).collect::<Vec<_>>());
        assert!(words.iter().all(|w| w.document_frequency >= 2));

        let mut texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        texts.sort_unstable();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn counters_describe_the_whole_corpus() {
        let mut store = MemoryStore::new();
        let docs = tokenized(&["cat dog", "dog bird", "cat bird fish"]);
        let handle = builder(2).build(&mut store, "d", Some(4), "{\"k\":1}", &docs).unwrap();
        let d = store.dictionary(handle.dictionary().id).unwrap().unwrap();
        assert_eq!(d.num_docs, 3);
        assert_eq!(d.num_pos, 7);
        assert_eq!(d.num_nnz, 7);
        assert_eq!(d.dataset, Some(4));
        assert_eq!(d.settings, "{\"k\":1}");
        // fish is dropped
        assert_eq!(store.words(d.id).unwrap().len(), 3);
    }

    #[test]
    fn empty_corpus_is_not_an_error() {
        let mut store = MemoryStore::new();
        let docs: Vec<Vec<String>> = Vec::new();
        let handle = builder(2).build(&mut store, "empty", None, "", &docs).unwrap();
        let d = handle.dictionary();
        assert_eq!((d.num_docs, d.num_pos, d.num_nnz), (0, 0, 0));
        assert!(store.words(d.id).unwrap().is_empty());
    }

    #[test]
    fn cache_is_lazy_and_explicitly_invalidated() {
        let mut store = MemoryStore::new();
        let docs = tokenized(&["x y", "x y", "z"]);
        let mut handle = builder(2).build(&mut store, "d", None, "", &docs).unwrap();
        assert!(!handle.is_cached());

        let words = store.words(handle.dictionary().id).unwrap();
        for w in &words {
            assert_eq!(handle.get_word_id(&store, w.index).unwrap(), Some(w.id));
        }
        assert!(handle.is_cached());
        assert_eq!(handle.get_word_id(&store, 99).unwrap(), None);

        // words added underneath are invisible until invalidation
        store
            .bulk_insert(vec![NewWord {
                dictionary_id: handle.dictionary().id,
                index: 2,
                text: "z".into(),
                document_frequency: 1,
            }])
            .unwrap();
        assert_eq!(handle.get_word_id(&store, 2).unwrap(), None);
        handle.invalidate();
        assert!(handle.get_word_id(&store, 2).unwrap().is_some());
    }
}
