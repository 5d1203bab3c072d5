use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::info;

use crate::store::{Word, WordId};
use crate::vectorizer::term::TermFrequency;
use crate::vectorizer::Bow;

/// Compact vocabulary index <-> persisted word identity.
#[derive(Debug, Clone, Default)]
pub struct IndexMapper {
    index_to_id: HashMap<u32, WordId>,
    id_to_index: HashMap<WordId, u32>,
}

impl IndexMapper {
    pub fn from_words(words: &[Word]) -> Self {
        let mut mapper = Self::default();
        for word in words {
            mapper.index_to_id.insert(word.index, word.id);
            mapper.id_to_index.insert(word.id, word.index);
        }
        mapper
    }

    /// Word identity of a compact index, `None` if the index was never assigned.
    #[inline]
    pub fn lookup(&self, index: u32) -> Option<WordId> {
        self.index_to_id.get(&index).copied()
    }

    #[inline]
    pub fn index_of(&self, word_id: WordId) -> Option<u32> {
        self.id_to_index.get(&word_id).copied()
    }

    pub fn len(&self) -> usize {
        self.index_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_to_id.is_empty()
    }
}

/// In-memory view of a persisted dictionary: token -> index and
/// index -> (token, document frequency).
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    token_to_index: IndexMap<String, u32>,
    entries: HashMap<u32, (String, u64)>,
}

impl Vocabulary {
    pub fn from_words(words: &[Word]) -> Self {
        let mut vocab = Self::default();
        for word in words {
            vocab.token_to_index.insert(word.text.clone(), word.index);
            vocab
                .entries
                .insert(word.index, (word.text.clone(), word.document_frequency));
        }
        vocab
    }

    pub fn len(&self) -> usize {
        self.token_to_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.token_to_index.is_empty()
    }

    /// One past the largest index, the dimension bag-of-words vectors live in.
    pub fn dimension(&self) -> usize {
        self.entries.keys().max().map_or(0, |&max| max as usize + 1)
    }

    pub fn index_of(&self, token: &str) -> Option<u32> {
        self.token_to_index.get(token).copied()
    }

    pub fn token(&self, index: u32) -> Option<&str> {
        self.entries.get(&index).map(|(text, _)| text.as_str())
    }

    pub fn document_frequency(&self, index: u32) -> Option<u64> {
        self.entries.get(&index).map(|&(_, df)| df)
    }

    /// Bag-of-words of a tokenized document: (index, count) pairs in order of
    /// first occurrence. Tokens outside the vocabulary are dropped.
    pub fn doc2bow<T>(&self, tokens: &[T]) -> Bow
    where
        T: AsRef<str>,
    {
        let mut freq = TermFrequency::new();
        freq.add_terms(tokens);
        freq.iter()
            .filter_map(|(term, count)| self.index_of(term).map(|idx| (idx, count as u32)))
            .collect()
    }
}

/// Derived state of one dictionary, built from a single scan of its words.
#[derive(Debug, Clone, Default)]
pub struct DictionaryCache {
    pub vocabulary: Vocabulary,
    pub mapper: IndexMapper,
}

impl DictionaryCache {
    pub fn from_words(words: &[Word]) -> Self {
        let cache = Self {
            vocabulary: Vocabulary::from_words(words),
            mapper: IndexMapper::from_words(words),
        };
        info!("Dictionary contains {} words", cache.vocabulary.len());
        cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words() -> Vec<Word> {
        ["cat", "dog", "bird"]
            .iter()
            .enumerate()
            .map(|(i, t)| Word {
                id: 100 + i as u64,
                dictionary_id: 1,
                index: i as u32,
                text: t.to_string(),
                document_frequency: 2,
            })
            .collect()
    }

    #[test]
    fn lookup_round_trips_and_misses_are_none() {
        let mapper = IndexMapper::from_words(&words());
        for i in 0..3u32 {
            let id = mapper.lookup(i).unwrap();
            assert_eq!(id, 100 + i as u64);
            assert_eq!(mapper.index_of(id), Some(i));
        }
        assert_eq!(mapper.lookup(3), None);
        assert_eq!(mapper.lookup(u32::MAX), None);
        assert_eq!(mapper.index_of(1), None);
    }

    #[test]
    fn doc2bow_counts_known_tokens_only() {
        let vocab = Vocabulary::from_words(&words());
        let bow = vocab.doc2bow(&["dog", "fish", "cat", "dog"]);
        assert_eq!(bow, vec![(1, 2), (0, 1)]);
        assert!(vocab.doc2bow::<&str>(&[]).is_empty());
        assert_eq!(vocab.token(2), Some("bird"));
        assert_eq!(vocab.document_frequency(1), Some(2));
        assert_eq!(vocab.dimension(), 3);
    }
}
