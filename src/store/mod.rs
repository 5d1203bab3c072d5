//! Persisted entities and the record store interface.
//!
//! The relational store itself is external. The pipeline only needs to create
//! a handful of parent rows (dictionaries, topic models, topics), bulk insert
//! everything else, and read back a few row sets.

pub mod artifact;
pub mod batcher;
pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub type DictionaryId = u64;
pub type WordId = u64;
pub type TopicModelId = u64;
pub type TopicId = u64;
pub type DocumentId = u64;
pub type DatasetId = u64;

/// Persisted vocabulary plus corpus-scale counters for one corpus generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dictionary {
    pub id: DictionaryId,
    pub name: String,
    pub dataset: Option<DatasetId>,
    /// opaque, stored as given
    pub settings: String,
    pub created_at: DateTime<Utc>,
    /// documents seen at build time
    pub num_docs: u64,
    /// token occurrences across all documents
    pub num_pos: u64,
    /// distinct (document, term) pairs
    pub num_nnz: u64,
}

#[derive(Debug, Clone)]
pub struct NewDictionary {
    pub name: String,
    pub dataset: Option<DatasetId>,
    pub settings: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub id: WordId,
    pub dictionary_id: DictionaryId,
    /// compact index in `[0, vocabulary_size)`
    pub index: u32,
    pub text: String,
    pub document_frequency: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewWord {
    pub dictionary_id: DictionaryId,
    pub index: u32,
    pub text: String,
    pub document_frequency: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicModel {
    pub id: TopicModelId,
    pub dictionary_id: DictionaryId,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// log perplexity, 0 until evaluated
    pub perplexity: f64,
}

#[derive(Debug, Clone)]
pub struct NewTopicModel {
    pub dictionary_id: DictionaryId,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    pub model_id: TopicModelId,
    pub index: u32,
    pub alpha: f64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct NewTopic {
    pub model_id: TopicModelId,
    pub index: u32,
    pub alpha: f64,
    pub name: String,
}

/// A word's weight under one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicWord {
    pub topic_id: TopicId,
    pub word_id: WordId,
    /// cached `Word::index` at fit time
    pub word_index: u32,
    pub probability: f64,
}

/// Term count and weight of one word in one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentWord {
    pub dictionary_id: DictionaryId,
    pub word_id: WordId,
    pub document_id: DocumentId,
    pub word_index: u32,
    pub count: u32,
    pub tfidf: f64,
}

/// Mixture weight of one topic in one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTopic {
    pub model_id: TopicModelId,
    pub topic_id: TopicId,
    pub document_id: DocumentId,
    pub probability: f64,
}

/// Destination of bulk writes for one record type.
pub trait BulkSink<R> {
    /// Insert all records in one write. A failure is fatal to the caller's run.
    fn bulk_insert(&mut self, records: Vec<R>) -> Result<()>;

    /// Drop any accumulated per-operation diagnostics (query logs and the like).
    fn release_diagnostics(&mut self) {}
}

/// Everything the pipeline stages need from the relational store.
pub trait RecordStore:
    BulkSink<NewWord> + BulkSink<TopicWord> + BulkSink<DocumentWord> + BulkSink<DocumentTopic>
{
    fn create_dictionary(&mut self, new: NewDictionary) -> Result<Dictionary>;
    fn save_dictionary(&mut self, dictionary: &Dictionary) -> Result<()>;
    fn dictionary(&self, id: DictionaryId) -> Result<Option<Dictionary>>;
    /// All words of a dictionary, in insertion order.
    fn words(&self, dictionary_id: DictionaryId) -> Result<Vec<Word>>;

    fn create_topic_model(&mut self, new: NewTopicModel) -> Result<TopicModel>;
    fn save_topic_model(&mut self, model: &TopicModel) -> Result<()>;
    fn topic_model(&self, id: TopicModelId) -> Result<Option<TopicModel>>;

    fn create_topic(&mut self, new: NewTopic) -> Result<Topic>;
    fn save_topic(&mut self, topic: &Topic) -> Result<()>;
    /// Topics of a model ordered by `index`.
    fn topics(&self, model_id: TopicModelId) -> Result<Vec<Topic>>;
    /// Topic words of a topic, in insertion order.
    fn topic_words(&self, topic_id: TopicId) -> Result<Vec<TopicWord>>;

    fn document_words(&self, dictionary_id: DictionaryId) -> Result<Vec<DocumentWord>>;
    fn document_topics(&self, model_id: TopicModelId) -> Result<Vec<DocumentTopic>>;

    /// Delete a previous vectorization run's output. Returns the number of rows removed.
    fn clear_document_words(&mut self, dictionary_id: DictionaryId) -> Result<usize>;
    /// Delete a previous inference run's output. Returns the number of rows removed.
    fn clear_document_topics(&mut self, model_id: TopicModelId) -> Result<usize>;
}
