//! This crate is a batch pipeline that turns a document collection into a
//! persisted vocabulary, tf-idf weighted word vectors and a topic model.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod store;
pub mod topic;
pub mod vectorizer;

/// Pipeline
/// Runs every stage over one document source, in order:
/// - build and persist the vocabulary
/// - vectorize documents into weighted word records
/// - fit a topic model and persist its topics
/// - write the topic mixture of each document
/// - score the model and store the score
///
/// `Pipeline<B>` is generic over the fitting backend `B`, `LdaBackend` by default.
/// Each stage is also usable on its own.
pub use pipeline::{Pipeline, PipelineReport};

/// Pipeline configuration
/// Grouped settings for batching, vocabulary filtering, training and
/// inference. Every field has a default, and a JSON file may set any subset.
pub use config::PipelineConfig;

/// Error type
/// Every fallible operation of this crate returns `Result<T>` with
/// `PipelineError`.
pub use error::{PipelineError, Result};

/// Record store
/// The persistence boundary. Parent rows (dictionaries, topic models, topics)
/// are created one at a time, everything else goes through `BulkSink` in
/// batches.
///
/// `MemoryStore` is the in-process implementation.
///
/// # Serialization
/// Supported for `MemoryStore` and every entity.
pub use store::{BulkSink, RecordStore};

/// Vocabulary builder
/// Counts tokens over all documents, filters rare and common terms, assigns
/// contiguous indices and persists one word per index.
///
/// Returns a `DictionaryHandle`, which owns the lazily built
/// index <-> word lookup tables.
pub use vectorizer::dictionary::{DictionaryHandle, VocabularyBuilder};

/// Corpus vectorizer
/// Writes the term count and tf-idf weight of each (document, word) pair and
/// returns the bag-of-words corpus used for training and inference.
///
/// The weighting engine is a type parameter, `DefaultWeightEngine` by default:
/// `tf * ln(num_docs / df)` with the raw term count as `tf`.
pub use vectorizer::{BowCorpus, CorpusVectorizer};

/// Topic modeling
/// `TopicBackend` fits a model, `FittedModel` is what it produces.
/// The default backend is LDA fitted by collapsed Gibbs sampling, optionally
/// on several worker threads.
///
/// # Serialization
/// Fitted models are saved as CBOR artifacts, one per topic model.
pub use topic::{lda::LdaBackend, lda::LdaModel, FittedModel, TopicBackend};
