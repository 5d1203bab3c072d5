//! Topic modeling: the fitting capability and the stages built on it.

pub mod evaluate;
pub mod inference;
pub mod lda;
pub mod query;
pub mod scoring;
pub mod serde;
pub mod trainer;

use std::path::Path;

use crate::config::TrainingConfig;
use crate::error::Result;
use crate::topic::scoring::Ranked;
use crate::vectorizer::BowCorpus;

/// Something that can fit a topic model on a bag-of-words corpus.
pub trait TopicBackend {
    type Model: FittedModel;

    /// Fit `training.num_topics` topics over a vocabulary of
    /// `vocabulary_size` terms. `training` also selects single-threaded or
    /// multi-worker fitting, the sweep count and the seed.
    /// Fails with `PipelineError::Fit` on zero topics, an empty corpus or an
    /// empty vocabulary.
    fn fit(&self, corpus: &BowCorpus, vocabulary_size: usize, training: &TrainingConfig) -> Result<Self::Model>;
}

/// A fitted topic model.
pub trait FittedModel: Sized + Send + Sync {
    fn num_topics(&self) -> usize;

    fn vocabulary_size(&self) -> usize;

    /// Dirichlet prior of each topic, all non-negative.
    fn alpha(&self) -> &[f64];

    /// Term distribution of one topic, indexed by vocabulary index.
    fn topic_terms(&self, topic: usize) -> Option<&[f64]>;

    /// The `topn` most probable (term index, probability) pairs of a topic.
    /// Equal probabilities keep index order.
    fn show_topic(&self, topic: usize, topn: usize) -> Vec<(u32, f64)> {
        let Some(terms) = self.topic_terms(topic) else {
            return Vec::new();
        };
        let mut ranked = Ranked::new(
            terms
                .iter()
                .enumerate()
                .map(|(idx, &p)| (idx as u32, p))
                .collect(),
        );
        ranked.sort_by_score().top(topn);
        ranked.into_inner()
    }

    /// Topic mixture of one document as (topic index, probability) pairs.
    /// Small entries may be pruned, so the sum can be below 1.
    fn infer(&self, bow: &[(u32, u32)]) -> Vec<(usize, f64)>;

    /// Per-token log-likelihood bound over the corpus. Non-positive.
    fn log_perplexity(&self, corpus: &BowCorpus) -> Result<f64>;

    fn save(&self, path: &Path) -> Result<()>;

    fn load(path: &Path) -> Result<Self>;
}
