use tracing::info;

use crate::error::Result;
use crate::store::artifact::ArtifactStore;
use crate::store::{RecordStore, TopicModel};
use crate::topic::FittedModel;
use crate::vectorizer::BowCorpus;

/// Scores a fitted model on a corpus and stores the score on its record.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelEvaluator;

impl ModelEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Log perplexity of `model` over `corpus`, saved as `record.perplexity`.
    pub fn evaluate<S, M>(&self, store: &mut S, record: &mut TopicModel, model: &M, corpus: &BowCorpus) -> Result<f64>
    where
        S: RecordStore + ?Sized,
        M: FittedModel,
    {
        info!("Evaluating topic model '{}' on {} documents", record.name, corpus.len());
        let score = model.log_perplexity(corpus)?;
        record.perplexity = score;
        store.save_topic_model(record)?;
        info!("Log perplexity of '{}': {:.4}", record.name, score);
        Ok(score)
    }

    pub fn evaluate_from_artifact<S, M>(
        &self,
        store: &mut S,
        artifacts: &ArtifactStore,
        record: &mut TopicModel,
        corpus: &BowCorpus,
    ) -> Result<f64>
    where
        S: RecordStore + ?Sized,
        M: FittedModel,
    {
        let model: M = artifacts.load(record.id)?;
        self.evaluate(store, record, &model, corpus)
    }
}
