use serde::Serialize;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::store::artifact::ArtifactStore;
use crate::store::{Dictionary, RecordStore, Topic, TopicModel};
use crate::topic::evaluate::ModelEvaluator;
use crate::topic::inference::TopicInferenceEngine;
use crate::topic::lda::LdaBackend;
use crate::topic::trainer::TopicModelTrainer;
use crate::topic::TopicBackend;
use crate::vectorizer::dictionary::VocabularyBuilder;
use crate::vectorizer::source::{DocumentSource, Tokenizer};
use crate::vectorizer::tfidf::DefaultWeightEngine;
use crate::vectorizer::CorpusVectorizer;

/// What a pipeline run created.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub dictionary: Dictionary,
    pub topic_model: TopicModel,
    pub topics: Vec<Topic>,
    pub num_documents: usize,
    pub num_words: usize,
    pub num_document_words: usize,
    pub num_document_topics: usize,
    /// log perplexity over the training corpus
    pub perplexity: f64,
}

/// Runs every stage in order over one document source: vocabulary,
/// vectorization, training, inference and evaluation.
#[derive(Debug, Clone)]
pub struct Pipeline<B = LdaBackend>
where
    B: TopicBackend + Clone,
{
    config: PipelineConfig,
    backend: B,
}

impl Pipeline<LdaBackend> {
    /// Pipeline with the default LDA backend configured from `config`.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let backend = LdaBackend::new(config.inference.clone());
        Self::with_backend(config, backend)
    }
}

impl<B> Pipeline<B>
where
    B: TopicBackend + Clone,
{
    pub fn with_backend(config: PipelineConfig, backend: B) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, backend })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn artifacts(&self) -> ArtifactStore {
        ArtifactStore::new(&self.config.artifact_dir)
    }

    pub fn run<S>(
        &self,
        store: &mut S,
        source: &dyn DocumentSource,
        tokenizer: &dyn Tokenizer,
        name: &str,
    ) -> Result<PipelineReport>
    where
        S: RecordStore + ?Sized,
    {
        let config = &self.config;
        info!("Running pipeline '{}' over {} documents", name, source.count());

        let mut handle = VocabularyBuilder::new(config.vocabulary.clone(), config.batch.clone()).build_from_source(
            store,
            name,
            None,
            &config.dictionary_settings,
            source,
            tokenizer,
        )?;
        let num_words = handle.cache(&*store)?.vocabulary.len();

        let (corpus, vectorized) = CorpusVectorizer::<DefaultWeightEngine>::new(config.batch.clone())
            .vectorize_with_stats(store, &mut handle, source, tokenizer)?;

        let trainer = TopicModelTrainer::new(
            self.backend.clone(),
            config.training.clone(),
            config.batch.clone(),
            self.artifacts(),
        );
        let mut trained = trainer.train(store, &mut handle, &corpus, name, "")?;

        let inferred = TopicInferenceEngine::new(config.batch.clone()).apply(
            store,
            &trained.record,
            &trained.model,
            &corpus,
        )?;

        let perplexity = ModelEvaluator::new().evaluate(store, &mut trained.record, &trained.model, &corpus)?;

        info!("Pipeline '{}' finished", name);
        Ok(PipelineReport {
            dictionary: handle.into_dictionary(),
            topic_model: trained.record,
            topics: trained.topics,
            num_documents: corpus.len(),
            num_words,
            num_document_words: vectorized.records,
            num_document_topics: inferred.records,
            perplexity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let mut config = PipelineConfig::default();
        config.training.num_topics = 0;
        assert!(matches!(Pipeline::new(config), Err(PipelineError::Config(_))));
    }
}
