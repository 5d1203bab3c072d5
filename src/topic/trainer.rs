use tracing::info;

use crate::config::{BatchConfig, TrainingConfig};
use crate::error::Result;
use crate::store::artifact::ArtifactStore;
use crate::store::batcher::PersistenceBatcher;
use crate::store::{NewTopic, NewTopicModel, RecordStore, Topic, TopicModel, TopicWord};
use crate::topic::lda::LdaBackend;
use crate::topic::{FittedModel, TopicBackend};
use crate::vectorizer::dictionary::DictionaryHandle;
use crate::vectorizer::BowCorpus;

/// Placeholder name of a topic until its words are saved.
pub const UNNAMED_TOPIC: &str = "?";

/// Number of top words joined into a topic's name.
const NAME_WORDS: usize = 3;

/// Result of one training run.
#[derive(Debug)]
pub struct TrainedModel<M> {
    pub record: TopicModel,
    /// ordered by index
    pub topics: Vec<Topic>,
    pub model: M,
}

/// Fits a topic model and persists its topics and topic words.
pub struct TopicModelTrainer<B = LdaBackend>
where
    B: TopicBackend,
{
    backend: B,
    training: TrainingConfig,
    batch: BatchConfig,
    artifacts: ArtifactStore,
}

impl<B> TopicModelTrainer<B>
where
    B: TopicBackend,
{
    pub fn new(backend: B, training: TrainingConfig, batch: BatchConfig, artifacts: ArtifactStore) -> Self {
        Self {
            backend,
            training,
            batch,
            artifacts,
        }
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Fit `corpus` with this trainer's `TrainingConfig` and persist the result.
    ///
    /// Nothing is written when fitting fails.
    pub fn train<S>(
        &self,
        store: &mut S,
        handle: &mut DictionaryHandle,
        corpus: &BowCorpus,
        name: &str,
        description: &str,
    ) -> Result<TrainedModel<B::Model>>
    where
        S: RecordStore + ?Sized,
    {
        let dictionary_id = handle.dictionary().id;
        let cache = handle.cache(&*store)?;
        let num_topics = self.training.num_topics;

        info!("Training topic model '{}' with {} topics", name, num_topics);
        let model = self
            .backend
            .fit(corpus, cache.vocabulary.dimension(), &self.training)?;

        let record = store.create_topic_model(NewTopicModel {
            dictionary_id,
            name: name.to_string(),
            description: description.to_string(),
        })?;

        info!("Saving topics");
        let mut topics = Vec::with_capacity(num_topics);
        for index in 0..model.num_topics() {
            let alpha = model.alpha().get(index).copied().unwrap_or_default();
            let mut topic = store.create_topic(NewTopic {
                model_id: record.id,
                index: index as u32,
                alpha,
                name: UNNAMED_TOPIC.to_string(),
            })?;

            let terms = model.show_topic(index, self.training.words_to_save);
            let mut name_words: Vec<&str> = Vec::with_capacity(NAME_WORDS);
            let mut batcher =
                PersistenceBatcher::<TopicWord, S>::new(store, &self.batch, "topic words", terms.len());
            for (word_index, probability) in terms {
                batcher.item_done();
                let Some(word_id) = cache.mapper.lookup(word_index) else {
                    continue;
                };
                if name_words.len() < NAME_WORDS {
                    if let Some(text) = cache.vocabulary.token(word_index) {
                        name_words.push(text);
                    }
                }
                batcher.push(TopicWord {
                    topic_id: topic.id,
                    word_id,
                    word_index,
                    probability,
                })?;
            }
            batcher.finish()?;

            topic.name = name_words.join(", ");
            store.save_topic(&topic)?;
            topics.push(topic);
        }

        self.artifacts.save(record.id, &model)?;
        info!("Saved topic model '{}' ({} topics)", record.name, topics.len());

        Ok(TrainedModel { record, topics, model })
    }
}
