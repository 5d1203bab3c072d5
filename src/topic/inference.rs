use std::collections::HashMap;

use tracing::info;

use crate::config::BatchConfig;
use crate::error::Result;
use crate::store::artifact::ArtifactStore;
use crate::store::batcher::{BatchStats, PersistenceBatcher};
use crate::store::{DocumentTopic, RecordStore, TopicId, TopicModel};
use crate::topic::FittedModel;
use crate::vectorizer::BowCorpus;

/// Writes the topic mixture of every document as `DocumentTopic` rows.
#[derive(Debug, Clone, Default)]
pub struct TopicInferenceEngine {
    batch: BatchConfig,
}

impl TopicInferenceEngine {
    pub fn new(batch: BatchConfig) -> Self {
        Self { batch }
    }

    /// Infer with an in-memory model. Mixture entry `k` goes to the stored
    /// topic whose `index` is `k`; entries without such a topic are skipped.
    pub fn apply<S, M>(&self, store: &mut S, record: &TopicModel, model: &M, corpus: &BowCorpus) -> Result<BatchStats>
    where
        S: RecordStore + ?Sized,
        M: FittedModel,
    {
        info!("Saving topic mixtures for {} documents", corpus.len());
        let topic_ids: HashMap<u32, TopicId> = store
            .topics(record.id)?
            .into_iter()
            .map(|topic| (topic.index, topic.id))
            .collect();
        let mut batcher =
            PersistenceBatcher::<DocumentTopic, S>::new(store, &self.batch, "document topics", corpus.len());
        for (document_id, bow) in corpus.iter() {
            for (index, probability) in model.infer(bow) {
                let Some(&topic_id) = u32::try_from(index).ok().and_then(|i| topic_ids.get(&i)) else {
                    continue;
                };
                batcher.push(DocumentTopic {
                    model_id: record.id,
                    topic_id,
                    document_id,
                    probability,
                })?;
            }
            batcher.item_done();
        }
        let stats = batcher.finish()?;
        info!("Created {} document topic entries", stats.records);
        Ok(stats)
    }

    /// Reload the model from its artifact, then `apply`.
    pub fn apply_from_artifact<S, M>(
        &self,
        store: &mut S,
        artifacts: &ArtifactStore,
        record: &TopicModel,
        corpus: &BowCorpus,
    ) -> Result<BatchStats>
    where
        S: RecordStore + ?Sized,
        M: FittedModel,
    {
        let model: M = artifacts.load(record.id)?;
        self.apply(store, record, &model, corpus)
    }
}
