use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::store::{
    BulkSink, Dictionary, DictionaryId, DocumentTopic, DocumentWord, NewDictionary, NewTopic,
    NewTopicModel, NewWord, RecordStore, Topic, TopicId, TopicModel, TopicModelId, TopicWord, Word,
};

/// In-process record store.
///
/// Identities come from one shared counter starting at 1. When query logging
/// is on, every operation appends a line to `query_log`, which
/// `release_diagnostics` empties.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    pub dictionaries: Vec<Dictionary>,
    pub words: Vec<Word>,
    pub topic_models: Vec<TopicModel>,
    pub topics: Vec<Topic>,
    pub topic_words: Vec<TopicWord>,
    pub document_words: Vec<DocumentWord>,
    pub document_topics: Vec<DocumentTopic>,
    next_id: u64,
    #[serde(skip)]
    log_queries: bool,
    #[serde(skip)]
    query_log: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every operation in the query log.
    pub fn with_query_log(mut self) -> Self {
        self.log_queries = true;
        self
    }

    pub fn query_log(&self) -> &[String] {
        &self.query_log
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn log(&mut self, entry: impl FnOnce() -> String) {
        if self.log_queries {
            self.query_log.push(entry());
        }
    }

    fn has_dictionary(&self, id: DictionaryId) -> bool {
        self.dictionaries.iter().any(|d| d.id == id)
    }

    fn has_topic_model(&self, id: TopicModelId) -> bool {
        self.topic_models.iter().any(|m| m.id == id)
    }

    fn has_topic(&self, id: TopicId) -> bool {
        self.topics.iter().any(|t| t.id == id)
    }
}

impl BulkSink<NewWord> for MemoryStore {
    fn bulk_insert(&mut self, records: Vec<NewWord>) -> Result<()> {
        self.log(|| format!("INSERT word x{}", records.len()));
        if let Some(bad) = records.iter().find(|w| !self.has_dictionary(w.dictionary_id)) {
            return Err(PipelineError::Store(format!(
                "word '{}' references unknown dictionary {}",
                bad.text, bad.dictionary_id
            )));
        }
        for new in records {
            let id = self.next_id();
            self.words.push(Word {
                id,
                dictionary_id: new.dictionary_id,
                index: new.index,
                text: new.text,
                document_frequency: new.document_frequency,
            });
        }
        Ok(())
    }

    fn release_diagnostics(&mut self) {
        self.query_log.clear();
    }
}

impl BulkSink<TopicWord> for MemoryStore {
    fn bulk_insert(&mut self, records: Vec<TopicWord>) -> Result<()> {
        self.log(|| format!("INSERT topic_word x{}", records.len()));
        if let Some(bad) = records.iter().find(|r| !self.has_topic(r.topic_id)) {
            return Err(PipelineError::Store(format!("unknown topic {}", bad.topic_id)));
        }
        self.topic_words.extend(records);
        Ok(())
    }

    fn release_diagnostics(&mut self) {
        self.query_log.clear();
    }
}

impl BulkSink<DocumentWord> for MemoryStore {
    fn bulk_insert(&mut self, records: Vec<DocumentWord>) -> Result<()> {
        self.log(|| format!("INSERT document_word x{}", records.len()));
        if let Some(bad) = records.iter().find(|r| !self.has_dictionary(r.dictionary_id)) {
            return Err(PipelineError::Store(format!(
                "unknown dictionary {}",
                bad.dictionary_id
            )));
        }
        self.document_words.extend(records);
        Ok(())
    }

    fn release_diagnostics(&mut self) {
        self.query_log.clear();
    }
}

impl BulkSink<DocumentTopic> for MemoryStore {
    fn bulk_insert(&mut self, records: Vec<DocumentTopic>) -> Result<()> {
        self.log(|| format!("INSERT document_topic x{}", records.len()));
        if let Some(bad) = records.iter().find(|r| !self.has_topic_model(r.model_id)) {
            return Err(PipelineError::Store(format!("unknown topic model {}", bad.model_id)));
        }
        self.document_topics.extend(records);
        Ok(())
    }

    fn release_diagnostics(&mut self) {
        self.query_log.clear();
    }
}

impl RecordStore for MemoryStore {
    fn create_dictionary(&mut self, new: NewDictionary) -> Result<Dictionary> {
        self.log(|| format!("INSERT dictionary '{}'", new.name));
        let dictionary = Dictionary {
            id: self.next_id(),
            name: new.name,
            dataset: new.dataset,
            settings: new.settings,
            created_at: Utc::now(),
            num_docs: 0,
            num_pos: 0,
            num_nnz: 0,
        };
        self.dictionaries.push(dictionary.clone());
        Ok(dictionary)
    }

    fn save_dictionary(&mut self, dictionary: &Dictionary) -> Result<()> {
        self.log(|| format!("UPDATE dictionary {}", dictionary.id));
        let slot = self
            .dictionaries
            .iter_mut()
            .find(|d| d.id == dictionary.id)
            .ok_or_else(|| PipelineError::Store(format!("unknown dictionary {}", dictionary.id)))?;
        *slot = dictionary.clone();
        Ok(())
    }

    fn dictionary(&self, id: DictionaryId) -> Result<Option<Dictionary>> {
        Ok(self.dictionaries.iter().find(|d| d.id == id).cloned())
    }

    fn words(&self, dictionary_id: DictionaryId) -> Result<Vec<Word>> {
        Ok(self
            .words
            .iter()
            .filter(|w| w.dictionary_id == dictionary_id)
            .cloned()
            .collect())
    }

    fn create_topic_model(&mut self, new: NewTopicModel) -> Result<TopicModel> {
        self.log(|| format!("INSERT topic_model '{}'", new.name));
        if !self.has_dictionary(new.dictionary_id) {
            return Err(PipelineError::Store(format!(
                "unknown dictionary {}",
                new.dictionary_id
            )));
        }
        let model = TopicModel {
            id: self.next_id(),
            dictionary_id: new.dictionary_id,
            name: new.name,
            description: new.description,
            created_at: Utc::now(),
            perplexity: 0.0,
        };
        self.topic_models.push(model.clone());
        Ok(model)
    }

    fn save_topic_model(&mut self, model: &TopicModel) -> Result<()> {
        self.log(|| format!("UPDATE topic_model {}", model.id));
        let slot = self
            .topic_models
            .iter_mut()
            .find(|m| m.id == model.id)
            .ok_or_else(|| PipelineError::Store(format!("unknown topic model {}", model.id)))?;
        *slot = model.clone();
        Ok(())
    }

    fn topic_model(&self, id: TopicModelId) -> Result<Option<TopicModel>> {
        Ok(self.topic_models.iter().find(|m| m.id == id).cloned())
    }

    fn create_topic(&mut self, new: NewTopic) -> Result<Topic> {
        self.log(|| format!("INSERT topic {} of model {}", new.index, new.model_id));
        if !self.has_topic_model(new.model_id) {
            return Err(PipelineError::Store(format!("unknown topic model {}", new.model_id)));
        }
        let topic = Topic {
            id: self.next_id(),
            model_id: new.model_id,
            index: new.index,
            alpha: new.alpha,
            name: new.name,
            description: String::new(),
        };
        self.topics.push(topic.clone());
        Ok(topic)
    }

    fn save_topic(&mut self, topic: &Topic) -> Result<()> {
        self.log(|| format!("UPDATE topic {}", topic.id));
        let slot = self
            .topics
            .iter_mut()
            .find(|t| t.id == topic.id)
            .ok_or_else(|| PipelineError::Store(format!("unknown topic {}", topic.id)))?;
        *slot = topic.clone();
        Ok(())
    }

    fn topics(&self, model_id: TopicModelId) -> Result<Vec<Topic>> {
        let mut topics: Vec<Topic> = self
            .topics
            .iter()
            .filter(|t| t.model_id == model_id)
            .cloned()
            .collect();
        topics.sort_by_key(|t| t.index);
        Ok(topics)
    }

    fn topic_words(&self, topic_id: TopicId) -> Result<Vec<TopicWord>> {
        Ok(self
            .topic_words
            .iter()
            .filter(|tw| tw.topic_id == topic_id)
            .cloned()
            .collect())
    }

    fn document_words(&self, dictionary_id: DictionaryId) -> Result<Vec<DocumentWord>> {
        Ok(self
            .document_words
            .iter()
            .filter(|dw| dw.dictionary_id == dictionary_id)
            .cloned()
            .collect())
    }

    fn document_topics(&self, model_id: TopicModelId) -> Result<Vec<DocumentTopic>> {
        Ok(self
            .document_topics
            .iter()
            .filter(|dt| dt.model_id == model_id)
            .cloned()
            .collect())
    }

    fn clear_document_words(&mut self, dictionary_id: DictionaryId) -> Result<usize> {
        self.log(|| format!("DELETE document_word of dictionary {dictionary_id}"));
        let before = self.document_words.len();
        self.document_words.retain(|dw| dw.dictionary_id != dictionary_id);
        Ok(before - self.document_words.len())
    }

    fn clear_document_topics(&mut self, model_id: TopicModelId) -> Result<usize> {
        self.log(|| format!("DELETE document_topic of model {model_id}"));
        let before = self.document_topics.len();
        self.document_topics.retain(|dt| dt.model_id != model_id);
        Ok(before - self.document_topics.len())
    }
}
