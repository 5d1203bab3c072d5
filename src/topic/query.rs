//! Read-side helpers over inference output.

use std::collections::HashMap;

use crate::error::Result;
use crate::store::{DocumentId, DocumentTopic, RecordStore, Topic, TopicModel};
use crate::topic::scoring::Ranked;

/// The topic with the highest mixture weight for a document under a model,
/// `None` if inference wrote nothing for it. The first row wins ties.
pub fn probable_topic<S>(store: &S, model: &TopicModel, document_id: DocumentId) -> Result<Option<Topic>>
where
    S: RecordStore + ?Sized,
{
    let best = store
        .document_topics(model.id)?
        .into_iter()
        .filter(|dt| dt.document_id == document_id)
        .fold(None::<DocumentTopic>, |best, dt| match best {
            Some(b) if b.probability >= dt.probability => Some(b),
            _ => Some(dt),
        });
    let Some(best) = best else {
        return Ok(None);
    };
    Ok(store
        .topics(model.id)?
        .into_iter()
        .find(|t| t.id == best.topic_id))
}

/// Documents assigned to a topic, most representative first.
pub fn topic_examples<S>(store: &S, topic: &Topic) -> Result<Vec<DocumentTopic>>
where
    S: RecordStore + ?Sized,
{
    let mut rows: Vec<DocumentTopic> = store
        .document_topics(topic.model_id)?
        .into_iter()
        .filter(|dt| dt.topic_id == topic.id)
        .collect();
    rows.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    Ok(rows)
}

/// Saved words of a topic with their probabilities, most probable first.
/// Display renders it as `0.120*"storm" + 0.080*"rain"`.
pub fn topic_summary<S>(store: &S, model: &TopicModel, topic: &Topic) -> Result<Ranked<String>>
where
    S: RecordStore + ?Sized,
{
    let mut texts: HashMap<_, _> = store
        .words(model.dictionary_id)?
        .into_iter()
        .map(|word| (word.id, word.text))
        .collect();
    let mut ranked = Ranked::new(
        store
            .topic_words(topic.id)?
            .into_iter()
            .filter_map(|tw| texts.remove(&tw.word_id).map(|text| (text, tw.probability)))
            .collect(),
    );
    ranked.sort_by_score();
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::{BulkSink, NewDictionary, NewTopic, NewTopicModel, NewWord, TopicWord};

    fn fixture() -> (MemoryStore, TopicModel, Vec<Topic>) {
        let mut store = MemoryStore::new();
        let dictionary = store
            .create_dictionary(NewDictionary {
                name: "d".into(),
                dataset: None,
                settings: String::new(),
            })
            .unwrap();
        let model = store
            .create_topic_model(NewTopicModel {
                dictionary_id: dictionary.id,
                name: "m".into(),
                description: String::new(),
            })
            .unwrap();
        let topics: Vec<Topic> = (0..2)
            .map(|index| {
                store
                    .create_topic(NewTopic {
                        model_id: model.id,
                        index,
                        alpha: 0.5,
                        name: format!("t{index}"),
                    })
                    .unwrap()
            })
            .collect();
        let rows: Vec<DocumentTopic> = [(10, 0, 0.2), (10, 1, 0.7), (11, 0, 0.9), (12, 0, 0.4)]
            .into_iter()
            .map(|(document_id, t, probability)| DocumentTopic {
                model_id: model.id,
                topic_id: topics[t].id,
                document_id,
                probability,
            })
            .collect();
        store.bulk_insert(rows).unwrap();
        (store, model, topics)
    }

    #[test]
    fn probable_topic_picks_the_heaviest_entry() {
        let (store, model, topics) = fixture();
        assert_eq!(probable_topic(&store, &model, 10).unwrap(), Some(topics[1].clone()));
        assert_eq!(probable_topic(&store, &model, 11).unwrap(), Some(topics[0].clone()));
        assert_eq!(probable_topic(&store, &model, 99).unwrap(), None);
    }

    #[test]
    fn examples_are_ordered_by_probability() {
        let (store, _, topics) = fixture();
        let docs: Vec<DocumentId> = topic_examples(&store, &topics[0])
            .unwrap()
            .into_iter()
            .map(|dt| dt.document_id)
            .collect();
        assert_eq!(docs, vec![11, 12, 10]);
        assert_eq!(topic_examples(&store, &topics[1]).unwrap().len(), 1);
    }

    #[test]
    fn summary_lists_saved_words_by_probability() {
        let (mut store, model, topics) = fixture();
        let words: Vec<NewWord> = ["storm", "rain", "goal"]
            .into_iter()
            .enumerate()
            .map(|(index, text)| NewWord {
                dictionary_id: model.dictionary_id,
                index: index as u32,
                text: text.into(),
                document_frequency: 1,
            })
            .collect();
        store.bulk_insert(words).unwrap();
        let saved = store.words(model.dictionary_id).unwrap();
        let rows: Vec<TopicWord> = [(2, 0.05), (1, 0.08), (0, 0.12)]
            .into_iter()
            .map(|(i, probability)| TopicWord {
                topic_id: topics[0].id,
                word_id: saved[i].id,
                word_index: saved[i].index,
                probability,
            })
            .collect();
        store.bulk_insert(rows).unwrap();

        let summary = topic_summary(&store, &model, &topics[0]).unwrap();
        assert_eq!(summary.to_string(), "0.120*\"storm\" + 0.080*\"rain\" + 0.050*\"goal\"");
        assert!(topic_summary(&store, &model, &topics[1]).unwrap().is_empty());
    }
}
