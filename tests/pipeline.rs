use std::fs;

use topic_vectorizer::config::{BatchConfig, PipelineConfig};
use topic_vectorizer::store::artifact::ArtifactStore;
use topic_vectorizer::store::memory::MemoryStore;
use topic_vectorizer::topic::inference::TopicInferenceEngine;
use topic_vectorizer::topic::query::{probable_topic, topic_examples};
use topic_vectorizer::vectorizer::source::{DirectorySource, DocumentSource, SimpleTokenizer, Tokenizer, VecSource};
use topic_vectorizer::{BowCorpus, DictionaryHandle, FittedModel, LdaModel, Pipeline, RecordStore};

const WEATHER: [&str; 5] = [
    "The storm brought heavy rain and strong wind to the coast",
    "Flood warnings after rain and wind overnight",
    "Wind and rain expected as the storm moves inland",
    "Heavy rain causes flood on the coast road",
    "Storm wind knocks out power, more rain tomorrow",
];

const SPORT: [&str; 5] = [
    "The team scored a late goal to win the match",
    "Match report: goal in the first half, team holds on",
    "Coach praises team after goal fest in the match",
    "Late goal decides the match for the home team",
    "Team captain scores twice, match ends with a goal rush",
];

fn config(dir: &std::path::Path) -> PipelineConfig {
    let json = r#"{
        "batch": { "batch_size": 7, "progress_every": 3 },
        "vocabulary": { "minimum_frequency": 2, "maximum_fraction": 0.9 },
        "training": { "num_topics": 2, "words_to_save": 6, "multicore": true, "workers": 2, "iterations": 60 }
    }"#;
    let path = dir.join("config.json");
    fs::write(&path, json).unwrap();
    let mut config = PipelineConfig::from_json_file(&path).unwrap();
    config.artifact_dir = dir.join("artifacts");
    config
}

#[test]
fn full_run_over_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let docs = dir.path().join("docs");
    fs::create_dir(&docs).unwrap();
    for (i, text) in WEATHER.iter().chain(SPORT.iter()).enumerate() {
        fs::write(docs.join(format!("{i:02}.txt")), text).unwrap();
    }

    let config = config(dir.path());
    let pipeline = Pipeline::new(config.clone()).unwrap();
    let source = DirectorySource::open(&docs).unwrap();
    let mut store = MemoryStore::new();
    let report = pipeline
        .run(&mut store, &source, &SimpleTokenizer::english(), "news")
        .unwrap();

    assert_eq!(report.num_documents, 10);
    assert_eq!(report.dictionary.num_docs, 10);
    assert!(report.num_words > 0);
    assert_eq!(store.words(report.dictionary.id).unwrap().len(), report.num_words);
    assert_eq!(
        store.document_words(report.dictionary.id).unwrap().len(),
        report.num_document_words
    );
    assert_eq!(report.topics.len(), 2);
    assert!(report.topics.iter().all(|t| t.name != "?"));
    assert!(report.perplexity < 0.0);

    let saved = store.topic_model(report.topic_model.id).unwrap().unwrap();
    assert_eq!(saved.perplexity, report.perplexity);

    // the artifact is keyed by the model id and reproduces inference
    let artifacts = ArtifactStore::new(&config.artifact_dir);
    assert!(artifacts.exists(report.topic_model.id));
    let model: LdaModel = artifacts.load(report.topic_model.id).unwrap();
    assert_eq!(model.num_topics(), 2);

    let first = store.document_topics(report.topic_model.id).unwrap();
    assert_eq!(first.len(), report.num_document_topics);
    let removed = store.clear_document_topics(report.topic_model.id).unwrap();
    assert_eq!(removed, first.len());

    let source_again = VecSource::from_texts(WEATHER.iter().chain(SPORT.iter()).copied());
    let mut handle = DictionaryHandle::new(report.dictionary.clone());
    let cache = handle.cache(&store).unwrap();
    let tokenizer = SimpleTokenizer::english();
    let corpus: BowCorpus = source_again
        .documents()
        .map(|doc| {
            let doc = doc.unwrap();
            (doc.id, cache.vocabulary.doc2bow(&tokenizer.tokenize(&doc.text)))
        })
        .collect();
    TopicInferenceEngine::new(BatchConfig::default())
        .apply_from_artifact::<_, LdaModel>(&mut store, &artifacts, &report.topic_model, &corpus)
        .unwrap();
    assert_eq!(first, store.document_topics(report.topic_model.id).unwrap());

    for doc in 1..=10u64 {
        let topic = probable_topic(&store, &report.topic_model, doc).unwrap();
        if let Some(topic) = topic {
            let examples = topic_examples(&store, &topic).unwrap();
            assert!(examples.iter().any(|dt| dt.document_id == doc));
            assert!(examples.windows(2).all(|w| w[0].probability >= w[1].probability));
        }
    }
}
