use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use topic_vectorizer::{
    store::memory::MemoryStore,
    topic::query::topic_summary,
    vectorizer::source::{DirectorySource, SimpleTokenizer, Tokenizer, WhitespaceTokenizer},
    Pipeline, PipelineConfig, RecordStore,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "topic-vectorizer", about = "Vocabulary, tf-idf and topic modeling over a document directory")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TokenizerKind {
    /// Lowercase, split on punctuation, drop English stopwords
    Simple,
    /// Split on whitespace only
    Whitespace,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a dictionary, vectorize, train, infer and evaluate.
    Run {
        /// Directory whose regular files are the documents
        #[arg(long)]
        input: PathBuf,
        /// Directory for fit artifacts
        #[arg(long)]
        artifacts: PathBuf,
        /// Path to config file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Name of the dictionary and topic model
        #[arg(long, default_value = "corpus")]
        name: String,
        /// Override the configured number of topics
        #[arg(long)]
        topics: Option<usize>,
        #[arg(long, value_enum, default_value_t = TokenizerKind::Simple)]
        tokenizer: TokenizerKind,
        /// Write every created record as JSON to this file
        #[arg(long)]
        dump: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            artifacts,
            config,
            name,
            topics,
            tokenizer,
            dump,
        } => cmd_run(input, artifacts, config, name, topics, tokenizer, dump)?,
    }

    Ok(())
}

fn cmd_run(
    input: PathBuf,
    artifacts: PathBuf,
    config_path: Option<PathBuf>,
    name: String,
    topics: Option<usize>,
    tokenizer: TokenizerKind,
    dump: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = match config_path {
        Some(path) => PipelineConfig::from_json_file(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    config.artifact_dir = artifacts;
    if let Some(n) = topics {
        config.training.num_topics = n;
    }

    let source = DirectorySource::open(&input)
        .with_context(|| format!("failed to list documents in {}", input.display()))?;
    let tokenizer: Box<dyn Tokenizer> = match tokenizer {
        TokenizerKind::Simple => Box::new(SimpleTokenizer::english()),
        TokenizerKind::Whitespace => Box::new(WhitespaceTokenizer),
    };

    let pipeline = Pipeline::new(config).context("invalid configuration")?;
    let mut store = MemoryStore::new();
    let report = pipeline
        .run(&mut store, &source, &*tokenizer, &name)
        .context("pipeline run failed")?;

    println!(
        "dictionary {} '{}': {} documents, {} words, {} word vectors",
        report.dictionary.id,
        report.dictionary.name,
        report.num_documents,
        report.num_words,
        report.num_document_words
    );
    println!(
        "topic model {}: {} topics, {} document topics, log perplexity {:.4}",
        report.topic_model.id,
        report.topics.len(),
        report.num_document_topics,
        report.perplexity
    );
    let document_topics = store.document_topics(report.topic_model.id)?;
    for topic in &report.topics {
        let assigned = document_topics.iter().filter(|dt| dt.topic_id == topic.id).count();
        println!("  #{:<3} {:<40} alpha={:.3} docs={}", topic.index, topic.name, topic.alpha, assigned);
        println!("       {}", topic_summary(&store, &report.topic_model, topic)?);
    }

    if let Some(path) = dump {
        let json = serde_json::to_string_pretty(&store).context("failed to encode records")?;
        fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
        println!("records written to {}", path.display());
    }

    Ok(())
}
