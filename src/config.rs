//! Pipeline configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Buffered bulk-write settings shared by every stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of buffered records that triggers one bulk write.
    pub batch_size: usize,
    /// Emit a progress event every this many processed input items.
    pub progress_every: usize,
    /// Release the sink's diagnostic log after each bulk write.
    pub reset_diagnostics: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            progress_every: 10_000,
            reset_diagnostics: cfg!(debug_assertions),
        }
    }
}

/// Vocabulary filtering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    /// Drop terms seen in fewer documents than this.
    pub minimum_frequency: u64,
    /// Drop terms seen in more than this fraction of documents.
    /// `1.0` disables the cap.
    pub maximum_fraction: f64,
    /// Keep only the `n` most frequent terms after filtering.
    pub keep_n: Option<usize>,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            minimum_frequency: 2,
            maximum_fraction: 1.0,
            keep_n: None,
        }
    }
}

/// Topic model fitting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub num_topics: usize,
    /// Top terms persisted per topic.
    pub words_to_save: usize,
    /// Fit with several workers instead of a single thread.
    pub multicore: bool,
    pub workers: usize,
    /// Gibbs sweeps over the corpus.
    pub iterations: usize,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            num_topics: 30,
            words_to_save: 200,
            multicore: true,
            workers: 3,
            iterations: 200,
            seed: 42,
        }
    }
}

/// Topic mixture settings used at inference and scoring time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Mixture entries below this are pruned.
    pub minimum_probability: f64,
    /// Fold-in iterations per document.
    pub iterations: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            minimum_probability: 0.01,
            iterations: 50,
        }
    }
}

/// Configuration for a full pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub batch: BatchConfig,
    pub vocabulary: VocabularyConfig,
    pub training: TrainingConfig,
    pub inference: InferenceConfig,
    /// Directory holding `model-<id>` fit artifacts.
    pub artifact_dir: PathBuf,
    /// Opaque settings blob stored on the dictionary.
    pub dictionary_settings: String,
}

impl PipelineConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch.batch_size == 0 {
            return Err(PipelineError::Config("batch_size must be at least 1".into()));
        }
        if self.batch.progress_every == 0 {
            return Err(PipelineError::Config("progress_every must be at least 1".into()));
        }
        let fraction = self.vocabulary.maximum_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(PipelineError::Config(format!(
                "maximum_fraction must be in (0, 1], got {fraction}"
            )));
        }
        if self.training.num_topics == 0 {
            return Err(PipelineError::Config("num_topics must be at least 1".into()));
        }
        if self.training.multicore && self.training.workers == 0 {
            return Err(PipelineError::Config("multicore fitting needs at least 1 worker".into()));
        }
        if !(0.0..1.0).contains(&self.inference.minimum_probability) {
            return Err(PipelineError::Config(format!(
                "minimum_probability must be in [0, 1), got {}",
                self.inference.minimum_probability
            )));
        }
        Ok(())
    }
}
