use serde::{ser::SerializeStruct, Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::topic::lda::LdaModel;

/// Deserialized form of an `LdaModel` artifact.
/// Use `into_model` to check its shapes and turn it into a model.
#[derive(Debug, Deserialize)]
pub struct LdaData {
    pub num_topics: usize,
    pub vocabulary_size: usize,
    pub alpha: Vec<f64>,
    pub eta: f64,
    /// one row of `vocabulary_size` term probabilities per topic
    pub topic_word: Vec<Vec<f64>>,
    pub minimum_probability: f64,
    pub inference_iterations: usize,
}

impl LdaData {
    pub fn into_model(self) -> Result<LdaModel> {
        if self.num_topics == 0 || self.vocabulary_size == 0 {
            return Err(PipelineError::Artifact("artifact describes an empty model".into()));
        }
        if self.alpha.len() != self.num_topics || self.topic_word.len() != self.num_topics {
            return Err(PipelineError::Artifact(format!(
                "expected {} topics, found {} alphas and {} term rows",
                self.num_topics,
                self.alpha.len(),
                self.topic_word.len()
            )));
        }
        if let Some(row) = self.topic_word.iter().find(|row| row.len() != self.vocabulary_size) {
            return Err(PipelineError::Artifact(format!(
                "term row of length {} in a vocabulary of {}",
                row.len(),
                self.vocabulary_size
            )));
        }
        Ok(LdaModel {
            num_topics: self.num_topics,
            vocabulary_size: self.vocabulary_size,
            alpha: self.alpha,
            eta: self.eta,
            topic_word: self.topic_word,
            minimum_probability: self.minimum_probability,
            inference_iterations: self.inference_iterations,
        })
    }
}

impl Serialize for LdaModel {
    /// Field layout matches `LdaData`.
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("LdaModel", 7)?;
        state.serialize_field("num_topics", &self.num_topics)?;
        state.serialize_field("vocabulary_size", &self.vocabulary_size)?;
        state.serialize_field("alpha", &self.alpha)?;
        state.serialize_field("eta", &self.eta)?;
        state.serialize_field("topic_word", &self.topic_word)?;
        state.serialize_field("minimum_probability", &self.minimum_probability)?;
        state.serialize_field("inference_iterations", &self.inference_iterations)?;
        state.end()
    }
}
