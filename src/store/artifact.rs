use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{PipelineError, Result};
use crate::store::TopicModelId;
use crate::topic::FittedModel;

/// Extension of fit artifact files.
pub const ARTIFACT_EXTENSION: &str = "lda";

/// Fit artifacts on disk, one file per topic model, addressed by the model id.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `model-<id>`
    pub fn key(model_id: TopicModelId) -> String {
        format!("model-{model_id}")
    }

    pub fn path(&self, model_id: TopicModelId) -> PathBuf {
        self.dir
            .join(format!("{}.{}", Self::key(model_id), ARTIFACT_EXTENSION))
    }

    pub fn exists(&self, model_id: TopicModelId) -> bool {
        self.path(model_id).is_file()
    }

    pub fn save<M: FittedModel>(&self, model_id: TopicModelId, model: &M) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(model_id);
        model.save(&path)?;
        info!("Saved fit artifact {} to {}", Self::key(model_id), path.display());
        Ok(path)
    }

    pub fn load<M: FittedModel>(&self, model_id: TopicModelId) -> Result<M> {
        let path = self.path(model_id);
        if !path.is_file() {
            return Err(PipelineError::Artifact(format!(
                "no artifact {} at {}",
                Self::key(model_id),
                path.display()
            )));
        }
        info!("Loading fit artifact {}", Self::key(model_id));
        M::load(&path)
    }
}
