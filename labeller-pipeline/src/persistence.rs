//! Artifact store for the fitted (vectorizer, classifier) pair.
//!
//! Layout: `<dir>/model.json` and `<dir>/vectorizer.json`. Both files carry
//! the same `pair_id`, written fresh by every save; `load` refuses a model
//! and vectorizer from different saves. There is no format versioning; a
//! file written by a different build may fail to load as corrupt.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::NamedTempFile;

use labeller_core::{CountVectorizer, Error as ModelError, MultinomialNb, Tokenizer};

use crate::error::{Error, Result};

pub const MODEL_FILE: &str = "model.json";
pub const VECTORIZER_FILE: &str = "vectorizer.json";

/// Where a save put the two artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub vectorizer: PathBuf,
}

#[derive(Serialize)]
struct ArtifactOut<'a, T> {
    pair_id: &'a str,
    artifact: &'a T,
}

#[derive(Deserialize)]
struct ArtifactIn<T> {
    pair_id: String,
    artifact: T,
}

static SAVES: AtomicU64 = AtomicU64::new(0);

fn new_pair_id() -> String {
    format!(
        "{}-{}-{}",
        Utc::now().format("%Y%m%dT%H%M%S%.9fZ"),
        std::process::id(),
        SAVES.fetch_add(1, Ordering::Relaxed)
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
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

    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            model: self.dir.join(MODEL_FILE),
            vectorizer: self.dir.join(VECTORIZER_FILE),
        }
    }

    /// True when both artifact files are present.
    pub fn exists(&self) -> bool {
        let paths = self.paths();
        paths.model.is_file() && paths.vectorizer.is_file()
    }

    /// Persist both components. Both are serialized before anything touches
    /// disk, and each file is renamed into place from a temp file. If only
    /// one rename lands, the pair ids differ and `load` rejects the pair.
    pub fn save(&self, vectorizer: &CountVectorizer, classifier: &MultinomialNb) -> Result<ArtifactPaths> {
        let vocabulary_size = vectorizer.vocabulary_size()?;
        let n_features = classifier.n_features()?;
        if vocabulary_size != n_features {
            return Err(ModelError::DimensionMismatch {
                expected: vocabulary_size,
                actual: n_features,
            }
            .into());
        }

        let pair_id = new_pair_id();
        let model_bytes = serde_json::to_vec(&ArtifactOut {
            pair_id: &pair_id,
            artifact: classifier,
        })?;
        let vectorizer_bytes = serde_json::to_vec(&ArtifactOut {
            pair_id: &pair_id,
            artifact: vectorizer,
        })?;

        fs::create_dir_all(&self.dir)?;
        let model_tmp = write_temp(&self.dir, &model_bytes)?;
        let vectorizer_tmp = write_temp(&self.dir, &vectorizer_bytes)?;

        let paths = self.paths();
        model_tmp.persist(&paths.model).map_err(|e| e.error)?;
        vectorizer_tmp.persist(&paths.vectorizer).map_err(|e| e.error)?;

        tracing::info!(dir = %self.dir.display(), pair_id = %pair_id, "saved model artifacts");
        Ok(paths)
    }

    /// Load both components, checking that they belong together.
    pub fn load(&self) -> Result<(CountVectorizer, MultinomialNb)> {
        let paths = self.paths();
        for path in [&paths.model, &paths.vectorizer] {
            if !path.is_file() {
                return Err(Error::ArtifactNotFound(path.clone()));
            }
        }

        let model: ArtifactIn<MultinomialNb> = read_json(&paths.model)?;
        let stored: ArtifactIn<CountVectorizer> = read_json(&paths.vectorizer)?;
        if model.pair_id != stored.pair_id {
            return Err(corrupt(
                &paths.vectorizer,
                format!(
                    "vectorizer is from save {}, model is from save {}",
                    stored.pair_id, model.pair_id
                ),
            ));
        }
        let classifier = model.artifact;
        let vectorizer = stored.artifact;

        if !classifier.is_well_formed() {
            return Err(corrupt(&paths.model, "inconsistent classifier tables"));
        }
        Tokenizer::new(vectorizer.config())
            .map_err(|e| corrupt(&paths.vectorizer, e.to_string()))?;
        let vocabulary = vectorizer
            .vocabulary()
            .map_err(|_| corrupt(&paths.vectorizer, "vectorizer has no vocabulary"))?;
        if !vocabulary.is_well_formed() {
            return Err(corrupt(&paths.vectorizer, "vocabulary is not sorted and unique"));
        }
        let n_features = classifier.n_features()?;
        if n_features != vocabulary.len() {
            return Err(corrupt(
                &paths.model,
                format!(
                    "classifier expects {n_features} features, vocabulary has {}",
                    vocabulary.len()
                ),
            ));
        }

        tracing::info!(
            dir = %self.dir.display(),
            classes = classifier.classes()?.len(),
            vocabulary = vocabulary.len(),
            "loaded model artifacts"
        );
        Ok((vectorizer, classifier))
    }
}

fn write_temp(dir: &Path, bytes: &[u8]) -> Result<NamedTempFile> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| corrupt(path, e.to_string()))
}

fn corrupt(path: &Path, reason: impl Into<String>) -> Error {
    Error::CorruptArtifact {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}
