use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use labeller_core::{DEFAULT_FOLDS, NaiveBayesConfig, VectorizerConfig};
use labeller_pipeline::{
    ArtifactStore, DEFAULT_EVAL_TOP_N, DEFAULT_MIN_PROBABILITY, DEFAULT_TOP_N, TrainingConfig,
};

use crate::state::ensure_labeller_home;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsSection,
    pub model: ModelSection,
    pub training: TrainingSection,
    pub inference: InferenceSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    /// Labeled training CSV
    pub data: PathBuf,
    /// Directory holding model.json and vectorizer.json
    pub artifacts: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    pub alpha: f64,
    pub token_pattern: String,
    pub lowercase: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSection {
    pub top_n: usize,
    pub folds: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceSection {
    pub top_n: usize,
    /// Suggestions below this probability are not shown.
    pub min_probability: f64,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            data: PathBuf::from("data/raw/transactions.csv"),
            artifacts: PathBuf::from("artifacts"),
        }
    }
}

impl Default for ModelSection {
    fn default() -> Self {
        let vectorizer = VectorizerConfig::default();
        Self {
            alpha: NaiveBayesConfig::default().alpha,
            token_pattern: vectorizer.token_pattern,
            lowercase: vectorizer.lowercase,
        }
    }
}

impl Default for TrainingSection {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_EVAL_TOP_N,
            folds: DEFAULT_FOLDS,
        }
    }
}

impl Default for InferenceSection {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            min_probability: DEFAULT_MIN_PROBABILITY,
        }
    }
}

impl Config {
    pub fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            vectorizer: VectorizerConfig {
                token_pattern: self.model.token_pattern.clone(),
                lowercase: self.model.lowercase,
            },
            classifier: NaiveBayesConfig {
                alpha: self.model.alpha,
            },
            top_n: self.training.top_n,
            folds: self.training.folds,
        }
    }

    pub fn artifact_store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.paths.artifacts)
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_labeller_home()?.join("config.toml"))
}

/// Load `path`, or `~/.labeller/config.toml` when none is given.
/// A missing default file yields the defaults; a missing explicit file is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let p = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = config_path()?;
            if !p.exists() {
                return Ok(Config::default());
            }
            p
        }
    };
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn parse_config(s: &str) -> Result<Config> {
    Ok(toml::from_str(s)?)
}

pub fn save_config(cfg: &Config, path: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn init_config(path: Option<&Path>) -> Result<()> {
    let p = match path {
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default(), &p)?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg = parse_config("[model]\nalpha = 0.5\n\n[inference]\ntop_n = 3\n").unwrap();
        assert_eq!(cfg.model.alpha, 0.5);
        assert!(cfg.model.lowercase);
        assert_eq!(cfg.inference.top_n, 3);
        assert_eq!(cfg.inference.min_probability, 0.05);
        assert_eq!(cfg.training.folds, 5);
        assert_eq!(cfg.paths.artifacts, PathBuf::from("artifacts"));
    }

    #[test]
    fn test_training_config_mapping() {
        let mut cfg = Config::default();
        cfg.model.alpha = 0.1;
        cfg.training.top_n = 2;
        let tc = cfg.training_config();
        assert_eq!(tc.classifier.alpha, 0.1);
        assert_eq!(tc.top_n, 2);
        assert_eq!(tc.vectorizer, VectorizerConfig::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.paths.artifacts = PathBuf::from("/tmp/labeller-artifacts");
        save_config(&cfg, &path).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), cfg);
    }

    #[test]
    fn test_missing_explicit_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
