use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{ArtifactError, RandomForest, StandardScaler};

const ENABLE_LOGS: bool = true;

use crate::log_info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            model: PathBuf::from("outputs/models/FD004_RandomForest.json"),
            scaler: PathBuf::from("outputs/models/FD004_scaler.json"),
        }
    }
}

/// The fitted scaler and classifier pair.
///
/// Load once at startup and hand out `&ModelArtifacts`; nothing mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifacts {
    pub scaler: StandardScaler,
    pub classifier: RandomForest,
}

impl ModelArtifacts {
    pub fn new(scaler: StandardScaler, classifier: RandomForest) -> Result<Self, ArtifactError> {
        scaler.validate()?;
        classifier.validate()?;
        Ok(Self { scaler, classifier })
    }

    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        let scaler: StandardScaler = read_json(&paths.scaler)?;
        let classifier: RandomForest = read_json(&paths.model)?;
        let artifacts = Self::new(scaler, classifier)?;

        log_info!(
            "Loaded model artifacts: scaler ({} features) from {}, forest ({} trees, {} features) from {}",
            artifacts.scaler.mean.len(),
            paths.scaler.display(),
            artifacts.classifier.trees.len(),
            artifacts.classifier.n_features,
            paths.model.display()
        );
        Ok(artifacts)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let contents = fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ArtifactError::Parse {
        path: path.display().to_string(),
        source,
    })
}
