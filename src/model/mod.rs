//! Fitted model artifacts consumed by inference.
//!
//! Artifacts are produced offline by the training pipeline and shipped as
//! JSON. They are loaded once at startup and only ever borrowed afterwards.

pub mod artifacts;
pub mod forest;
pub mod scaler;

use ndarray::Array2;
use thiserror::Error;

use crate::inference::InferenceError;

pub use artifacts::{ArtifactPaths, ModelArtifacts};
pub use forest::{DecisionTree, RandomForest};
pub use scaler::StandardScaler;

/// A fitted normalization applied before classification.
pub trait Scaler {
    /// Feature count the scaler was fit on.
    fn n_features(&self) -> usize;

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, InferenceError>;
}

/// A fitted binary classifier over scaled features.
pub trait Classifier {
    fn n_features(&self) -> usize;

    /// Hard labels, 0 (healthy) or 1 (at risk).
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<u8>, InferenceError>;

    /// One row per sample, one column per class in label order.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, InferenceError>;
}

/// A model artifact file that is unreadable or internally inconsistent.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse artifact {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {artifact} artifact: {reason}")]
    Invalid {
        artifact: &'static str,
        reason: String,
    },
}

pub(crate) fn check_width(
    component: &'static str,
    expected: usize,
    x: &Array2<f64>,
) -> Result<(), InferenceError> {
    if x.ncols() != expected {
        return Err(InferenceError::FeatureCountMismatch {
            component,
            expected,
            found: x.ncols(),
        });
    }
    Ok(())
}
