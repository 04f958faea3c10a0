use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::{check_width, ArtifactError, Scaler};
use crate::inference::InferenceError;

/// Per-feature standardization: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.mean.is_empty() {
            return Err(ArtifactError::Invalid {
                artifact: "scaler",
                reason: "no features".into(),
            });
        }
        if self.mean.len() != self.scale.len() {
            return Err(ArtifactError::Invalid {
                artifact: "scaler",
                reason: format!(
                    "mean has {} entries but scale has {}",
                    self.mean.len(),
                    self.scale.len()
                ),
            });
        }
        if let Some(idx) = self
            .mean
            .iter()
            .chain(&self.scale)
            .position(|v| !v.is_finite())
        {
            return Err(ArtifactError::Invalid {
                artifact: "scaler",
                reason: format!("non-finite parameter at position {idx}"),
            });
        }
        Ok(())
    }
}

impl Scaler for StandardScaler {
    fn n_features(&self) -> usize {
        self.mean.len()
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, InferenceError> {
        check_width("scaler", self.n_features(), x)?;

        let mean = Array1::from(self.mean.clone());
        // Constant features were fit with zero variance; leave them centred only.
        let scale = Array1::from_iter(self.scale.iter().map(|&s| if s == 0.0 { 1.0 } else { s }));

        let centred = x - &mean.insert_axis(Axis(0));
        Ok(centred / &scale.insert_axis(Axis(0)))
    }
}
