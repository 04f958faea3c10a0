use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use super::{check_width, ArtifactError, Classifier};
use crate::inference::InferenceError;

const LEAF: i64 = -1;

/// One fitted tree in flat array form.
///
/// Node `i` splits on `feature[i]` at `threshold[i]`; samples with
/// `x[feature] <= threshold` go to `children_left[i]`. Leaves have
/// `children_left[i] == -1` and carry per-class weights in `value[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

impl DecisionTree {
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        let n = self.children_left.len();
        if n == 0 {
            return Err("tree has no nodes".into());
        }
        if [
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.value.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err(format!("node arrays disagree on length (expected {n})"));
        }

        for node in 0..n {
            if self.value[node].len() != n_classes {
                return Err(format!(
                    "node {node} has {} class weights, expected {n_classes}",
                    self.value[node].len()
                ));
            }
            if self.children_left[node] == LEAF {
                continue;
            }
            for child in [self.children_left[node], self.children_right[node]] {
                // Children always come after their parent, which also rules out cycles.
                if child <= node as i64 || child >= n as i64 {
                    return Err(format!("node {node} has out-of-range child {child}"));
                }
            }
            let feature = self.feature[node];
            if feature < 0 || feature >= n_features as i64 {
                return Err(format!("node {node} splits on unknown feature {feature}"));
            }
        }
        Ok(())
    }

    fn leaf_for(&self, sample: ArrayView1<'_, f64>) -> usize {
        let mut node = 0usize;
        while self.children_left[node] != LEAF {
            let value = sample[self.feature[node] as usize];
            node = if value <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        node
    }

    /// Normalized class distribution at the leaf reached by `sample`.
    fn distribution(&self, sample: ArrayView1<'_, f64>) -> Vec<f64> {
        let weights = &self.value[self.leaf_for(sample)];
        let total: f64 = weights.iter().sum();
        if total > 0.0 {
            weights.iter().map(|w| w / total).collect()
        } else {
            vec![1.0 / weights.len() as f64; weights.len()]
        }
    }
}

/// Bagged ensemble of decision trees; probabilities are the mean of the
/// per-tree leaf distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub classes: Vec<u8>,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let invalid = |reason: String| ArtifactError::Invalid {
            artifact: "classifier",
            reason,
        };

        if self.classes != [0, 1] {
            return Err(invalid(format!(
                "expected binary classes [0, 1], found {:?}",
                self.classes
            )));
        }
        if self.trees.is_empty() {
            return Err(invalid("forest has no trees".into()));
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.classes.len())
                .map_err(|reason| invalid(format!("tree {idx}: {reason}")))?;
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<u8>, InferenceError> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| {
                // First class wins ties.
                let mut best = 0;
                for (idx, p) in row.iter().enumerate() {
                    if *p > row[best] {
                        best = idx;
                    }
                }
                self.classes[best]
            })
            .collect())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, InferenceError> {
        check_width("classifier", self.n_features, x)?;
        if self.trees.is_empty() {
            return Err(InferenceError::EmptyModel);
        }

        let n_classes = self.classes.len();
        let mut out = Array2::<f64>::zeros((x.nrows(), n_classes));
        for (sample, mut acc) in x.rows().into_iter().zip(out.rows_mut()) {
            for tree in &self.trees {
                for (slot, p) in acc.iter_mut().zip(tree.distribution(sample)) {
                    *slot += p;
                }
            }
            acc.mapv_inplace(|v| v / self.trees.len() as f64);
        }
        Ok(out)
    }
}
