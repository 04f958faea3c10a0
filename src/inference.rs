//! Scaler → classifier pass over an aligned table.

use ndarray::Array2;
use thiserror::Error;

use crate::align::{align_features, AlignedTable};
use crate::model::{Classifier, ModelArtifacts, Scaler};
use crate::schema::FeatureSchema;
use crate::table::{Cell, Table};

const ENABLE_LOGS: bool = true;

use crate::log_info;

pub const PREDICTION_COLUMN: &str = "Prediction";
pub const PROBABILITY_COLUMN: &str = "Failure_Probability";

#[derive(Debug, Error, PartialEq)]
pub enum InferenceError {
    #[error("{component} was fit on {expected} features but received {found}")]
    FeatureCountMismatch {
        component: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("schema field '{0}' is missing from the aligned table")]
    MissingFeature(String),

    #[error("row {row}: feature '{column}' is not numeric ({value})")]
    NonNumericFeature {
        row: usize,
        column: String,
        value: String,
    },

    #[error("classifier returned {found} probability columns, expected 2")]
    ProbabilityShape { found: usize },

    #[error("classifier returned {found} results for {expected} rows")]
    RowCountMismatch { expected: usize, found: usize },

    #[error("model has no fitted estimators")]
    EmptyModel,
}

/// Parallel per-row outputs of one inference pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Predictions {
    pub labels: Vec<u8>,
    pub probabilities: Vec<f64>,
}

impl Predictions {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Aligned table plus `Prediction` and `Failure_Probability` columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTable {
    table: Table,
    predictions: Predictions,
}

impl ScoredTable {
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Labels and the 3-decimal probabilities shown in the table.
    pub fn predictions(&self) -> &Predictions {
        &self.predictions
    }

    pub fn n_rows(&self) -> usize {
        self.table.n_rows()
    }
}

/// Copy the schema columns, in schema order, into a dense matrix.
pub fn feature_matrix(aligned: &Table, schema: &FeatureSchema) -> Result<Array2<f64>, InferenceError> {
    let indices = schema
        .names()
        .map(|name| {
            aligned
                .column_index(name)
                .ok_or_else(|| InferenceError::MissingFeature(name.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut x = Array2::<f64>::zeros((aligned.n_rows(), indices.len()));
    for (r, row) in aligned.rows().iter().enumerate() {
        for (c, &idx) in indices.iter().enumerate() {
            x[[r, c]] = row[idx]
                .as_f64()
                .ok_or_else(|| InferenceError::NonNumericFeature {
                    row: r,
                    column: aligned.columns()[idx].clone(),
                    value: row[idx].to_string(),
                })?;
        }
    }
    Ok(x)
}

/// Score every row. Deterministic for fixed artifacts and input.
pub fn predict(
    aligned: &AlignedTable,
    schema: &FeatureSchema,
    scaler: &dyn Scaler,
    classifier: &dyn Classifier,
) -> Result<Predictions, InferenceError> {
    let x = feature_matrix(aligned.table(), schema)?;
    let scaled = scaler.transform(&x)?;

    let labels = classifier.predict(&scaled)?;
    let proba = classifier.predict_proba(&scaled)?;
    if proba.ncols() != 2 {
        return Err(InferenceError::ProbabilityShape { found: proba.ncols() });
    }
    for found in [labels.len(), proba.nrows()] {
        if found != x.nrows() {
            return Err(InferenceError::RowCountMismatch {
                expected: x.nrows(),
                found,
            });
        }
    }

    let probabilities = proba.column(1).iter().map(|p| p.clamp(0.0, 1.0)).collect();
    let labels = labels.into_iter().map(|l| u8::from(l != 0)).collect();

    Ok(Predictions {
        labels,
        probabilities,
    })
}

/// Attach predictions to the aligned table; probabilities are rounded to 3 decimals.
pub fn score(aligned: AlignedTable, predictions: Predictions) -> Result<ScoredTable, InferenceError> {
    let mut table = aligned.into_table();
    if predictions.len() != table.n_rows() {
        return Err(InferenceError::RowCountMismatch {
            expected: table.n_rows(),
            found: predictions.len(),
        });
    }

    let rounded: Vec<f64> = predictions.probabilities.iter().map(|p| round_to(*p, 3)).collect();
    let label_cells = predictions.labels.iter().map(|l| Cell::Int(i64::from(*l))).collect();
    let prob_cells = rounded.iter().map(|p| Cell::Float(*p)).collect();

    // Re-scoring an already scored table replaces the old columns.
    table = drop_columns(&table, &[PREDICTION_COLUMN, PROBABILITY_COLUMN]);
    let length_mismatch = |expected: usize| InferenceError::RowCountMismatch {
        expected,
        found: predictions.len(),
    };
    let n_rows = table.n_rows();
    table
        .push_column(PREDICTION_COLUMN, label_cells)
        .map_err(|_| length_mismatch(n_rows))?;
    table
        .push_column(PROBABILITY_COLUMN, prob_cells)
        .map_err(|_| length_mismatch(n_rows))?;

    let at_risk = predictions.labels.iter().filter(|l| **l == 1).count();
    log_info!(
        "Scored {} engines: {} at risk, {} healthy",
        predictions.len(),
        at_risk,
        predictions.len() - at_risk
    );

    Ok(ScoredTable {
        table,
        predictions: Predictions {
            labels: predictions.labels,
            probabilities: rounded,
        },
    })
}

/// Align, predict and attach scores in one pass.
pub fn score_table(
    table: &Table,
    schema: &FeatureSchema,
    artifacts: &ModelArtifacts,
) -> Result<ScoredTable, InferenceError> {
    let aligned = align_features(table, schema);
    let predictions = predict(&aligned, schema, &artifacts.scaler, &artifacts.classifier)?;
    score(aligned, predictions)
}

fn drop_columns(table: &Table, names: &[&str]) -> Table {
    let keep: Vec<usize> = (0..table.n_cols())
        .filter(|idx| !names.contains(&table.columns()[*idx].as_str()))
        .collect();
    table.reorder(&keep)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::forest::tests::stump;
    use crate::model::{RandomForest, StandardScaler};
    use crate::table::read_csv;
    use proptest::prelude::*;

    fn artifacts(n_features: usize) -> (StandardScaler, RandomForest) {
        (
            StandardScaler {
                mean: vec![0.0; n_features],
                scale: vec![1.0; n_features],
            },
            RandomForest {
                n_features,
                classes: vec![0, 1],
                trees: vec![stump(n_features, 0), stump(n_features, 3)],
            },
        )
    }

    #[test]
    fn settings_only_record_scores_with_zero_sensors() {
        let schema = FeatureSchema::turbofan();
        let (scaler, forest) = artifacts(24);
        let table = read_csv("operational_setting_1,operational_setting_2,operational_setting_3\n0.9,0.1,100\n").unwrap();
        let aligned = align_features(&table, &schema);

        let preds = predict(&aligned, &schema, &scaler, &forest).unwrap();

        assert_eq!(preds.labels, vec![0]);
        assert!((preds.probabilities[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn blank_sensor_scores_like_an_explicit_zero() {
        let schema = FeatureSchema::turbofan();
        let (scaler, forest) = artifacts(24);
        let blank = align_features(&read_csv("operational_setting_1,sensor_1\n0,\n").unwrap(), &schema);
        let zero = align_features(&read_csv("operational_setting_1,sensor_1\n0,0\n").unwrap(), &schema);

        let from_blank = predict(&blank, &schema, &scaler, &forest).unwrap();
        let from_zero = predict(&zero, &schema, &scaler, &forest).unwrap();

        assert_eq!(from_blank, from_zero);
        assert!((from_blank.probabilities[0] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn projection_follows_schema_order_not_input_order() {
        let schema = FeatureSchema::turbofan();
        let table = read_csv("sensor_1,operational_setting_1\n7,3\n").unwrap();
        let aligned = align_features(&table, &schema);

        let x = feature_matrix(aligned.table(), &schema).unwrap();

        assert_eq!(x.shape(), &[1, 24]);
        assert_eq!(x[[0, 0]], 3.0);
        assert_eq!(x[[0, 3]], 7.0);
    }

    #[test]
    fn mismatched_artifacts_fail_instead_of_coercing() {
        let schema = FeatureSchema::turbofan();
        let (scaler, forest) = artifacts(10);
        let aligned = align_features(&read_csv("sensor_1\n1\n").unwrap(), &schema);

        let err = predict(&aligned, &schema, &scaler, &forest).unwrap_err();
        assert_eq!(
            err,
            InferenceError::FeatureCountMismatch {
                component: "scaler",
                expected: 10,
                found: 24
            }
        );
    }

    #[test]
    fn text_in_feature_column_is_an_inference_error() {
        let schema = FeatureSchema::turbofan();
        let (scaler, forest) = artifacts(24);
        let aligned = align_features(&read_csv("sensor_2\nbroken\n").unwrap(), &schema);

        let err = predict(&aligned, &schema, &scaler, &forest).unwrap_err();
        assert!(matches!(err, InferenceError::NonNumericFeature { row: 0, .. }));
    }

    #[test]
    fn score_appends_rounded_columns() {
        let schema = FeatureSchema::turbofan();
        let aligned = align_features(&read_csv("sensor_1\n1\n2\n").unwrap(), &schema);
        let preds = Predictions {
            labels: vec![0, 1],
            probabilities: vec![0.12345, 0.98765],
        };

        let scored = score(aligned, preds).unwrap();
        let columns = scored.table().columns();

        assert_eq!(&columns[columns.len() - 2..], [PREDICTION_COLUMN, PROBABILITY_COLUMN]);
        assert_eq!(scored.table().cell(1, PREDICTION_COLUMN), Some(&Cell::Int(1)));
        assert_eq!(scored.table().cell(0, PROBABILITY_COLUMN), Some(&Cell::Float(0.123)));
        assert_eq!(scored.predictions().probabilities, vec![0.123, 0.988]);
    }

    #[test]
    fn score_rejects_wrong_length() {
        let aligned = align_features(&read_csv("sensor_1\n1\n2\n").unwrap(), &FeatureSchema::turbofan());
        let preds = Predictions {
            labels: vec![0],
            probabilities: vec![0.5],
        };
        assert!(matches!(
            score(aligned, preds),
            Err(InferenceError::RowCountMismatch { expected: 2, found: 1 })
        ));
    }

    proptest! {
        #[test]
        fn outputs_are_bounded_and_repeatable(rows in proptest::collection::vec(proptest::collection::vec(-5.0f64..5.0, 24), 0..12)) {
            let schema = FeatureSchema::turbofan();
            let (scaler, forest) = artifacts(24);
            let names: Vec<String> = schema.names().map(str::to_string).collect();
            let mut table = Table::new(names).unwrap();
            for row in &rows {
                table.push_row(row.iter().map(|v| Cell::Float(*v)).collect()).unwrap();
            }
            let aligned = align_features(&table, &schema);

            let first = predict(&aligned, &schema, &scaler, &forest).unwrap();
            let second = predict(&aligned, &schema, &scaler, &forest).unwrap();

            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.labels.len(), rows.len());
            prop_assert_eq!(first.probabilities.len(), rows.len());
            prop_assert!(first.labels.iter().all(|l| *l <= 1));
            prop_assert!(first.probabilities.iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }
}
