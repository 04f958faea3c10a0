use serde::Serialize;

use crate::inference::ScoredTable;

/// Counts and mean probability printed at the end of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total: usize,
    pub at_risk: usize,
    pub healthy: usize,
    /// Mean of the rounded probabilities; 0 for an empty table
    pub mean_probability: f64,
}

impl ReportSummary {
    pub fn from_scored(scored: &ScoredTable) -> Self {
        let preds = scored.predictions();
        let at_risk = preds.labels.iter().filter(|l| **l == 1).count();
        let mean_probability = if preds.is_empty() {
            0.0
        } else {
            preds.probabilities.iter().sum::<f64>() / preds.len() as f64
        };

        Self {
            total: preds.len(),
            at_risk,
            healthy: preds.len() - at_risk,
            mean_probability: mean_probability.clamp(0.0, 1.0),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("Total Engines: {}", self.total),
            format!("Engines at Risk: {}", self.at_risk),
            format!("Healthy Engines: {}", self.healthy),
            format!("Avg Failure Probability: {:.2}", self.mean_probability),
        ]
    }
}
