use serde::Serialize;

use crate::inference::ScoredTable;

pub const RECOMMEND_INSPECTION: &str =
    "Schedule inspection & preventive maintenance within next 10 cycles.";
pub const RECOMMEND_MONITORING: &str = "Continue monitoring engines regularly.";

/// An engine (row index) predicted to fail soon.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub engine: usize,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub at_risk: usize,
    pub healthy: usize,
    pub alerts: Vec<Alert>,
    pub recommendation: &'static str,
}

impl Insights {
    pub fn from_scored(scored: &ScoredTable) -> Self {
        let preds = scored.predictions();
        let alerts: Vec<Alert> = preds
            .labels
            .iter()
            .zip(&preds.probabilities)
            .enumerate()
            .filter(|(_, (label, _))| **label == 1)
            .map(|(engine, (_, probability))| Alert {
                engine,
                probability: *probability,
            })
            .collect();

        let recommendation = if alerts.is_empty() {
            RECOMMEND_MONITORING
        } else {
            RECOMMEND_INSPECTION
        };

        Self {
            at_risk: alerts.len(),
            healthy: preds.len() - alerts.len(),
            alerts,
            recommendation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::align_features;
    use crate::inference::{score, Predictions};
    use crate::schema::FeatureSchema;
    use crate::table::read_csv;

    fn scored(labels: Vec<u8>, probabilities: Vec<f64>) -> ScoredTable {
        let mut raw = String::from("sensor_1\n");
        for _ in &labels {
            raw.push_str("1\n");
        }
        let aligned = align_features(&read_csv(&raw).unwrap(), &FeatureSchema::turbofan());
        score(
            aligned,
            Predictions {
                labels,
                probabilities,
            },
        )
        .unwrap()
    }

    #[test]
    fn alerts_list_at_risk_rows() {
        let insights = Insights::from_scored(&scored(vec![0, 1, 1], vec![0.1, 0.6, 0.95]));

        assert_eq!(insights.at_risk, 2);
        assert_eq!(insights.healthy, 1);
        assert_eq!(
            insights.alerts,
            vec![
                Alert { engine: 1, probability: 0.6 },
                Alert { engine: 2, probability: 0.95 }
            ]
        );
        assert_eq!(insights.recommendation, RECOMMEND_INSPECTION);
    }

    #[test]
    fn all_healthy_recommends_monitoring() {
        let insights = Insights::from_scored(&scored(vec![0, 0], vec![0.2, 0.3]));
        assert!(insights.alerts.is_empty());
        assert_eq!(insights.recommendation, RECOMMEND_MONITORING);
    }
}
