use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Experiment arm a lead is assigned to for the coupon A/B test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentBucket {
    Control,
    Experiment,
}

impl ExperimentBucket {
    /// Roughly 20% of leads land in control: ids whose last decimal digit
    /// is 0 or 1.
    pub fn for_lead(lead_id: i64) -> Self {
        if lead_id % 10 <= 1 {
            ExperimentBucket::Control
        } else {
            ExperimentBucket::Experiment
        }
    }
}

/// A conversion prediction published to the broker when a lead is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub lead_id: i64,
    pub experiment_bucket: ExperimentBucket,
    /// Model score in `[0, 1)`.
    pub score: f64,
    /// Binary label: 1 if the score cleared the threshold.
    pub label: u8,
    pub predicted_at: DateTime<Utc>,
}
