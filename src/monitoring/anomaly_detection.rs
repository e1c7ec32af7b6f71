use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TwinSettings;
use crate::monitoring::stats;
use crate::twin::models::Sample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyKind {
    High,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub timestamp: DateTime<Utc>,
    pub cutting_time: f64,
    pub z_score: f64,
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
}

/// A value that crossed the z-score threshold, by position in the input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlaggedValue {
    pub index: usize,
    pub value: f64,
    pub z_score: f64,
    pub kind: AnomalyKind,
}

#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    threshold: f64,
    min_samples: usize,
    max_reported: usize,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self {
            threshold: 2.0,
            min_samples: 20,
            max_reported: 10,
        }
    }
}

impl AnomalyDetector {
    pub fn new(threshold: f64, min_samples: usize, max_reported: usize) -> Self {
        Self {
            threshold,
            min_samples,
            max_reported,
        }
    }

    pub fn from_settings(settings: &TwinSettings) -> Self {
        Self::new(
            settings.anomaly_z_threshold,
            settings.anomaly_min_samples,
            settings.anomaly_max_reported,
        )
    }

    /// Scores every value against the mean of the whole slice. No minimum length
    /// is applied here; a zero deviation scores everything 0.
    pub fn flag_values(&self, values: &[f64]) -> Vec<FlaggedValue> {
        let mean = stats::mean(values);
        let std = stats::population_std(values);

        values
            .iter()
            .enumerate()
            .filter_map(|(index, &value)| {
                let z_score = if std > 0.0 { ((value - mean) / std).abs() } else { 0.0 };
                if z_score > self.threshold {
                    Some(FlaggedValue {
                        index,
                        value,
                        z_score,
                        kind: if value > mean { AnomalyKind::High } else { AnomalyKind::Low },
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    /// Flags anomalous cutting times in a chronologically ordered window and keeps
    /// the most recent `max_reported` of them.
    pub fn detect(&self, samples: &[Sample]) -> Vec<AnomalyRecord> {
        if samples.len() < self.min_samples {
            return Vec::new();
        }

        let cutting_times: Vec<f64> = samples.iter().map(|s| s.cutting_time).collect();
        let flagged = self.flag_values(&cutting_times);
        let skip = flagged.len().saturating_sub(self.max_reported);

        flagged
            .into_iter()
            .skip(skip)
            .map(|f| AnomalyRecord {
                timestamp: samples[f.index].timestamp,
                cutting_time: f.value,
                z_score: stats::round_to(f.z_score, 2),
                kind: f.kind,
            })
            .collect()
    }
}
