use serde::{Deserialize, Serialize};

use crate::monitoring::stats;
use crate::twin::models::Sample;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_cutting_time: f64,
    pub average_cutting_time: f64,
    pub max_cutting_time: f64,
    pub min_cutting_time: f64,
    pub total_operations: usize,
    pub efficiency: f64,
    pub utilization: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PerformanceReport {
    Available(PerformanceMetrics),
    Unavailable { error: String },
}

impl PerformanceReport {
    pub fn no_data() -> Self {
        PerformanceReport::Unavailable {
            error: "No data available".to_string(),
        }
    }

    pub fn metrics(&self) -> Option<&PerformanceMetrics> {
        match self {
            PerformanceReport::Available(m) => Some(m),
            PerformanceReport::Unavailable { .. } => None,
        }
    }
}

/// Consistency score: 100 minus the coefficient of variation as a percentage,
/// floored at 0. A zero mean scores 0.
pub fn efficiency(mean: f64, std_dev: f64) -> f64 {
    if mean == 0.0 {
        return 0.0;
    }
    let coefficient_of_variation = std_dev / mean;
    stats::round_to((100.0 - coefficient_of_variation * 100.0).max(0.0), 2)
}

/// Efficiency of a window using its sample deviation. Windows with fewer than
/// two values have no deviation and score 0.
pub fn efficiency_of(cutting_times: &[f64]) -> f64 {
    match stats::sample_std(cutting_times) {
        Some(std_dev) => efficiency(stats::mean(cutting_times), std_dev),
        None => 0.0,
    }
}

/// Share of the window spent cutting, capped at 100.
pub fn utilization(total_cutting_time: f64, hours_window: i64) -> f64 {
    if hours_window <= 0 {
        return 0.0;
    }
    let available = hours_window as f64 * 3600.0;
    stats::round_to((total_cutting_time / available * 100.0).min(100.0), 2)
}

#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    hours_window: i64,
}

impl MetricsAggregator {
    pub fn new(hours_window: i64) -> Self {
        Self { hours_window }
    }

    pub fn hours_window(&self) -> i64 {
        self.hours_window
    }

    pub fn aggregate(&self, samples: &[Sample]) -> PerformanceReport {
        if samples.is_empty() {
            return PerformanceReport::no_data();
        }

        let cutting_times: Vec<f64> = samples.iter().map(|s| s.cutting_time).collect();
        let total: f64 = cutting_times.iter().sum();

        PerformanceReport::Available(PerformanceMetrics {
            total_cutting_time: total,
            average_cutting_time: stats::mean(&cutting_times),
            max_cutting_time: stats::max(&cutting_times).unwrap_or(0.0),
            min_cutting_time: stats::min(&cutting_times).unwrap_or(0.0),
            total_operations: cutting_times.len(),
            efficiency: efficiency_of(&cutting_times),
            utilization: utilization(total, self.hours_window),
        })
    }
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new(24)
    }
}
