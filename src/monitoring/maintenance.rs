use serde::{Deserialize, Serialize};

use crate::config::TwinSettings;
use crate::monitoring::stats;

const RISING_RATIO: f64 = 1.2;
const FALLING_RATIO: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceOutlook {
    InsufficientData,
    MaintenanceRecommended,
    ToolWear,
    Normal,
}

impl MaintenanceOutlook {
    pub fn prediction(&self) -> &'static str {
        match self {
            MaintenanceOutlook::InsufficientData => "Insufficient data",
            MaintenanceOutlook::MaintenanceRecommended => "Maintenance recommended within 3 days",
            MaintenanceOutlook::ToolWear => "Tool wear detected",
            MaintenanceOutlook::Normal => "Normal operation",
        }
    }

    pub fn confidence(&self) -> u8 {
        match self {
            MaintenanceOutlook::InsufficientData => 0,
            MaintenanceOutlook::MaintenanceRecommended => 75,
            MaintenanceOutlook::ToolWear => 60,
            MaintenanceOutlook::Normal => 80,
        }
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            MaintenanceOutlook::InsufficientData => None,
            MaintenanceOutlook::MaintenanceRecommended => {
                Some("Cutting times increasing above normal")
            }
            MaintenanceOutlook::ToolWear => Some("Cutting times decreasing significantly"),
            MaintenanceOutlook::Normal => Some("Cutting times within normal range"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenancePrediction {
    pub prediction: String,
    pub confidence: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip)]
    pub outlook: Option<MaintenanceOutlook>,
}

impl From<MaintenanceOutlook> for MaintenancePrediction {
    fn from(outlook: MaintenanceOutlook) -> Self {
        Self {
            prediction: outlook.prediction().to_string(),
            confidence: outlook.confidence(),
            reason: outlook.reason().map(str::to_string),
            outlook: Some(outlook),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MaintenancePredictor {
    min_samples: usize,
    recent_window: usize,
}

impl Default for MaintenancePredictor {
    fn default() -> Self {
        Self {
            min_samples: 10,
            recent_window: 10,
        }
    }
}

impl MaintenancePredictor {
    pub fn new(min_samples: usize, recent_window: usize) -> Self {
        Self {
            min_samples,
            recent_window: recent_window.max(1),
        }
    }

    pub fn from_settings(settings: &TwinSettings) -> Self {
        Self::new(
            settings.maintenance_min_samples,
            settings.maintenance_recent_window,
        )
    }

    /// Threshold check on the recent and overall averages.
    pub fn classify(recent_avg: f64, overall_avg: f64) -> MaintenanceOutlook {
        if recent_avg > overall_avg * RISING_RATIO {
            MaintenanceOutlook::MaintenanceRecommended
        } else if recent_avg < overall_avg * FALLING_RATIO {
            MaintenanceOutlook::ToolWear
        } else {
            MaintenanceOutlook::Normal
        }
    }

    /// `cutting_times` must be in chronological order; the tail is the recent window.
    pub fn predict(&self, cutting_times: &[f64]) -> MaintenancePrediction {
        if cutting_times.len() < self.min_samples {
            return MaintenanceOutlook::InsufficientData.into();
        }

        let tail_start = cutting_times.len().saturating_sub(self.recent_window);
        let recent_avg = stats::mean(&cutting_times[tail_start..]);
        let overall_avg = stats::mean(cutting_times);

        Self::classify(recent_avg, overall_avg).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data() {
        let predictor = MaintenancePredictor::default();
        let prediction = predictor.predict(&[10.0; 9]);
        assert_eq!(prediction.prediction, "Insufficient data");
        assert_eq!(prediction.confidence, 0);
        assert!(prediction.reason.is_none());

        let json = serde_json::to_value(&prediction).unwrap();
        assert!(json.get("reason").is_none());
    }

    #[test]
    fn test_ten_samples_are_enough() {
        let predictor = MaintenancePredictor::default();
        let prediction = predictor.predict(&[10.0; 10]);
        assert_eq!(prediction.outlook, Some(MaintenanceOutlook::Normal));
        assert_eq!(prediction.confidence, 80);

        // the recent window covers every sample, so the ratio is always 1
        let mut values = vec![5.0; 5];
        values.extend([50.0; 5]);
        let prediction = predictor.predict(&values);
        assert_eq!(prediction.outlook, Some(MaintenanceOutlook::Normal));
    }

    #[test]
    fn test_rising_trend_recommends_maintenance() {
        // 20 samples at 8.5 followed by 10 at 13.0: overall 10.0, recent 13.0
        let mut values = vec![8.5; 20];
        values.extend(std::iter::repeat(13.0).take(10));

        let prediction = MaintenancePredictor::default().predict(&values);
        assert_eq!(prediction.outlook, Some(MaintenanceOutlook::MaintenanceRecommended));
        assert_eq!(prediction.prediction, "Maintenance recommended within 3 days");
        assert_eq!(prediction.confidence, 75);
    }

    #[test]
    fn test_ratio_classification() {
        assert_eq!(
            MaintenancePredictor::classify(13.0, 10.0),
            MaintenanceOutlook::MaintenanceRecommended
        );
        assert_eq!(MaintenancePredictor::classify(7.0, 10.0), MaintenanceOutlook::ToolWear);
        assert_eq!(MaintenancePredictor::classify(10.0, 10.0), MaintenanceOutlook::Normal);
        assert_eq!(MaintenancePredictor::classify(11.5, 10.0), MaintenanceOutlook::Normal);
        assert_eq!(MaintenancePredictor::classify(0.0, 0.0), MaintenanceOutlook::Normal);
    }

    #[test]
    fn test_falling_trend_reports_tool_wear() {
        let mut values = vec![20.0; 30];
        values.extend(std::iter::repeat(5.0).take(10));

        let prediction = MaintenancePredictor::default().predict(&values);
        assert_eq!(prediction.prediction, "Tool wear detected");
        assert_eq!(prediction.confidence, 60);
        assert_eq!(
            prediction.reason.as_deref(),
            Some("Cutting times decreasing significantly")
        );
    }

    #[test]
    fn test_steady_series_is_normal() {
        let prediction = MaintenancePredictor::default().predict(&[30.0; 12]);
        assert_eq!(prediction.prediction, "Normal operation");
        assert_eq!(prediction.confidence, 80);
    }
}
