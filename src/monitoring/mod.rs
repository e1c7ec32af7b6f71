pub mod anomaly_detection;
pub mod maintenance;
pub mod metrics;
pub mod stats;

pub use anomaly_detection::{AnomalyDetector, AnomalyKind, AnomalyRecord};
pub use maintenance::{MaintenanceOutlook, MaintenancePrediction, MaintenancePredictor};
pub use metrics::{MetricsAggregator, PerformanceMetrics, PerformanceReport};
