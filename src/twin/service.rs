use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::TwinSettings;
use crate::errors::{TwinError, TwinResult};
use crate::monitoring::{
    AnomalyDetector, AnomalyRecord, MaintenancePrediction, MaintenancePredictor,
    MetricsAggregator, PerformanceReport,
};
use crate::twin::models::{
    CuttingDocument, MachineState, MachineStatus, MachineSummary, NewCuttingData, Sample,
    TimeSeries, TwinState,
};
use crate::twin::store::{CuttingDataStore, CuttingQuery};

/// Longest trailing window a caller may ask for, one year.
pub const MAX_WINDOW_HOURS: i64 = 24 * 365;

/// Start of a trailing window of `hours` ending at `now`.
fn window_start(hours: i64, now: DateTime<Utc>) -> TwinResult<DateTime<Utc>> {
    if !(1..=MAX_WINDOW_HOURS).contains(&hours) {
        return Err(TwinError::invalid(
            "hours",
            format!("must be between 1 and {}", MAX_WINDOW_HOURS),
        ));
    }
    Duration::try_hours(hours)
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or_else(|| TwinError::invalid("hours", "window starts before the supported date range"))
}

/// Builds twin snapshots from the cutting-data store. Every call that depends on
/// the clock has an `_at` form taking `now` explicitly.
#[derive(Clone)]
pub struct DigitalTwinService {
    store: Arc<dyn CuttingDataStore>,
    settings: TwinSettings,
    detector: AnomalyDetector,
    predictor: MaintenancePredictor,
}

impl DigitalTwinService {
    pub fn new(store: Arc<dyn CuttingDataStore>, settings: TwinSettings) -> Self {
        Self {
            detector: AnomalyDetector::from_settings(&settings),
            predictor: MaintenancePredictor::from_settings(&settings),
            store,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn CuttingDataStore> {
        &self.store
    }

    /// Samples for a machine over the trailing window, oldest first.
    async fn window(
        &self,
        machine_id: &str,
        span: Duration,
        now: DateTime<Utc>,
    ) -> TwinResult<Vec<Sample>> {
        let query = CuttingQuery::machine(machine_id).between(now - span, now);
        let mut samples: Vec<Sample> = self
            .store
            .find(&query)
            .await?
            .iter()
            .map(CuttingDocument::sample)
            .collect();
        samples.reverse();
        Ok(samples)
    }

    pub async fn machine_status_at(
        &self,
        machine_id: &str,
        now: DateTime<Utc>,
    ) -> TwinResult<MachineStatus> {
        let Some(latest) = self.store.latest(machine_id).await? else {
            return Ok(MachineStatus::offline());
        };

        let active_window = Duration::minutes(self.settings.active_window_minutes);
        let status = if now - latest.timestamp < active_window {
            MachineState::Active
        } else {
            MachineState::Idle
        };

        Ok(MachineStatus {
            status,
            last_seen: Some(latest.timestamp),
            current_cutting_time: Some(latest.cutting_time),
            spindle_speed: Some(latest.spindle_speed),
            feed_rate: Some(latest.feed_rate),
        })
    }

    pub async fn performance_metrics_at(
        &self,
        machine_id: &str,
        hours: i64,
        now: DateTime<Utc>,
    ) -> TwinResult<PerformanceReport> {
        let start = window_start(hours, now)?;
        let samples = self.window(machine_id, now - start, now).await?;
        Ok(MetricsAggregator::new(hours).aggregate(&samples))
    }

    pub async fn predict_maintenance_at(
        &self,
        machine_id: &str,
        now: DateTime<Utc>,
    ) -> TwinResult<MaintenancePrediction> {
        let lookback = Duration::days(self.settings.maintenance_lookback_days);
        let samples = self.window(machine_id, lookback, now).await?;
        let cutting_times: Vec<f64> = samples.iter().map(|s| s.cutting_time).collect();
        Ok(self.predictor.predict(&cutting_times))
    }

    pub fn detect_anomalies(&self, samples: &[Sample]) -> Vec<AnomalyRecord> {
        self.detector.detect(samples)
    }

    pub async fn twin_state(&self, machine_id: &str) -> TwinResult<TwinState> {
        self.twin_state_at(machine_id, Utc::now()).await
    }

    pub async fn twin_state_at(&self, machine_id: &str, now: DateTime<Utc>) -> TwinResult<TwinState> {
        let hours = self.settings.metrics_window_hours;
        let status = self.machine_status_at(machine_id, now).await?;
        let recent = self.window(machine_id, Duration::hours(hours), now).await?;
        let metrics = MetricsAggregator::new(hours).aggregate(&recent);
        let maintenance_prediction = self.predict_maintenance_at(machine_id, now).await?;
        let anomalies = self.detect_anomalies(&recent);

        debug!(
            machine_id,
            samples = recent.len(),
            anomalies = anomalies.len(),
            "Built twin state"
        );

        Ok(TwinState {
            machine_id: machine_id.to_string(),
            status,
            metrics,
            time_series: TimeSeries::from_samples(&recent),
            maintenance_prediction,
            anomalies,
            last_updated: now,
        })
    }

    pub async fn machines(&self) -> TwinResult<Vec<MachineSummary>> {
        self.machines_at(Utc::now()).await
    }

    pub async fn machines_at(&self, now: DateTime<Utc>) -> TwinResult<Vec<MachineSummary>> {
        let mut summaries = Vec::new();
        for machine_id in self.store.distinct_machines().await? {
            let status = self.machine_status_at(&machine_id, now).await?;
            summaries.push(MachineSummary {
                name: format!("CNC Machine {}", machine_id),
                id: machine_id,
                status: status.status,
                last_seen: status.last_seen,
            });
        }
        Ok(summaries)
    }

    /// Raw documents over the last `hours`, newest first.
    pub async fn history(&self, machine_id: &str, hours: i64) -> TwinResult<Vec<CuttingDocument>> {
        self.history_at(machine_id, hours, Utc::now()).await
    }

    pub async fn history_at(
        &self,
        machine_id: &str,
        hours: i64,
        now: DateTime<Utc>,
    ) -> TwinResult<Vec<CuttingDocument>> {
        let query = CuttingQuery::machine(machine_id).between(window_start(hours, now)?, now);
        self.store.find(&query).await
    }

    pub async fn ingest(&self, data: NewCuttingData) -> TwinResult<String> {
        self.ingest_at(data, Utc::now()).await
    }

    pub async fn ingest_at(&self, data: NewCuttingData, now: DateTime<Utc>) -> TwinResult<String> {
        let machine_id = data.machine_id.clone();
        let id = self.store.insert(data, now).await?;
        info!(id = %id, machine_id = %machine_id, "Cutting data stored");
        Ok(id)
    }
}
