use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::energy::analytics::{self, Dimension, GroupTotal, PeakUsage};
use crate::energy::import::export_csv;
use crate::energy::records::{daily_totals, DailyTotal, EnergyRecord};
use crate::errors::TwinResult;
use crate::monitoring::stats;

pub const NO_DATA_IN_RANGE: &str = "No data available for the selected date range.";

/// Headline figures shown on the dashboard and at the top of every report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMetrics {
    pub total_consumption: f64,
    pub avg_daily_consumption: f64,
    pub total_cost: f64,
    pub avg_rate: f64,
    pub record_count: usize,
}

pub fn key_metrics(records: &[EnergyRecord]) -> KeyMetrics {
    let daily: Vec<f64> = daily_totals(records).iter().map(|d| d.consumption).collect();
    let rates: Vec<f64> = records.iter().map(|r| r.rate_per_kwh).collect();
    KeyMetrics {
        total_consumption: records.iter().map(|r| r.consumption_kwh).sum(),
        avg_daily_consumption: stats::mean(&daily),
        total_cost: records.iter().map(|r| r.cost).sum(),
        avg_rate: stats::mean(&rates),
        record_count: records.len(),
    }
}

/// Record selection for reports. Empty category or location lists match everything;
/// a date bound excludes records without a timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportFilter {
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
}

impl ReportFilter {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &EnergyRecord) -> bool {
        if !self.categories.is_empty() && !self.categories.contains(&record.category) {
            return false;
        }
        if !self.locations.is_empty() && !self.locations.contains(&record.location) {
            return false;
        }
        if self.start.is_none() && self.end.is_none() {
            return true;
        }
        let Some(date) = record.date() else {
            return false;
        };
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }

    pub fn apply(&self, records: &[EnergyRecord]) -> Vec<EnergyRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportOutcome<T> {
    Ready(T),
    Empty { warning: String },
}

impl<T> ReportOutcome<T> {
    fn empty() -> Self {
        ReportOutcome::Empty {
            warning: NO_DATA_IN_RANGE.to_string(),
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            ReportOutcome::Ready(report) => Some(report),
            ReportOutcome::Empty { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub metrics: KeyMetrics,
    pub daily_trend: Vec<DailyTotal>,
    pub category_breakdown: Vec<GroupTotal>,
    pub peak_usage: Option<PeakUsage>,
}

pub fn summary_report(records: &[EnergyRecord], filter: &ReportFilter) -> ReportOutcome<SummaryReport> {
    let selected = filter.apply(records);
    if selected.is_empty() {
        return ReportOutcome::empty();
    }

    ReportOutcome::Ready(SummaryReport {
        start: filter.start.or_else(|| selected.iter().filter_map(EnergyRecord::date).min()),
        end: filter.end.or_else(|| selected.iter().filter_map(EnergyRecord::date).max()),
        metrics: key_metrics(&selected),
        daily_trend: daily_totals(&selected),
        category_breakdown: analytics::breakdown(&selected, Dimension::Category),
        peak_usage: analytics::peak_usage(&selected),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMetric {
    TotalConsumption,
    TotalCost,
    AverageDailyConsumption,
    PeakUsage,
    CostPerKwh,
}

impl ReportMetric {
    pub const ALL: [ReportMetric; 5] = [
        ReportMetric::TotalConsumption,
        ReportMetric::TotalCost,
        ReportMetric::AverageDailyConsumption,
        ReportMetric::PeakUsage,
        ReportMetric::CostPerKwh,
    ];

    pub fn unit(&self) -> &'static str {
        match self {
            ReportMetric::TotalCost => "$",
            ReportMetric::CostPerKwh => "$/kWh",
            _ => "kWh",
        }
    }

    pub fn compute(&self, records: &[EnergyRecord]) -> f64 {
        match self {
            ReportMetric::TotalConsumption => records.iter().map(|r| r.consumption_kwh).sum(),
            ReportMetric::TotalCost => records.iter().map(|r| r.cost).sum(),
            ReportMetric::AverageDailyConsumption => {
                let daily: Vec<f64> = daily_totals(records).iter().map(|d| d.consumption).collect();
                stats::mean(&daily)
            }
            ReportMetric::PeakUsage => {
                let values: Vec<f64> = records.iter().map(|r| r.consumption_kwh).collect();
                stats::max(&values).unwrap_or(0.0)
            }
            ReportMetric::CostPerKwh => {
                let rates: Vec<f64> = records.iter().map(|r| r.rate_per_kwh).collect();
                stats::mean(&rates)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub metric: ReportMetric,
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomReport {
    pub filter: ReportFilter,
    pub metrics: Vec<MetricValue>,
    pub daily_trend: Vec<DailyTotal>,
    pub record_count: usize,
}

/// Selected metrics over the filtered records. No selection means every metric.
pub fn custom_report(
    records: &[EnergyRecord],
    filter: &ReportFilter,
    metrics: &[ReportMetric],
) -> ReportOutcome<CustomReport> {
    let selected = filter.apply(records);
    if selected.is_empty() {
        return ReportOutcome::empty();
    }

    let chosen = if metrics.is_empty() {
        &ReportMetric::ALL[..]
    } else {
        metrics
    };

    ReportOutcome::Ready(CustomReport {
        filter: filter.clone(),
        metrics: chosen
            .iter()
            .map(|metric| MetricValue {
                metric: *metric,
                value: metric.compute(&selected),
                unit: metric.unit().to_string(),
            })
            .collect(),
        daily_trend: daily_totals(&selected),
        record_count: selected.len(),
    })
}

/// Filtered records as CSV, same columns the importer reads.
pub fn export_filtered(records: &[EnergyRecord], filter: &ReportFilter) -> TwinResult<String> {
    export_csv(&filter.apply(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn records() -> Vec<EnergyRecord> {
        vec![
            EnergyRecord::new(at(1, 8), 10.0, 0.1).with_category("HVAC").with_location("Office"),
            EnergyRecord::new(at(1, 14), 4.0, 0.2).with_category("Lighting").with_location("Office"),
            EnergyRecord::new(at(2, 8), 6.0, 0.1).with_category("HVAC").with_location("Warehouse"),
            EnergyRecord::new(at(5, 20), 2.0, 0.2).with_category("Other").with_location("Warehouse"),
        ]
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    #[test]
    fn test_key_metrics() {
        let metrics = key_metrics(&records());
        assert_eq!(metrics.total_consumption, 22.0);
        // days: 14, 6, 2
        assert!((metrics.avg_daily_consumption - 22.0 / 3.0).abs() < 1e-12);
        assert!((metrics.avg_rate - 0.15).abs() < 1e-12);
        assert_eq!(metrics.record_count, 4);
    }

    #[test]
    fn test_filter_by_date_is_inclusive() {
        let filter = ReportFilter::between(date(1), date(2));
        assert_eq!(filter.apply(&records()).len(), 3);

        let mut untimed = records()[0].clone();
        untimed.timestamp = None;
        assert!(!filter.matches(&untimed));
        assert!(ReportFilter::default().matches(&untimed));
    }

    #[test]
    fn test_filter_by_category_and_location() {
        let filter = ReportFilter {
            categories: vec!["HVAC".into()],
            locations: vec!["Warehouse".into()],
            ..ReportFilter::default()
        };
        let selected = filter.apply(&records());
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].consumption_kwh, 6.0);
    }

    #[test]
    fn test_summary_report() {
        let outcome = summary_report(&records(), &ReportFilter::between(date(1), date(2)));
        let report = outcome.ready().unwrap();
        assert_eq!(report.metrics.total_consumption, 20.0);
        assert_eq!(report.daily_trend.len(), 2);
        assert_eq!(report.category_breakdown[0].key, "HVAC");
        assert_eq!(report.peak_usage.as_ref().unwrap().peak_hour, 8);
    }

    #[test]
    fn test_summary_report_outside_range_warns() {
        let outcome = summary_report(&records(), &ReportFilter::between(date(20), date(21)));
        assert!(outcome.ready().is_none());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["warning"], NO_DATA_IN_RANGE);
    }

    #[test]
    fn test_custom_report_selected_metrics() {
        let outcome = custom_report(
            &records(),
            &ReportFilter::default(),
            &[ReportMetric::PeakUsage, ReportMetric::CostPerKwh],
        );
        let report = outcome.ready().unwrap();
        assert_eq!(report.metrics.len(), 2);
        assert_eq!(report.metrics[0].value, 10.0);
        assert_eq!(report.metrics[1].unit, "$/kWh");

        let all = custom_report(&records(), &ReportFilter::default(), &[]);
        assert_eq!(all.ready().unwrap().metrics.len(), ReportMetric::ALL.len());
    }

    #[test]
    fn test_export_filtered_rows() {
        let filter = ReportFilter {
            categories: vec!["Other".into()],
            ..ReportFilter::default()
        };
        let csv = export_filtered(&records(), &filter).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.contains("Warehouse"));
    }
}
