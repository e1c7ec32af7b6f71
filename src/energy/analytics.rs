use chrono::{Datelike, NaiveDate, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::energy::records::{daily_totals, EnergyRecord};
use crate::monitoring::stats;

pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Category,
    Device,
    Location,
}

impl Dimension {
    fn key<'a>(&self, record: &'a EnergyRecord) -> &'a str {
        match self {
            Dimension::Category => &record.category,
            Dimension::Device => &record.device,
            Dimension::Location => &record.location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyStat {
    pub hour: u32,
    pub avg_consumption: f64,
    pub std_consumption: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayAverage {
    pub day: String,
    pub avg_consumption: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotal {
    pub month: String,
    pub consumption: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapCell {
    pub hour: u32,
    pub day: String,
    pub avg_consumption: f64,
}

/// Consumption summed per ISO week and weekday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyCell {
    pub year: i32,
    pub week: u32,
    pub day: String,
    pub consumption: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPeak {
    pub date: NaiveDate,
    pub peak_consumption: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyEfficiency {
    pub date: NaiveDate,
    pub total_consumption: f64,
    pub avg_consumption: f64,
    pub std_consumption: f64,
    pub total_cost: f64,
    pub efficiency_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakUsage {
    pub peak_hour: u32,
    pub peak_consumption: f64,
    pub lowest_hour: u32,
    pub lowest_consumption: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupTotal {
    pub key: String,
    pub total_consumption: f64,
    pub avg_consumption: f64,
    pub peak_consumption: f64,
    pub usage_count: usize,
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_cost: f64,
    pub avg_daily_cost: f64,
    pub max_daily_cost: f64,
    pub min_daily_cost: f64,
    pub std_daily_cost: Option<f64>,
    pub avg_rate: f64,
}

/// Everything the analytics page shows for one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsBundle {
    pub weekday_pattern: Vec<WeekdayAverage>,
    pub monthly_trend: Vec<MonthlyTotal>,
    pub hourly_profile: Vec<HourlyStat>,
    pub heatmap: Vec<HeatmapCell>,
    pub weekly_heatmap: Vec<WeeklyCell>,
    pub daily_efficiency: Vec<DailyEfficiency>,
    pub peak_usage: Option<PeakUsage>,
    pub daily_peaks: Vec<DailyPeak>,
    pub cost_summary: Option<CostSummary>,
    pub by_category: Vec<GroupTotal>,
    pub by_device: Vec<GroupTotal>,
    pub by_location: Vec<GroupTotal>,
}

pub fn analyze(records: &[EnergyRecord]) -> AnalyticsBundle {
    AnalyticsBundle {
        weekday_pattern: weekday_pattern(records),
        monthly_trend: monthly_totals(records),
        hourly_profile: hourly_profile(records),
        heatmap: hourly_heatmap(records),
        weekly_heatmap: weekly_heatmap(records),
        daily_efficiency: daily_efficiency(records),
        peak_usage: peak_usage(records),
        daily_peaks: daily_peaks(records),
        cost_summary: cost_summary(records),
        by_category: breakdown(records, Dimension::Category),
        by_device: breakdown(records, Dimension::Device),
        by_location: breakdown(records, Dimension::Location),
    }
}

fn hourly_values(records: &[EnergyRecord]) -> BTreeMap<u32, Vec<f64>> {
    let mut by_hour: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for record in records {
        if let Some(ts) = record.timestamp {
            by_hour.entry(ts.hour()).or_default().push(record.consumption_kwh);
        }
    }
    by_hour
}

pub fn hourly_profile(records: &[EnergyRecord]) -> Vec<HourlyStat> {
    hourly_values(records)
        .into_iter()
        .map(|(hour, values)| HourlyStat {
            hour,
            avg_consumption: stats::mean(&values),
            std_consumption: stats::sample_std(&values),
        })
        .collect()
}

/// Mean consumption per weekday, Monday first. Days with no records carry `None`.
pub fn weekday_pattern(records: &[EnergyRecord]) -> Vec<WeekdayAverage> {
    let mut by_day: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for record in records {
        if let Some(ts) = record.timestamp {
            by_day
                .entry(ts.weekday().num_days_from_monday())
                .or_default()
                .push(record.consumption_kwh);
        }
    }

    WEEKDAYS
        .iter()
        .map(|day| WeekdayAverage {
            day: weekday_name(*day).to_string(),
            avg_consumption: by_day
                .get(&day.num_days_from_monday())
                .map(|values| stats::mean(values)),
        })
        .collect()
}

pub fn monthly_totals(records: &[EnergyRecord]) -> Vec<MonthlyTotal> {
    let mut by_month: BTreeMap<(i32, u32), (f64, f64)> = BTreeMap::new();
    for record in records {
        if let Some(ts) = record.timestamp {
            let entry = by_month.entry((ts.year(), ts.month())).or_insert((0.0, 0.0));
            entry.0 += record.consumption_kwh;
            entry.1 += record.cost;
        }
    }
    by_month
        .into_iter()
        .map(|((year, month), (consumption, cost))| MonthlyTotal {
            month: format!("{:04}-{:02}", year, month),
            consumption,
            cost,
        })
        .collect()
}

/// Mean consumption for each (hour, weekday) pair that has data.
pub fn hourly_heatmap(records: &[EnergyRecord]) -> Vec<HeatmapCell> {
    let mut cells: BTreeMap<(u32, u32), Vec<f64>> = BTreeMap::new();
    for record in records {
        if let Some(ts) = record.timestamp {
            cells
                .entry((ts.hour(), ts.weekday().num_days_from_monday()))
                .or_default()
                .push(record.consumption_kwh);
        }
    }
    cells
        .into_iter()
        .map(|((hour, day), values)| HeatmapCell {
            hour,
            day: weekday_name(WEEKDAYS[day as usize]).to_string(),
            avg_consumption: stats::mean(&values),
        })
        .collect()
}

/// Ordered by ISO year, week, then Monday to Sunday.
pub fn weekly_heatmap(records: &[EnergyRecord]) -> Vec<WeeklyCell> {
    let mut cells: BTreeMap<(i32, u32, u32), f64> = BTreeMap::new();
    for record in records {
        if let Some(ts) = record.timestamp {
            let week = ts.iso_week();
            *cells
                .entry((week.year(), week.week(), ts.weekday().num_days_from_monday()))
                .or_default() += record.consumption_kwh;
        }
    }
    cells
        .into_iter()
        .map(|((year, week, day), consumption)| WeeklyCell {
            year,
            week,
            day: weekday_name(WEEKDAYS[day as usize]).to_string(),
            consumption,
        })
        .collect()
}

pub fn daily_peaks(records: &[EnergyRecord]) -> Vec<DailyPeak> {
    let mut peaks: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in records {
        if let Some(date) = record.date() {
            peaks
                .entry(date)
                .and_modify(|peak| *peak = peak.max(record.consumption_kwh))
                .or_insert(record.consumption_kwh);
        }
    }
    peaks
        .into_iter()
        .map(|(date, peak_consumption)| DailyPeak {
            date,
            peak_consumption,
        })
        .collect()
}

/// Per-day stats rounded to two places; the score is mean over deviation and
/// is 0 when the day has no measurable spread.
pub fn daily_efficiency(records: &[EnergyRecord]) -> Vec<DailyEfficiency> {
    let mut by_day: BTreeMap<NaiveDate, (Vec<f64>, f64)> = BTreeMap::new();
    for record in records {
        if let Some(date) = record.date() {
            let entry = by_day.entry(date).or_insert_with(|| (Vec::new(), 0.0));
            entry.0.push(record.consumption_kwh);
            entry.1 += record.cost;
        }
    }

    by_day
        .into_iter()
        .map(|(date, (values, cost))| {
            let total = stats::round_to(values.iter().sum(), 2);
            let avg = stats::round_to(stats::mean(&values), 2);
            let std = stats::sample_std(&values).map(|s| stats::round_to(s, 2)).unwrap_or(0.0);
            DailyEfficiency {
                date,
                total_consumption: total,
                avg_consumption: avg,
                std_consumption: std,
                total_cost: stats::round_to(cost, 2),
                efficiency_score: if std > 0.0 { avg / std } else { 0.0 },
            }
        })
        .collect()
}

pub fn peak_usage(records: &[EnergyRecord]) -> Option<PeakUsage> {
    let profile = hourly_profile(records);
    let peak = profile
        .iter()
        .max_by(|a, b| a.avg_consumption.total_cmp(&b.avg_consumption))?;
    let lowest = profile
        .iter()
        .min_by(|a, b| a.avg_consumption.total_cmp(&b.avg_consumption))?;

    Some(PeakUsage {
        peak_hour: peak.hour,
        peak_consumption: peak.avg_consumption,
        lowest_hour: lowest.hour,
        lowest_consumption: lowest.avg_consumption,
    })
}

/// Totals grouped by one record dimension, largest consumer first.
pub fn breakdown(records: &[EnergyRecord], dimension: Dimension) -> Vec<GroupTotal> {
    let mut groups: BTreeMap<&str, (Vec<f64>, f64)> = BTreeMap::new();
    for record in records {
        let entry = groups
            .entry(dimension.key(record))
            .or_insert_with(|| (Vec::new(), 0.0));
        entry.0.push(record.consumption_kwh);
        entry.1 += record.cost;
    }

    let mut totals: Vec<GroupTotal> = groups
        .into_iter()
        .map(|(key, (values, cost))| GroupTotal {
            key: key.to_string(),
            total_consumption: values.iter().sum(),
            avg_consumption: stats::mean(&values),
            peak_consumption: stats::max(&values).unwrap_or(0.0),
            usage_count: values.len(),
            total_cost: cost,
        })
        .collect();
    totals.sort_by(|a, b| b.total_consumption.total_cmp(&a.total_consumption));
    totals
}

pub fn cost_summary(records: &[EnergyRecord]) -> Option<CostSummary> {
    if records.is_empty() {
        return None;
    }
    let daily: Vec<f64> = daily_totals(records).iter().map(|d| d.cost).collect();
    let rates: Vec<f64> = records.iter().map(|r| r.rate_per_kwh).collect();

    Some(CostSummary {
        total_cost: records.iter().map(|r| r.cost).sum(),
        avg_daily_cost: stats::mean(&daily),
        max_daily_cost: stats::max(&daily).unwrap_or(0.0),
        min_daily_cost: stats::min(&daily).unwrap_or(0.0),
        std_daily_cost: stats::sample_std(&daily),
        avg_rate: stats::mean(&rates),
    })
}
