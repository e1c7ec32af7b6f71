use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::errors::{TwinError, TwinResult};
use crate::twin::models::lenient_number;

pub const CATEGORIES: [&str; 4] = ["Lighting", "HVAC", "Equipment", "Other"];

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parses the timestamp shapes found in exported energy sheets. Offsets are dropped,
/// keeping the wall-clock time; a bare date reads as midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Some(with_offset.naive_local());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyRecord {
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub consumption_kwh: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rate_per_kwh: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cost: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub notes: String,
}

impl EnergyRecord {
    pub fn new(timestamp: NaiveDateTime, consumption_kwh: f64, rate_per_kwh: f64) -> Self {
        Self {
            timestamp: Some(timestamp),
            consumption_kwh,
            rate_per_kwh,
            cost: consumption_kwh * rate_per_kwh,
            category: String::new(),
            device: String::new(),
            location: String::new(),
            notes: String::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.timestamp.map(|t| t.date())
    }
}

/// A manual entry; cost is derived from consumption and rate.
#[derive(Debug, Clone, Deserialize)]
pub struct ManualEntry {
    pub timestamp: NaiveDateTime,
    pub consumption_kwh: f64,
    pub rate_per_kwh: f64,
    pub category: String,
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub notes: String,
}

impl ManualEntry {
    pub fn validate(&self) -> TwinResult<()> {
        if self.consumption_kwh < 0.0 {
            return Err(TwinError::invalid("consumption_kwh", "must not be negative"));
        }
        if self.rate_per_kwh < 0.0 {
            return Err(TwinError::invalid("rate_per_kwh", "must not be negative"));
        }
        Ok(())
    }
}

/// Caller-owned table of energy records. Every analysis takes one of these (or a
/// slice of its records) explicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnergyDataset {
    records: Vec<EnergyRecord>,
}

impl EnergyDataset {
    pub fn new(records: Vec<EnergyRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[EnergyRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<EnergyRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn add_entry(&mut self, entry: ManualEntry) -> TwinResult<&EnergyRecord> {
        entry.validate()?;
        let record = EnergyRecord::new(entry.timestamp, entry.consumption_kwh, entry.rate_per_kwh)
            .with_category(entry.category)
            .with_device(entry.device)
            .with_location(entry.location)
            .with_notes(entry.notes);
        self.records.push(record);
        Ok(&self.records[self.records.len() - 1])
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = EnergyRecord>) {
        self.records.extend(records);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub consumption: f64,
    pub cost: f64,
}

/// Per-day consumption and cost, sorted by date. Records without a timestamp are skipped.
pub fn daily_totals(records: &[EnergyRecord]) -> Vec<DailyTotal> {
    let mut by_day: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
    for record in records {
        if let Some(date) = record.date() {
            let entry = by_day.entry(date).or_insert((0.0, 0.0));
            entry.0 += record.consumption_kwh;
            entry.1 += record.cost;
        }
    }
    by_day
        .into_iter()
        .map(|(date, (consumption, cost))| DailyTotal {
            date,
            consumption,
            cost,
        })
        .collect()
}
