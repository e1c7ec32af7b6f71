use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::monitoring::{AnomalyRecord, MaintenancePrediction, PerformanceReport};

/// One cutting operation as reported by a machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub cutting_time: f64,
    pub spindle_speed: f64,
    pub feed_rate: f64,
    pub machine_id: String,
}

/// Stored form of a sample. Fields the twin does not know about are kept as-is
/// and handed back on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuttingDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub machine_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cutting_time: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub spindle_speed: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub feed_rate: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CuttingDocument {
    pub fn sample(&self) -> Sample {
        Sample {
            timestamp: self.timestamp,
            cutting_time: self.cutting_time,
            spindle_speed: self.spindle_speed,
            feed_rate: self.feed_rate,
            machine_id: self.machine_id.clone(),
        }
    }
}

/// Ingestion payload. Any client timestamp is ignored; the store stamps its own.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewCuttingData {
    #[serde(default, deserialize_with = "lenient_string")]
    pub machine_id: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cutting_time: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub spindle_speed: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub feed_rate: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewCuttingData {
    pub fn into_document(mut self, id: String, timestamp: DateTime<Utc>) -> CuttingDocument {
        self.extra.remove("timestamp");
        self.extra.remove("_id");
        CuttingDocument {
            id,
            machine_id: self.machine_id,
            timestamp,
            cutting_time: self.cutting_time,
            spindle_speed: self.spindle_speed,
            feed_rate: self.feed_rate,
            extra: self.extra,
        }
    }
}

/// Numbers, numeric strings and booleans are accepted; anything else reads as 0.
pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(b)),
        _ => 0.0,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineState {
    Active,
    Idle,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineStatus {
    pub status: MachineState,
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_cutting_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spindle_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_rate: Option<f64>,
}

impl MachineStatus {
    pub fn offline() -> Self {
        Self {
            status: MachineState::Offline,
            last_seen: None,
            current_cutting_time: None,
            spindle_speed: None,
            feed_rate: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineSummary {
    pub id: String,
    pub name: String,
    pub status: MachineState,
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub timestamps: Vec<DateTime<Utc>>,
    pub cutting_times: Vec<f64>,
    pub spindle_speeds: Vec<f64>,
    pub feed_rates: Vec<f64>,
}

impl TimeSeries {
    pub fn from_samples(samples: &[Sample]) -> Self {
        Self {
            timestamps: samples.iter().map(|s| s.timestamp).collect(),
            cutting_times: samples.iter().map(|s| s.cutting_time).collect(),
            spindle_speeds: samples.iter().map(|s| s.spindle_speed).collect(),
            feed_rates: samples.iter().map(|s| s.feed_rate).collect(),
        }
    }
}

/// Derived snapshot for one machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwinState {
    pub machine_id: String,
    pub status: MachineStatus,
    pub metrics: PerformanceReport,
    pub time_series: TimeSeries,
    pub maintenance_prediction: MaintenancePrediction,
    pub anomalies: Vec<AnomalyRecord>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertResponse {
    pub success: bool,
    pub id: String,
}
