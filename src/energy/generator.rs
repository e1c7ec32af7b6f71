use chrono::{Datelike, Duration, NaiveDateTime, Timelike};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

use crate::energy::records::{EnergyDataset, EnergyRecord, CATEGORIES};
use crate::monitoring::stats::round_to;

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_DAYS: u32 = 30;

const DEVICES: [&str; 5] = ["LED Lights", "Air Conditioner", "Computer", "Refrigerator", "Heater"];
const LOCATIONS: [&str; 4] = ["Office", "Production Floor", "Warehouse", "Break Room"];

/// Hourly synthetic consumption with a day/evening/night profile, a weekend
/// discount and a pricier late-afternoon tariff. Same seed, same dataset.
pub struct SampleDataGenerator {
    rng: StdRng,
    days: u32,
}

impl SampleDataGenerator {
    pub fn new(seed: u64, days: u32) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            days,
        }
    }

    // Box-Muller
    fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1: f64 = 1.0 - self.rng.gen::<f64>();
        let u2: f64 = self.rng.gen();
        mean + std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    fn pick(&mut self, options: &[&'static str]) -> &'static str {
        options.choose(&mut self.rng).copied().unwrap_or("Other")
    }

    fn consumption_at(&mut self, timestamp: NaiveDateTime) -> f64 {
        let base = match timestamp.hour() {
            6..=18 => self.normal(5.0, 1.5),
            19..=22 => self.normal(3.0, 1.0),
            _ => self.normal(1.0, 0.5),
        };
        let weekend = timestamp.weekday().num_days_from_monday() >= 5;
        let adjusted = if weekend { base * 0.7 } else { base };
        adjusted.max(0.1)
    }

    fn rate_at(&mut self, timestamp: NaiveDateTime) -> f64 {
        let rate = match timestamp.hour() {
            16..=20 => self.normal(0.18, 0.02),
            _ => self.normal(0.12, 0.01),
        };
        rate.max(0.08)
    }

    pub fn generate(&mut self, start: NaiveDateTime) -> EnergyDataset {
        let hours = i64::from(self.days) * 24;
        let records = (0..hours)
            .map(|offset| {
                let timestamp = start + Duration::hours(offset);
                let consumption = self.consumption_at(timestamp);
                let rate = self.rate_at(timestamp);

                let mut record = EnergyRecord::new(timestamp, round_to(consumption, 2), round_to(rate, 4))
                    .with_category(self.pick(&CATEGORIES))
                    .with_device(self.pick(&DEVICES))
                    .with_location(self.pick(&LOCATIONS))
                    .with_notes(format!(
                        "Auto-generated data for {}",
                        timestamp.format("%Y-%m-%d %H:%M")
                    ));
                record.cost = round_to(consumption * rate, 2);
                record
            })
            .collect();
        EnergyDataset::new(records)
    }
}

impl Default for SampleDataGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SEED, DEFAULT_DAYS)
    }
}
