use chrono::{Days, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::errors::{TwinError, TwinResult};

pub const DEFAULT_HOURS_PER_DAY: f64 = 8.0;
pub const DEFAULT_DAYS: u32 = 30;
pub const BILLING_DAYS: f64 = 30.0;
/// Longest costing period, ten years of daily rows.
pub const MAX_DAYS: u32 = 3650;

/// Typical power draw in kW.
pub const APPLIANCES: [(&str, f64); 15] = [
    ("LED Light Bulb (10W)", 0.01),
    ("CFL Light Bulb (15W)", 0.015),
    ("Incandescent Bulb (60W)", 0.06),
    ("Desktop Computer", 0.3),
    ("Laptop", 0.05),
    ("Refrigerator", 0.15),
    ("Air Conditioner (1 Ton)", 1.5),
    ("Washing Machine", 0.5),
    ("Microwave", 1.2),
    ("Television (LED 32\")", 0.08),
    ("Water Heater", 3.0),
    ("Dishwasher", 1.8),
    ("Hair Dryer", 1.5),
    ("Vacuum Cleaner", 1.4),
    ("Electric Kettle", 2.0),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appliance {
    pub name: String,
    pub power_kw: f64,
}

pub fn catalog() -> Vec<Appliance> {
    APPLIANCES
        .iter()
        .map(|(name, power_kw)| Appliance {
            name: name.to_string(),
            power_kw: *power_kw,
        })
        .collect()
}

pub fn catalog_power(name: &str) -> Option<f64> {
    APPLIANCES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .map(|(_, power)| *power)
}

fn default_hours() -> f64 {
    DEFAULT_HOURS_PER_DAY
}

fn default_quantity() -> u32 {
    1
}

/// One appliance line. `power_kw` falls back to the catalog value when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplianceUsage {
    pub appliance: String,
    #[serde(default)]
    pub power_kw: Option<f64>,
    #[serde(default = "default_hours")]
    pub hours_per_day: f64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl ApplianceUsage {
    pub fn new(appliance: impl Into<String>, hours_per_day: f64) -> Self {
        Self {
            appliance: appliance.into(),
            power_kw: None,
            hours_per_day,
            quantity: 1,
        }
    }

    pub fn power(&self) -> TwinResult<f64> {
        match self.power_kw {
            Some(power) if power < 0.0 => Err(TwinError::invalid("power_kw", "must not be negative")),
            Some(power) => Ok(power),
            None => catalog_power(&self.appliance).ok_or_else(|| {
                TwinError::invalid(
                    "appliance",
                    format!("unknown appliance '{}'; provide power_kw", self.appliance),
                )
            }),
        }
    }

    pub fn validate(&self) -> TwinResult<()> {
        if !(0.0..=24.0).contains(&self.hours_per_day) {
            return Err(TwinError::invalid("hours_per_day", "must be between 0 and 24"));
        }
        if self.quantity == 0 {
            return Err(TwinError::invalid("quantity", "must be at least 1"));
        }
        self.power().map(|_| ())
    }

    pub fn daily_consumption(&self) -> TwinResult<f64> {
        Ok(self.power()? * self.hours_per_day * f64::from(self.quantity))
    }
}

fn validate_days(days: u32) -> TwinResult<()> {
    if !(1..=MAX_DAYS).contains(&days) {
        return Err(TwinError::invalid(
            "days",
            format!("must be between 1 and {}", MAX_DAYS),
        ));
    }
    Ok(())
}

fn validate_period(days: u32, rate_per_kwh: f64) -> TwinResult<()> {
    validate_days(days)?;
    if rate_per_kwh < 0.0 {
        return Err(TwinError::invalid("rate_per_kwh", "must not be negative"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplianceCost {
    pub appliance: String,
    pub power_kw: f64,
    pub hours_per_day: f64,
    pub quantity: u32,
    pub daily_consumption: f64,
    pub total_consumption: f64,
    pub daily_cost: f64,
    pub total_cost: f64,
}

pub fn appliance_cost(usage: &ApplianceUsage, days: u32, rate_per_kwh: f64) -> TwinResult<ApplianceCost> {
    usage.validate()?;
    validate_period(days, rate_per_kwh)?;

    let daily_consumption = usage.daily_consumption()?;
    let total_consumption = daily_consumption * f64::from(days);
    Ok(ApplianceCost {
        appliance: usage.appliance.clone(),
        power_kw: usage.power()?,
        hours_per_day: usage.hours_per_day,
        quantity: usage.quantity,
        daily_consumption,
        total_consumption,
        daily_cost: daily_consumption * rate_per_kwh,
        total_cost: total_consumption * rate_per_kwh,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionDay {
    pub date: NaiveDate,
    pub daily_cost: f64,
    pub cumulative_cost: f64,
}

/// Flat daily cost accumulated over `days` starting at `start`.
pub fn cost_projection(daily_cost: f64, days: u32, start: NaiveDate) -> TwinResult<Vec<ProjectionDay>> {
    validate_days(days)?;
    (0..days)
        .map(|offset| {
            let date = start
                .checked_add_days(Days::new(u64::from(offset)))
                .ok_or_else(|| TwinError::invalid("days", "projection runs past the last supported date"))?;
            Ok(ProjectionDay {
                date,
                daily_cost,
                cumulative_cost: daily_cost * f64::from(offset + 1),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplianceListSummary {
    pub items: Vec<ApplianceCost>,
    pub total_daily_consumption: f64,
    pub total_daily_cost: f64,
    pub total_consumption: f64,
    pub total_cost: f64,
}

/// A household's appliance list, priced together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplianceList {
    pub items: Vec<ApplianceUsage>,
}

impl ApplianceList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, usage: ApplianceUsage) -> TwinResult<()> {
        usage.validate()?;
        self.items.push(usage);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn summarize(&self, days: u32, rate_per_kwh: f64) -> TwinResult<ApplianceListSummary> {
        let items = self
            .items
            .iter()
            .map(|usage| appliance_cost(usage, days, rate_per_kwh))
            .collect::<TwinResult<Vec<_>>>()?;

        Ok(ApplianceListSummary {
            total_daily_consumption: items.iter().map(|i| i.daily_consumption).sum(),
            total_daily_cost: items.iter().map(|i| i.daily_cost).sum(),
            total_consumption: items.iter().map(|i| i.total_consumption).sum(),
            total_cost: items.iter().map(|i| i.total_cost).sum(),
            items,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum HomeType {
    Apartment,
    Condo,
    House,
}

impl HomeType {
    pub fn multiplier(&self) -> f64 {
        match self {
            HomeType::Apartment => 0.8,
            HomeType::Condo => 0.9,
            HomeType::House => 1.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum ClimateZone {
    Hot,
    Moderate,
    Cold,
}

impl ClimateZone {
    pub fn adjustment(&self) -> f64 {
        match self {
            ClimateZone::Hot => 1.3,
            ClimateZone::Moderate => 1.0,
            ClimateZone::Cold => 1.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TariffRates {
    pub base_rate: f64,
    pub peak_rate: f64,
    pub off_peak_rate: f64,
}

impl Default for TariffRates {
    fn default() -> Self {
        Self {
            base_rate: 0.12,
            peak_rate: 0.18,
            off_peak_rate: 0.08,
        }
    }
}

/// Household size 6 and above share the largest bracket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BillRequest {
    pub household_size: u8,
    pub home_type: HomeType,
    pub climate_zone: ClimateZone,
    #[serde(default)]
    pub rates: TariffRates,
}

impl BillRequest {
    pub fn base_daily_consumption(&self) -> TwinResult<f64> {
        let base = match self.household_size {
            0 => return Err(TwinError::invalid("household_size", "must be at least 1")),
            1 => 15.0,
            2 => 25.0,
            3 => 35.0,
            4 => 45.0,
            5 => 55.0,
            _ => 65.0,
        };
        Ok(base * self.home_type.multiplier())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateBand {
    pub rate_type: String,
    pub consumption_kwh: f64,
    pub rate_per_kwh: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsTip {
    pub tip: String,
    pub savings: String,
    pub potential_monthly_savings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillEstimate {
    pub estimated_daily_kwh: f64,
    pub estimated_monthly_kwh: f64,
    pub estimated_bill: f64,
    pub average_rate: f64,
    pub breakdown: Vec<RateBand>,
    pub recommendations: Vec<SavingsTip>,
    pub total_monthly_savings: f64,
    pub annual_savings: f64,
}

// (tip, claimed savings, share of the monthly bill)
const SAVINGS_TIPS: [(&str, &str, f64); 5] = [
    ("Switch to LED bulbs", "Up to 75% lighting cost reduction", 0.15),
    ("Use programmable thermostat", "10-15% heating/cooling cost reduction", 0.12),
    ("Unplug devices when not in use", "5-10% total bill reduction", 0.075),
    ("Use energy-efficient appliances", "20-30% appliance cost reduction", 0.25),
    ("Optimize peak hour usage", "15-20% bill reduction", 0.175),
];

pub fn savings_recommendations(monthly_bill: f64) -> Vec<SavingsTip> {
    SAVINGS_TIPS
        .iter()
        .map(|(tip, savings, share)| SavingsTip {
            tip: tip.to_string(),
            savings: savings.to_string(),
            potential_monthly_savings: monthly_bill * share,
        })
        .collect()
}

/// Monthly bill from household characteristics, split 30% peak, 20% off-peak
/// and 50% base.
pub fn estimate_bill(request: &BillRequest) -> TwinResult<BillEstimate> {
    let rates = request.rates;
    if rates.base_rate < 0.0 || rates.peak_rate < 0.0 || rates.off_peak_rate < 0.0 {
        return Err(TwinError::invalid("rates", "must not be negative"));
    }

    let daily = request.base_daily_consumption()? * request.climate_zone.adjustment();
    let monthly = daily * BILLING_DAYS;

    let breakdown: Vec<RateBand> = [
        ("Peak Hours", 0.3, rates.peak_rate),
        ("Off-Peak Hours", 0.2, rates.off_peak_rate),
        ("Base Hours", 0.5, rates.base_rate),
    ]
    .iter()
    .map(|(rate_type, share, rate)| RateBand {
        rate_type: rate_type.to_string(),
        consumption_kwh: monthly * share,
        rate_per_kwh: *rate,
        cost: monthly * share * rate,
    })
    .collect();

    let estimated_bill: f64 = breakdown.iter().map(|band| band.cost).sum();
    let recommendations = savings_recommendations(estimated_bill);
    let total_monthly_savings: f64 = recommendations
        .iter()
        .map(|tip| tip.potential_monthly_savings)
        .sum();

    Ok(BillEstimate {
        estimated_daily_kwh: daily,
        estimated_monthly_kwh: monthly,
        estimated_bill,
        average_rate: if monthly > 0.0 { estimated_bill / monthly } else { 0.0 },
        breakdown,
        recommendations,
        total_monthly_savings,
        annual_savings: total_monthly_savings * 12.0,
    })
}
