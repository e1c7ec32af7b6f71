use chrono::{Duration, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::energy::records::{daily_totals, EnergyRecord};
use crate::errors::{TwinError, TwinResult};
use crate::monitoring::stats;

pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;
const MOVING_AVERAGE_WINDOW: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ForecastModel {
    Linear,
    Polynomial,
    MovingAverage,
}

impl fmt::Display for ForecastModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ForecastModel::Linear => "Linear Regression",
            ForecastModel::Polynomial => "Polynomial Regression",
            ForecastModel::MovingAverage => "Moving Average",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_consumption: f64,
    pub model_type: ForecastModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub avg_daily_forecast: f64,
    pub total_forecast: f64,
    pub historical_avg: f64,
    /// Percent change of the forecast mean against the historical mean.
    /// Absent when the history averages to zero.
    pub change_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub model: ForecastModel,
    pub days: u32,
    pub confidence_level: f64,
    pub points: Vec<ForecastPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ForecastSummary>,
}

impl Forecast {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastRequest {
    pub days: u32,
    pub model: ForecastModel,
    #[serde(default)]
    pub confidence_level: Option<f64>,
}

impl ForecastRequest {
    pub fn new(days: u32, model: ForecastModel) -> Self {
        Self {
            days,
            model,
            confidence_level: None,
        }
    }

    pub fn validate(&self, max_days: u32) -> TwinResult<()> {
        if self.days == 0 || self.days > max_days {
            return Err(TwinError::invalid(
                "days",
                format!("must be between 1 and {}", max_days),
            ));
        }
        if let Some(level) = self.confidence_level {
            if !(0.80..=0.99).contains(&level) {
                return Err(TwinError::invalid(
                    "confidence_level",
                    "must be between 0.80 and 0.99",
                ));
            }
        }
        Ok(())
    }
}

/// Least-squares line through `(x, y)`. Returns `(intercept, slope)`; a
/// degenerate x range gives a flat line at the mean.
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> (f64, f64) {
    let x_mean = stats::mean(xs);
    let y_mean = stats::mean(ys);
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        numerator += (x - x_mean) * (y - y_mean);
        denominator += (x - x_mean).powi(2);
    }
    if denominator == 0.0 {
        return (y_mean, 0.0);
    }
    let slope = numerator / denominator;
    (y_mean - slope * x_mean, slope)
}

/// Least-squares polynomial coefficients, constant term first. `None` when the
/// normal equations are singular.
pub fn polynomial_fit(xs: &[f64], ys: &[f64], degree: usize) -> Option<Vec<f64>> {
    let size = degree + 1;
    let mut matrix = vec![vec![0.0; size + 1]; size];
    for (x, y) in xs.iter().zip(ys) {
        let powers: Vec<f64> = (0..=2 * degree).map(|p| x.powi(p as i32)).collect();
        for row in 0..size {
            for col in 0..size {
                matrix[row][col] += powers[row + col];
            }
            matrix[row][size] += powers[row] * y;
        }
    }
    solve(matrix)
}

// Gaussian elimination with partial pivoting on an augmented matrix
fn solve(mut matrix: Vec<Vec<f64>>) -> Option<Vec<f64>> {
    let n = matrix.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&a, &b| matrix[a][col].abs().total_cmp(&matrix[b][col].abs()))?;
        if matrix[pivot][col].abs() < 1e-9 {
            return None;
        }
        matrix.swap(col, pivot);
        for row in (col + 1)..n {
            let factor = matrix[row][col] / matrix[col][col];
            for k in col..=n {
                matrix[row][k] -= factor * matrix[col][k];
            }
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| matrix[row][k] * solution[k]).sum();
        solution[row] = (matrix[row][n] - tail) / matrix[row][row];
    }
    Some(solution)
}

fn evaluate(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Projects daily consumption forward from a dataset's daily totals.
#[derive(Debug, Clone, Copy)]
pub struct ForecastEngine {
    max_days: u32,
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self { max_days: 365 }
    }
}

impl ForecastEngine {
    pub fn new(max_days: u32) -> Self {
        Self { max_days }
    }

    pub fn forecast(&self, records: &[EnergyRecord], request: &ForecastRequest) -> TwinResult<Forecast> {
        request.validate(self.max_days)?;
        let confidence_level = request.confidence_level.unwrap_or(DEFAULT_CONFIDENCE_LEVEL);

        let daily = daily_totals(records);
        let Some(last) = daily.last() else {
            return Ok(Forecast {
                model: request.model,
                days: request.days,
                confidence_level,
                points: Vec::new(),
                summary: None,
            });
        };
        let last_date = last.date;

        let history: Vec<f64> = daily.iter().map(|d| d.consumption).collect();
        let predictions = project(&history, request.days as usize, request.model);

        let points: Vec<ForecastPoint> = predictions
            .iter()
            .enumerate()
            .map(|(offset, value)| ForecastPoint {
                date: last_date + Duration::days(offset as i64 + 1),
                predicted_consumption: value.max(0.0),
                model_type: request.model,
            })
            .collect();

        let forecast_values: Vec<f64> = points.iter().map(|p| p.predicted_consumption).collect();
        let avg_daily_forecast = stats::mean(&forecast_values);
        let historical_avg = stats::mean(&history);
        let change_pct = (historical_avg != 0.0)
            .then(|| (avg_daily_forecast - historical_avg) / historical_avg * 100.0);

        debug!(
            model = %request.model,
            history_days = history.len(),
            days = request.days,
            "Generated forecast"
        );

        Ok(Forecast {
            model: request.model,
            days: request.days,
            confidence_level,
            points,
            summary: Some(ForecastSummary {
                avg_daily_forecast,
                total_forecast: forecast_values.iter().sum(),
                historical_avg,
                change_pct,
            }),
        })
    }
}

/// Raw (unclamped) predictions for day indices `n..n + days`.
fn project(history: &[f64], days: usize, model: ForecastModel) -> Vec<f64> {
    let n = history.len();
    let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let future = (n..n + days).map(|i| i as f64);

    match model {
        ForecastModel::Linear => {
            let (intercept, slope) = linear_fit(&xs, history);
            future.map(|x| intercept + slope * x).collect()
        }
        ForecastModel::Polynomial => match polynomial_fit(&xs, history, 2) {
            Some(coefficients) => future.map(|x| evaluate(&coefficients, x)).collect(),
            None => project(history, days, ForecastModel::Linear),
        },
        ForecastModel::MovingAverage => {
            let window = MOVING_AVERAGE_WINDOW.min(n);
            let level = stats::mean(&history[n - window..]);
            vec![level; days]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn day(offset: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            + Duration::days(offset)
    }

    fn series(values: &[f64]) -> Vec<EnergyRecord> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| EnergyRecord::new(day(i as i64), *v, 0.1))
            .collect()
    }

    #[test]
    fn test_linear_series_extends() {
        let values: Vec<f64> = (1..=30).map(f64::from).collect();
        let forecast = ForecastEngine::default()
            .forecast(&series(&values), &ForecastRequest::new(1, ForecastModel::Linear))
            .unwrap();

        assert_eq!(forecast.points.len(), 1);
        assert!((forecast.points[0].predicted_consumption - 31.0).abs() < 1e-9);
        assert_eq!(forecast.points[0].date, day(30).date());
    }

    #[test]
    fn test_polynomial_recovers_quadratic() {
        let values: Vec<f64> = (0..10).map(|x| f64::from(x * x) + 1.0).collect();
        let forecast = ForecastEngine::default()
            .forecast(&series(&values), &ForecastRequest::new(2, ForecastModel::Polynomial))
            .unwrap();

        assert!((forecast.points[0].predicted_consumption - 101.0).abs() < 1e-6);
        assert!((forecast.points[1].predicted_consumption - 122.0).abs() < 1e-6);
    }

    #[test]
    fn test_polynomial_with_two_days_falls_back_to_linear() {
        let forecast = ForecastEngine::default()
            .forecast(&series(&[2.0, 4.0]), &ForecastRequest::new(1, ForecastModel::Polynomial))
            .unwrap();
        assert!((forecast.points[0].predicted_consumption - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_moving_average_uses_last_week() {
        let mut values = vec![100.0; 3];
        values.extend([7.0; 7]);
        let forecast = ForecastEngine::default()
            .forecast(&series(&values), &ForecastRequest::new(3, ForecastModel::MovingAverage))
            .unwrap();

        assert!(forecast.points.iter().all(|p| (p.predicted_consumption - 7.0).abs() < 1e-12));
        let summary = forecast.summary.unwrap();
        assert!((summary.total_forecast - 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_predictions_are_clamped() {
        let values: Vec<f64> = (0..10).map(|x| 50.0 - 10.0 * f64::from(x)).map(|v| v.max(0.0)).collect();
        let forecast = ForecastEngine::default()
            .forecast(&series(&values), &ForecastRequest::new(30, ForecastModel::Linear))
            .unwrap();
        assert!(forecast.points.iter().all(|p| p.predicted_consumption >= 0.0));
        assert_eq!(forecast.points.last().unwrap().predicted_consumption, 0.0);
    }

    #[test]
    fn test_empty_history_gives_empty_forecast() {
        let forecast = ForecastEngine::default()
            .forecast(&[], &ForecastRequest::new(10, ForecastModel::Linear))
            .unwrap();
        assert!(forecast.is_empty());
        assert!(forecast.summary.is_none());
    }

    #[test]
    fn test_request_validation() {
        let engine = ForecastEngine::default();
        let records = series(&[1.0, 2.0]);
        assert!(engine
            .forecast(&records, &ForecastRequest::new(0, ForecastModel::Linear))
            .is_err());
        assert!(engine
            .forecast(&records, &ForecastRequest::new(366, ForecastModel::Linear))
            .is_err());

        let mut request = ForecastRequest::new(5, ForecastModel::Linear);
        request.confidence_level = Some(0.5);
        assert!(engine.forecast(&records, &request).is_err());

        request.confidence_level = Some(0.9);
        assert_eq!(engine.forecast(&records, &request).unwrap().confidence_level, 0.9);
    }

    #[test]
    fn test_change_from_historical() {
        let forecast = ForecastEngine::default()
            .forecast(&series(&[10.0; 5]), &ForecastRequest::new(3, ForecastModel::MovingAverage))
            .unwrap();
        let summary = forecast.summary.unwrap();
        assert_eq!(summary.historical_avg, 10.0);
        assert_eq!(summary.change_pct, Some(0.0));
    }
}
