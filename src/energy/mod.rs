pub mod analytics;
pub mod calculator;
pub mod forecast;
pub mod generator;
pub mod import;
pub mod records;
pub mod reports;

pub use analytics::{analyze, AnalyticsBundle, Dimension};
pub use calculator::{ApplianceList, ApplianceUsage, BillRequest};
pub use forecast::{Forecast, ForecastEngine, ForecastModel, ForecastRequest};
pub use generator::SampleDataGenerator;
pub use import::{export_csv, import_csv, import_file};
pub use records::{EnergyDataset, EnergyRecord, ManualEntry};
pub use reports::{ReportFilter, ReportMetric};
