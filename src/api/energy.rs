use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::routes::AppState;
use crate::energy::analytics::{analyze, AnalyticsBundle};
use crate::energy::calculator::{
    self, appliance_cost, cost_projection, estimate_bill, Appliance, ApplianceCost,
    ApplianceList, ApplianceListSummary, ApplianceUsage, BillEstimate, BillRequest, ProjectionDay,
};
use crate::energy::forecast::{Forecast, ForecastModel, ForecastRequest};
use crate::energy::generator::{self, SampleDataGenerator};
use crate::energy::import::{import_csv_str, import_xlsx, XLSX_CONTENT_TYPE};
use crate::energy::records::{EnergyDataset, EnergyRecord, ManualEntry};
use crate::energy::reports::{
    custom_report, export_filtered, key_metrics, summary_report, CustomReport, KeyMetrics,
    ReportFilter, ReportMetric, ReportOutcome, SummaryReport,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/energy/import", post(import_records))
        .route("/api/energy/entries", post(add_entry))
        .route("/api/energy/sample", get(sample_data))
        .route("/api/energy/summary", post(dashboard_summary))
        .route("/api/energy/forecast", post(forecast))
        .route("/api/energy/report", post(report))
        .route("/api/energy/export", post(export))
        .route("/api/energy/analytics", post(analytics))
        .route("/api/energy/appliances", get(appliances))
        .route("/api/energy/calculator/appliance", post(calculate_appliance))
        .route("/api/energy/calculator/appliances", post(calculate_appliances))
        .route("/api/energy/calculator/bill", post(calculate_bill))
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub count: usize,
    pub records: Vec<EnergyRecord>,
}

#[derive(Debug, Deserialize)]
pub struct DatasetBody {
    #[serde(default)]
    pub records: EnergyDataset,
}

#[derive(Debug, Deserialize)]
pub struct EntryBody {
    #[serde(default)]
    pub records: EnergyDataset,
    pub entry: ManualEntry,
}

#[derive(Debug, Deserialize)]
pub struct SampleParams {
    pub days: Option<u32>,
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastBody {
    #[serde(default)]
    pub records: EnergyDataset,
    pub days: u32,
    pub model: ForecastModel,
    #[serde(default)]
    pub confidence_level: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ReportBody {
    #[serde(default)]
    pub records: EnergyDataset,
    #[serde(default)]
    pub filter: ReportFilter,
    #[serde(default)]
    pub metrics: Vec<ReportMetric>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub summary: ReportOutcome<SummaryReport>,
    pub custom: ReportOutcome<CustomReport>,
}

#[derive(Debug, Deserialize)]
pub struct ApplianceBody {
    #[serde(flatten)]
    pub usage: ApplianceUsage,
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub rate_per_kwh: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ApplianceResponse {
    #[serde(flatten)]
    pub cost: ApplianceCost,
    pub projection: Vec<ProjectionDay>,
}

#[derive(Debug, Deserialize)]
pub struct ApplianceListBody {
    pub items: Vec<ApplianceUsage>,
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub rate_per_kwh: Option<f64>,
}

/// CSV text by default; a workbook when sent with the XLSX content type.
async fn import_records(headers: HeaderMap, body: Bytes) -> ApiResult<Json<ImportResponse>> {
    let is_workbook = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with(XLSX_CONTENT_TYPE));

    let records = if is_workbook {
        import_xlsx(std::io::Cursor::new(body.to_vec()))?
    } else {
        let text = std::str::from_utf8(&body)
            .map_err(|_| ApiError::bad_request("CSV upload must be UTF-8 text"))?;
        import_csv_str(text)?
    };
    info!(records = records.len(), "Imported energy records");
    Ok(Json(ImportResponse {
        count: records.len(),
        records,
    }))
}

async fn add_entry(
    payload: Result<Json<EntryBody>, JsonRejection>,
) -> ApiResult<Json<ImportResponse>> {
    let Json(EntryBody { mut records, entry }) = payload?;
    records.add_entry(entry)?;
    Ok(Json(ImportResponse {
        count: records.len(),
        records: records.into_records(),
    }))
}

async fn sample_data(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SampleParams>,
) -> ApiResult<Json<ImportResponse>> {
    let days = params.days.unwrap_or(generator::DEFAULT_DAYS);
    let max_days = state.settings.energy.forecast_max_days;
    if days == 0 || days > max_days {
        return Err(ApiError::bad_request(format!(
            "days must be between 1 and {}",
            max_days
        )));
    }

    let start = (Utc::now() - Duration::days(i64::from(days)))
        .date_naive()
        .and_time(NaiveTime::MIN);
    let dataset = SampleDataGenerator::new(params.seed.unwrap_or(generator::DEFAULT_SEED), days)
        .generate(start);
    Ok(Json(ImportResponse {
        count: dataset.len(),
        records: dataset.into_records(),
    }))
}

async fn dashboard_summary(
    payload: Result<Json<DatasetBody>, JsonRejection>,
) -> ApiResult<Json<KeyMetrics>> {
    let Json(body) = payload?;
    Ok(Json(key_metrics(body.records.records())))
}

async fn forecast(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ForecastBody>, JsonRejection>,
) -> ApiResult<Json<Forecast>> {
    let Json(body) = payload?;
    let request = ForecastRequest {
        days: body.days,
        model: body.model,
        confidence_level: body.confidence_level,
    };
    let forecast = state.forecaster.forecast(body.records.records(), &request)?;
    Ok(Json(forecast))
}

async fn report(payload: Result<Json<ReportBody>, JsonRejection>) -> ApiResult<Json<ReportResponse>> {
    let Json(body) = payload?;
    let records = body.records.records();
    Ok(Json(ReportResponse {
        summary: summary_report(records, &body.filter),
        custom: custom_report(records, &body.filter, &body.metrics),
    }))
}

async fn export(payload: Result<Json<ReportBody>, JsonRejection>) -> ApiResult<impl IntoResponse> {
    let Json(body) = payload?;
    let csv = export_filtered(body.records.records(), &body.filter)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"energy_report.csv\""),
        ],
        csv,
    ))
}

async fn analytics(
    payload: Result<Json<DatasetBody>, JsonRejection>,
) -> ApiResult<Json<AnalyticsBundle>> {
    let Json(body) = payload?;
    Ok(Json(analyze(body.records.records())))
}

async fn appliances() -> Json<Vec<Appliance>> {
    Json(calculator::catalog())
}

async fn calculate_appliance(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ApplianceBody>, JsonRejection>,
) -> ApiResult<Json<ApplianceResponse>> {
    let Json(body) = payload?;
    let days = body.days.unwrap_or(calculator::DEFAULT_DAYS);
    let rate = body
        .rate_per_kwh
        .unwrap_or(state.settings.energy.default_rate_per_kwh);

    let cost = appliance_cost(&body.usage, days, rate)?;
    let projection = cost_projection(cost.daily_cost, days, Utc::now().date_naive())?;
    Ok(Json(ApplianceResponse { cost, projection }))
}

async fn calculate_appliances(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ApplianceListBody>, JsonRejection>,
) -> ApiResult<Json<ApplianceListSummary>> {
    let Json(body) = payload?;
    let mut list = ApplianceList::new();
    for usage in body.items {
        list.add(usage)?;
    }
    let summary = list.summarize(
        body.days.unwrap_or(calculator::DEFAULT_DAYS),
        body.rate_per_kwh
            .unwrap_or(state.settings.energy.default_rate_per_kwh),
    )?;
    Ok(Json(summary))
}

async fn calculate_bill(
    payload: Result<Json<BillRequest>, JsonRejection>,
) -> ApiResult<Json<BillEstimate>> {
    let Json(request) = payload?;
    Ok(Json(estimate_bill(&request)?))
}
