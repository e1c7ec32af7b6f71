/*
* Twin Dashboard HTTP API
* -----------------------
*
* Router layout:
*
* GET    /health                         - liveness check
* GET    /api/machines                   - every machine seen in the store with its status
* GET    /api/twin/{machine_id}          - twin state: status, metrics, series, maintenance, anomalies
* GET    /api/data/{machine_id}?hours=N  - raw cutting documents, newest first (N in 1..=8760, default 24)
* POST   /api/data                       - store one cutting document, timestamped on arrival
* /api/energy/...                        - stateless energy toolkit (see api::energy)
* /, /machines, /dashboard/{machine_id}  - server-rendered pages (see api::pages)
*
* All handlers share one Arc<AppState>. Failures come back as {"error": "..."}
* with 400 for caller mistakes and 500 for everything else.
*/

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{StatusCode, Uri},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::api::error::{ApiError, ApiResult};
use crate::api::{energy, pages};
use crate::config::Settings;
use crate::energy::ForecastEngine;
use crate::twin::models::{CuttingDocument, InsertResponse, MachineSummary, TwinState};
use crate::twin::{DigitalTwinService, NewCuttingData};
use crate::with_context;

pub const DEFAULT_HISTORY_HOURS: i64 = 24;

pub struct AppState {
    pub twin: DigitalTwinService,
    pub settings: Settings,
    pub forecaster: ForecastEngine,
}

impl AppState {
    pub fn new(twin: DigitalTwinService, settings: Settings) -> Self {
        Self {
            forecaster: ForecastEngine::new(settings.energy.forecast_max_days),
            twin,
            settings,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub hours: Option<String>,
}

impl HistoryParams {
    /// Anything that is not a whole number of hours reads as the default window.
    pub fn hours(&self) -> i64 {
        self.hours
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_HISTORY_HOURS)
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let twin_router = Router::new()
        .route("/api/machines", get(list_machines))
        .route("/api/twin/{machine_id}", get(get_twin_state))
        .route("/api/data/{machine_id}", get(get_machine_data))
        .route("/api/data", post(add_cutting_data));

    Router::new()
        .route("/health", get(health))
        .merge(twin_router)
        .merge(energy::router())
        .merge(pages::router())
        .fallback(fallback_handler)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_machines(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<MachineSummary>>> {
    let machines = with_context!(state.twin.machines().await, "list_machines")?;
    Ok(Json(machines))
}

async fn get_twin_state(
    State(state): State<Arc<AppState>>,
    Path(machine_id): Path<String>,
) -> ApiResult<Json<TwinState>> {
    let twin = with_context!(state.twin.twin_state(&machine_id).await, "get_twin_state")?;
    Ok(Json(twin))
}

async fn get_machine_data(
    State(state): State<Arc<AppState>>,
    Path(machine_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Json<Vec<CuttingDocument>>> {
    let documents = with_context!(
        state.twin.history(&machine_id, params.hours()).await,
        "get_machine_data"
    )?;
    Ok(Json(documents))
}

async fn add_cutting_data(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewCuttingData>, JsonRejection>,
) -> ApiResult<Json<InsertResponse>> {
    let Json(data) = payload?;
    let id = with_context!(state.twin.ingest(data).await, "add_cutting_data")?;
    Ok(Json(InsertResponse { success: true, id }))
}

async fn fallback_handler(uri: Uri) -> ApiError {
    warn!(path = %uri.path(), "No route matched");
    ApiError::new(StatusCode::NOT_FOUND, format!("No route for {}", uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_hours_parsing() {
        let params = |raw: Option<&str>| HistoryParams {
            hours: raw.map(str::to_string),
        };
        assert_eq!(params(None).hours(), 24);
        assert_eq!(params(Some("6")).hours(), 6);
        assert_eq!(params(Some("six")).hours(), 24);
        assert_eq!(params(Some("")).hours(), 24);
        assert_eq!(params(Some("1.5")).hours(), 24);
    }
}
