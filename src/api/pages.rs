use axum::{
    extract::{Path, State},
    response::Html,
    routing::get,
    Router,
};
use std::sync::Arc;
use tera::{Context, Tera};

use crate::api::error::ApiResult;
use crate::api::routes::AppState;
use crate::errors::TwinResult;
use crate::monitoring::PerformanceReport;
use crate::with_context;

const LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{ title }}</title>
</head>
<body>
<nav><a href="/">Home</a> | <a href="/machines">Machines</a></nav>
<h1>{{ title }}</h1>
{{ body | safe }}
</body>
</html>
"#;

const INDEX: &str = r#"<p>Live cutting-time metrics, maintenance outlook and anomaly flags for every
machine reporting to this service.</p>
<p><a href="/machines">Browse machines</a></p>"#;

const MACHINES: &str = r#"{% if machines | length == 0 %}<p>No machines have reported data yet.</p>
{% else %}<table>
<tr><th>Machine</th><th>Status</th><th>Last seen</th></tr>
{% for machine in machines %}<tr><td><a href="/dashboard/{{ machine.id }}">{{ machine.name }}</a></td><td>{{ machine.status }}</td><td>{% if machine.last_seen %}{{ machine.last_seen }}{% else %}never{% endif %}</td></tr>
{% endfor %}</table>{% endif %}"#;

const DASHBOARD: &str = r#"<p>Status: <strong>{{ twin.status.status }}</strong></p>
{% if metrics %}<ul>
<li>Operations: {{ metrics.total_operations }}</li>
<li>Average cutting time: {{ metrics.average_cutting_time | round(precision=2) }}</li>
<li>Efficiency: {{ metrics.efficiency | round(precision=2) }}%</li>
<li>Utilization: {{ metrics.utilization | round(precision=2) }}%</li>
</ul>
{% else %}<p>{{ metrics_error }}</p>
{% endif %}<p>Maintenance: {{ twin.maintenance_prediction.prediction }} (confidence {{ twin.maintenance_prediction.confidence }}%)</p>
<p>Anomalies in window: {{ twin.anomalies | length }}</p>
<p><a href="/api/twin/{{ twin.machine_id }}">Raw twin state</a></p>"#;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/machines", get(machines))
        .route("/dashboard/{machine_id}", get(dashboard))
}

/// Renders `body` with autoescaping, then wraps it in the shared layout.
fn render_page(title: &str, body: &str, context: &Context) -> TwinResult<Html<String>> {
    let mut page = Context::new();
    page.insert("title", title);
    page.insert("body", &Tera::one_off(body, context, true)?);
    Ok(Html(Tera::one_off(LAYOUT, &page, true)?))
}

async fn index() -> ApiResult<Html<String>> {
    let page = with_context!(
        render_page("CNC Digital Twin", INDEX, &Context::new()),
        "index_page"
    )?;
    Ok(page)
}

async fn machines(State(state): State<Arc<AppState>>) -> ApiResult<Html<String>> {
    let machines = with_context!(state.twin.machines().await, "machines_page")?;

    let mut context = Context::new();
    context.insert("machines", &machines);
    let page = with_context!(render_page("Machines", MACHINES, &context), "machines_page")?;
    Ok(page)
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Path(machine_id): Path<String>,
) -> ApiResult<Html<String>> {
    let twin = with_context!(state.twin.twin_state(&machine_id).await, "dashboard_page")?;

    let mut context = Context::new();
    context.insert("metrics", &twin.metrics.metrics());
    if let PerformanceReport::Unavailable { error } = &twin.metrics {
        context.insert("metrics_error", error);
    }
    context.insert("twin", &twin);

    let title = format!("CNC Machine {}", machine_id);
    let page = with_context!(render_page(&title, DASHBOARD, &context), "dashboard_page")?;
    Ok(page)
}
