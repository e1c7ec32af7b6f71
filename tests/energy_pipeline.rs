use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};
use tower::ServiceExt;

use twin_dashboard::config::generate_default_config;
use twin_dashboard::energy::forecast::{ForecastEngine, ForecastModel, ForecastRequest};
use twin_dashboard::energy::import::{export_csv, import_csv_str};
use twin_dashboard::energy::reports::{summary_report, ReportFilter};
use twin_dashboard::energy::{analyze, SampleDataGenerator};
use twin_dashboard::{build_state, create_router, InMemoryCuttingStore};

fn app() -> Router {
    create_router(build_state(InMemoryCuttingStore::new(), generate_default_config()))
}

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

async fn call(app: &Router, method: &str, uri: &str, content_type: &str, body: String) -> (StatusCode, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let (status, text) = call(app, "POST", uri, "application/json", body.to_string()).await;
    (status, serde_json::from_str(&text).unwrap())
}

#[test]
fn test_generated_data_survives_csv_and_feeds_every_view() {
    let dataset = SampleDataGenerator::new(11, 21).generate(start());
    let csv = export_csv(dataset.records()).unwrap();
    let records = import_csv_str(&csv).unwrap();
    assert_eq!(records.len(), 21 * 24);

    let forecast = ForecastEngine::default()
        .forecast(&records, &ForecastRequest::new(7, ForecastModel::MovingAverage))
        .unwrap();
    assert_eq!(forecast.points.len(), 7);
    assert_eq!(forecast.points[0].date, NaiveDate::from_ymd_opt(2024, 3, 25).unwrap());

    let filter = ReportFilter::between(
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
    );
    let report = summary_report(&records, &filter);
    let report = report.ready().unwrap();
    assert_eq!(report.daily_trend.len(), 7);
    assert_eq!(report.metrics.record_count, 7 * 24);

    let bundle = analyze(&records);
    assert_eq!(bundle.hourly_profile.len(), 24);
    assert_eq!(bundle.weekday_pattern.len(), 7);
    assert_eq!(bundle.daily_efficiency.len(), 21);
    assert!(bundle.by_category.len() <= 4);
}

#[tokio::test]
async fn test_import_endpoint() {
    let csv = "timestamp,consumption_kwh,rate_per_kwh,category\n\
               2024-03-04 08:00:00,4,0.15,HVAC\n\
               2024-03-04 09:00:00,2,0.15,Lighting\n";
    let (status, text) = call(&app(), "POST", "/api/energy/import", "text/csv", csv.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["count"], 2);
    assert_eq!(body["records"][0]["category"], "HVAC");
}

#[tokio::test]
async fn test_import_endpoint_accepts_workbooks() {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, header) in ["timestamp", "consumption_kwh", "rate_per_kwh", "location"].iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    sheet.write_string(1, 0, "2024-03-04 08:00:00").unwrap();
    sheet.write_number(1, 1, 4.0).unwrap();
    sheet.write_number(1, 2, 0.25).unwrap();
    sheet.write_string(1, 3, "Office").unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/api/energy/import")
        .header("content-type", twin_dashboard::energy::import::XLSX_CONTENT_TYPE)
        .body(Body::from(bytes))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["records"][0]["cost"], 1.0);
    assert_eq!(body["records"][0]["location"], "Office");
    assert_eq!(body["records"][0]["timestamp"], "2024-03-04T08:00:00");
}

#[tokio::test]
async fn test_import_without_consumption_is_bad_request() {
    let (status, text) = call(&app(), "POST", "/api/energy/import", "text/csv", "timestamp\n2024-03-04\n".into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text.contains("consumption_kwh"));
}

#[tokio::test]
async fn test_forecast_endpoint() {
    let records: Vec<Value> = (1..=30)
        .map(|day| {
            json!({
                "timestamp": format!("2024-01-{:02} 12:00:00", day),
                "consumption_kwh": day,
                "rate_per_kwh": 0.1,
                "cost": 0.1 * f64::from(day)
            })
        })
        .collect();

    let app = app();
    let (status, body) = post_json(
        &app,
        "/api/energy/forecast",
        json!({"records": records, "days": 1, "model": "linear", "confidence_level": 0.9}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let predicted = body["points"][0]["predicted_consumption"].as_f64().unwrap();
    assert!((predicted - 31.0).abs() < 1e-6);
    assert_eq!(body["points"][0]["date"], "2024-01-31");
    assert_eq!(body["confidence_level"], 0.9);

    let (status, body) = post_json(
        &app,
        "/api/energy/forecast",
        json!({"records": records, "days": 400, "model": "linear"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("days"));
}

#[tokio::test]
async fn test_report_and_export_endpoints() {
    let records = json!([
        {"timestamp": "2024-03-04 08:00:00", "consumption_kwh": 10, "rate_per_kwh": 0.1, "cost": 1.0, "category": "HVAC", "location": "Office"},
        {"timestamp": "2024-03-05 08:00:00", "consumption_kwh": 4, "rate_per_kwh": 0.2, "cost": 0.8, "category": "Lighting", "location": "Office"},
        {"timestamp": "2024-03-09 08:00:00", "consumption_kwh": 6, "rate_per_kwh": 0.1, "cost": 0.6, "category": "HVAC", "location": "Warehouse"}
    ]);
    let app = app();

    let (status, body) = post_json(
        &app,
        "/api/energy/report",
        json!({
            "records": records,
            "filter": {"start": "2024-03-04", "end": "2024-03-05"},
            "metrics": ["total_consumption", "peak_usage"]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["metrics"]["total_consumption"], 14.0);
    assert_eq!(body["custom"]["metrics"].as_array().unwrap().len(), 2);
    assert_eq!(body["custom"]["metrics"][1]["value"], 10.0);

    let (status, body) = post_json(
        &app,
        "/api/energy/report",
        json!({"records": records, "filter": {"start": "2025-01-01"}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["summary"]["warning"].is_string());

    let (status, csv) = call(
        &app,
        "POST",
        "/api/energy/export",
        "application/json",
        json!({"records": records, "filter": {"locations": ["Warehouse"]}}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(csv.lines().count(), 2);
    assert!(csv.contains("Warehouse"));
}

#[tokio::test]
async fn test_analytics_and_summary_endpoints() {
    let records = json!([
        {"timestamp": "2024-03-04 08:00:00", "consumption_kwh": 3, "rate_per_kwh": 0.1, "cost": 0.3, "device": "Heater"},
        {"timestamp": "2024-03-04 20:00:00", "consumption_kwh": 1, "rate_per_kwh": 0.1, "cost": 0.1, "device": "LED Lights"}
    ]);
    let app = app();

    let (status, body) = post_json(&app, "/api/energy/analytics", json!({"records": records})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["peak_usage"]["peak_hour"], 8);
    assert_eq!(body["by_device"][0]["key"], "Heater");

    let (status, body) = post_json(&app, "/api/energy/summary", json!({"records": records})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_consumption"], 4.0);
    assert_eq!(body["avg_daily_consumption"], 4.0);
}

#[tokio::test]
async fn test_malformed_record_numbers_read_as_zero() {
    let records = json!([
        {"timestamp": "2024-03-04 08:00:00", "consumption_kwh": "abc", "rate_per_kwh": 0.1, "cost": "n/a"},
        {"timestamp": "2024-03-04 09:00:00", "consumption_kwh": "2.5", "rate_per_kwh": 0.1, "cost": 0.25}
    ]);

    let (status, body) = post_json(&app(), "/api/energy/summary", json!({"records": records})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_consumption"], 2.5);
    assert_eq!(body["total_cost"], 0.25);
}

#[tokio::test]
async fn test_manual_entry_endpoint() {
    let (status, body) = post_json(
        &app(),
        "/api/energy/entries",
        json!({
            "records": [],
            "entry": {"timestamp": "2024-03-04T10:00:00", "consumption_kwh": 5, "rate_per_kwh": 0.2, "category": "Equipment"}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["records"][0]["cost"], 1.0);
}

#[tokio::test]
async fn test_calculator_endpoints() {
    let app = app();

    let (status, catalog) = call(&app, "GET", "/api/energy/appliances", "application/json", String::new()).await;
    assert_eq!(status, StatusCode::OK);
    let catalog: Value = serde_json::from_str(&catalog).unwrap();
    assert_eq!(catalog.as_array().unwrap().len(), 15);

    let (status, body) = post_json(
        &app,
        "/api/energy/calculator/appliance",
        json!({"appliance": "Water Heater", "hours_per_day": 2, "days": 10, "rate_per_kwh": 0.1}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["total_cost"].as_f64().unwrap() - 6.0).abs() < 1e-9);
    assert_eq!(body["projection"].as_array().unwrap().len(), 10);

    let (status, body) = post_json(
        &app,
        "/api/energy/calculator/appliances",
        json!({"items": [
            {"appliance": "Laptop", "hours_per_day": 10},
            {"appliance": "Refrigerator", "hours_per_day": 24, "quantity": 2}
        ], "days": 30, "rate_per_kwh": 0.1}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["total_daily_consumption"].as_f64().unwrap() - 7.7).abs() < 1e-9);

    let (status, body) = post_json(
        &app,
        "/api/energy/calculator/bill",
        json!({"household_size": 2, "home_type": "Apartment", "climate_zone": "Moderate"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["estimated_monthly_kwh"].as_f64().unwrap() - 600.0).abs() < 1e-9);
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 5);

    let (status, _) = post_json(
        &app,
        "/api/energy/calculator/appliance",
        json!({"appliance": "Mystery Box", "hours_per_day": 2}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for days in [4_000_000_000u32, 3651] {
        let (status, body) = post_json(
            &app,
            "/api/energy/calculator/appliance",
            json!({"appliance": "Laptop", "hours_per_day": 2, "days": days}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("days"));
    }

    let (status, body) = post_json(
        &app,
        "/api/energy/calculator/appliances",
        json!({"items": [{"appliance": "Laptop"}], "days": 4_000_000_000u32}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("days"));
}
