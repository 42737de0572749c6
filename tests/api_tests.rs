#![cfg(feature = "server")]

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use financial_analytics::api::{router, AppState};
use financial_analytics::*;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn app() -> Router {
    let service = AnalyticsService::new(Arc::new(InMemoryStore::new()), WindowMode::default());
    service
        .seed_all(d(2022, 1, 1), d(2023, 12, 1), 42, &GeneratorConfig::default())
        .unwrap();
    router(AppState::new(service))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get(app(), "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "Financial Analytics API");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_kpis_for_seeded_window() {
    let (status, body) = get(
        app(),
        "/financial/kpis?period_months=12&company_unit=consolidated&as_of=2023-12-31",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    for field in [
        "total_revenue",
        "revenue_growth_pct",
        "total_profit",
        "profit_growth_pct",
        "net_margin_pct",
        "margin_change_pp",
        "cash_position",
    ] {
        assert!(body[field].is_number(), "{} missing", field);
    }
    assert_eq!(body["period_start"], "2022-12-31");
    assert_eq!(body["period_end"], "2023-12-31");
    assert!(body["total_revenue"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_kpis_empty_window_is_404() {
    let (status, body) = get(app(), "/financial/kpis?period_months=3&as_of=2030-01-31").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_kpis_rejects_out_of_range_window() {
    let (status, _) = get(app(), "/financial/kpis?period_months=25&as_of=2023-12-31").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(app(), "/financial/kpis?period_months=0&as_of=2023-12-31").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_business_unit_is_rejected() {
    let (status, body) = get(app(), "/financial/kpis?company_unit=antarctica").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_malformed_query_values_return_json_errors() {
    for uri in [
        "/financial/kpis?as_of=not-a-date",
        "/financial/kpis?period_months=twelve",
        "/financial/periods?limit=-1",
        "/financial/periods?start_date=2023-13-45",
        "/financial/cash-flow?company_unit=mars",
        "/financial/budget-variance?periods=many",
        "/financial/rollup?period_type=weekly",
    ] {
        let (status, body) = get(app(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(body["error"].is_string(), "{} returned {}", uri, body);
    }
}

#[tokio::test]
async fn test_periods_are_ascending_and_limited() {
    let (status, body) = get(app(), "/financial/periods?company_unit=europe&limit=5").await;

    assert_eq!(status, StatusCode::OK);
    let periods = body.as_array().unwrap();
    assert_eq!(periods.len(), 5);
    assert_eq!(periods[0]["period_date"], "2023-08-01");
    assert_eq!(periods[4]["period_date"], "2023-12-01");
    assert!(periods.iter().all(|p| p["company_unit"] == "europe"));

    let record = &periods[0];
    for field in [
        "revenue",
        "cogs",
        "gross_profit",
        "salaries",
        "marketing",
        "rd_expense",
        "operations",
        "other_expenses",
        "total_expenses",
        "net_profit",
        "gross_margin_pct",
        "net_margin_pct",
    ] {
        assert!(record[field].is_number(), "{} missing", field);
    }
}

#[tokio::test]
async fn test_periods_range_and_limit_bounds() {
    let (status, body) = get(
        app(),
        "/financial/periods?start_date=2022-03-01&end_date=2022-05-31",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (status, _) = get(app(), "/financial/periods?limit=101").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(
        app(),
        "/financial/periods?start_date=2023-05-01&end_date=2023-01-01",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cash_flow_listing() {
    let (status, body) = get(
        app(),
        "/financial/cash-flow?company_unit=north_america&limit=3",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows[2]["cash_balance"].is_number());
    assert_eq!(rows[2]["period_date"], "2023-12-01");
}

#[tokio::test]
async fn test_budget_variance_route() {
    let (status, body) = get(app(), "/financial/budget-variance?periods=6").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["company_unit"], "consolidated");
    assert_eq!(body["periods"].as_array().unwrap().len(), 6);

    let (status, _) = get(app(), "/financial/budget-variance?periods=37").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rollup_route() {
    let (status, body) = get(
        app(),
        "/financial/rollup?company_unit=asia_pacific&period_type=yearly",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let years = body.as_array().unwrap();
    assert_eq!(years.len(), 2);
    assert_eq!(years[0]["period_date"], "2022-01-01");
    assert_eq!(years[1]["period_date"], "2023-01-01");
}
