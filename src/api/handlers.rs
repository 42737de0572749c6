use super::error::ApiError;
use super::AppState;
use crate::budget::{BudgetVarianceSummary, DEFAULT_VARIANCE_PERIODS};
use crate::error::{AnalyticsError, Result};
use crate::kpi::KpiSummary;
use crate::periods::{PeriodQuery, DEFAULT_PERIOD_LIMIT};
use crate::schema::{BusinessUnit, CashFlowRecord, DateRange, FinancialRecord, PeriodType};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

pub const MAX_KPI_WINDOW_MONTHS: u32 = 24;
const DEFAULT_KPI_WINDOW_MONTHS: u32 = 12;

fn default_period_months() -> u32 {
    DEFAULT_KPI_WINDOW_MONTHS
}

fn default_limit() -> usize {
    DEFAULT_PERIOD_LIMIT
}

fn default_variance_periods() -> usize {
    DEFAULT_VARIANCE_PERIODS
}

#[derive(Debug, Deserialize)]
pub struct KpiParams {
    #[serde(default = "default_period_months")]
    pub period_months: u32,
    #[serde(default)]
    pub company_unit: BusinessUnit,
    /// Window end; today (UTC) when omitted.
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct PeriodParams {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub company_unit: BusinessUnit,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct BudgetParams {
    #[serde(default)]
    pub company_unit: BusinessUnit,
    #[serde(default = "default_variance_periods")]
    pub periods: usize,
}

#[derive(Debug, Deserialize)]
pub struct RollupParams {
    #[serde(default)]
    pub company_unit: BusinessUnit,
    #[serde(default)]
    pub period_type: PeriodType,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Runs a store-bound closure on the blocking pool.
async fn blocking<T, F>(task: F) -> std::result::Result<T, ApiError>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(task).await??)
}

/// GET / - service identity
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "Financial Analytics API",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// GET /financial/kpis
pub async fn get_kpis(
    State(state): State<AppState>,
    params: std::result::Result<Query<KpiParams>, QueryRejection>,
) -> std::result::Result<Json<KpiSummary>, ApiError> {
    let Query(params) = params?;
    if params.period_months == 0 || params.period_months > MAX_KPI_WINDOW_MONTHS {
        return Err(AnalyticsError::invalid_parameter(
            "period_months",
            format!(
                "must be between 1 and {} (got {})",
                MAX_KPI_WINDOW_MONTHS, params.period_months
            ),
        )
        .into());
    }

    let as_of = params.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let service = state.service.clone();
    let summary = blocking(move || {
        service.kpis(params.company_unit, params.period_months, as_of)
    })
    .await?;

    Ok(Json(summary))
}

/// GET /financial/periods
pub async fn list_periods(
    State(state): State<AppState>,
    params: std::result::Result<Query<PeriodParams>, QueryRejection>,
) -> std::result::Result<Json<Vec<FinancialRecord>>, ApiError> {
    let Query(params) = params?;
    let query = PeriodQuery::new(
        params.company_unit,
        DateRange::new(params.start_date, params.end_date)?,
        params.limit,
    )?;
    let service = state.service.clone();
    let records = blocking(move || service.list_periods(&query)).await?;
    Ok(Json(records))
}

/// GET /financial/cash-flow
pub async fn list_cash_flows(
    State(state): State<AppState>,
    params: std::result::Result<Query<PeriodParams>, QueryRejection>,
) -> std::result::Result<Json<Vec<CashFlowRecord>>, ApiError> {
    let Query(params) = params?;
    let query = PeriodQuery::new(
        params.company_unit,
        DateRange::new(params.start_date, params.end_date)?,
        params.limit,
    )?;
    let service = state.service.clone();
    let records = blocking(move || service.list_cash_flows(&query)).await?;
    Ok(Json(records))
}

/// GET /financial/budget-variance
pub async fn budget_variance(
    State(state): State<AppState>,
    params: std::result::Result<Query<BudgetParams>, QueryRejection>,
) -> std::result::Result<Json<BudgetVarianceSummary>, ApiError> {
    let Query(params) = params?;
    let service = state.service.clone();
    let summary =
        blocking(move || service.budget_variance(params.company_unit, params.periods)).await?;
    Ok(Json(summary))
}

/// GET /financial/rollup
pub async fn rollup(
    State(state): State<AppState>,
    params: std::result::Result<Query<RollupParams>, QueryRejection>,
) -> std::result::Result<Json<Vec<FinancialRecord>>, ApiError> {
    let Query(params) = params?;
    let range = DateRange::new(params.start_date, params.end_date)?;
    let service = state.service.clone();
    let records = blocking(move || {
        service.rollup(params.company_unit, params.period_type, range)
    })
    .await?;
    Ok(Json(records))
}
