//! HTTP surface over [`AnalyticsService`](crate::service::AnalyticsService).

mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::{BudgetParams, KpiParams, PeriodParams, RollupParams, MAX_KPI_WINDOW_MONTHS};

use crate::service::AnalyticsService;
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub service: AnalyticsService,
}

impl AppState {
    pub fn new(service: AnalyticsService) -> Self {
        Self { service }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route("/financial/kpis", get(handlers::get_kpis))
        .route("/financial/periods", get(handlers::list_periods))
        .route("/financial/cash-flow", get(handlers::list_cash_flows))
        .route("/financial/budget-variance", get(handlers::budget_variance))
        .route("/financial/rollup", get(handlers::rollup))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
