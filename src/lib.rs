//! # Financial Analytics
//!
//! A library for generating reproducible monthly P&L, budget and cash flow
//! history per business unit, and for aggregating that history into
//! period-over-period KPIs.
//!
//! ## Core Concepts
//!
//! - **Financial Record**: One month of P&L for one business unit. Seven base
//!   fields are stored; gross profit, total expenses, net profit and margins are
//!   always derived from them
//! - **Seasonality & Growth**: Revenue follows a sinusoidal monthly profile on top
//!   of linear growth, with multiplicative Gaussian noise
//! - **Cash Flow Chain**: Each month's cash balance is the previous balance plus
//!   that month's net cash flow
//! - **KPI Windows**: The trailing `N` months ending at `as_of`, compared against
//!   the `N` months before that
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_analytics::*;
//! use chrono::NaiveDate;
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryStore::new());
//! let service = AnalyticsService::new(store, WindowMode::CalendarMonths);
//!
//! service.seed_all(
//!     NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2023, 12, 1).unwrap(),
//!     42,
//!     &GeneratorConfig::default(),
//! )?;
//!
//! let kpis = service.kpis(
//!     BusinessUnit::Consolidated,
//!     12,
//!     NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
//! )?;
//! println!("Revenue growth: {:.2}%", kpis.revenue_growth_pct);
//! ```

pub mod budget;
pub mod config;
pub mod error;
pub mod generator;
pub mod integrity;
pub mod kpi;
pub mod periods;
pub mod schema;
pub mod seasonality;
pub mod service;
pub mod store;
pub mod utils;

#[cfg(feature = "server")]
pub mod api;

pub use budget::{budget_variance, BudgetVariancePoint, BudgetVarianceSummary};
pub use config::{ExpenseProfile, GeneratorConfig, NormalParams};
pub use error::{AnalyticsError, Result};
pub use generator::{seed_business_unit, GenerationOutcome, SeriesGenerator};
pub use integrity::{verify_cash_flow_chain, verify_financial_records, verify_series};
pub use kpi::{compute_kpis, KpiAggregator, KpiRequest, KpiSummary, KpiWindows, WindowMode};
pub use periods::{list_cash_flows, list_periods, rollup, PeriodQuery};
pub use schema::*;
pub use service::AnalyticsService;
pub use store::{InMemoryStore, InsertOutcome, RecordStore, SqliteStore};

#[cfg(feature = "server")]
pub use config::ServerConfig;
