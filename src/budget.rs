use crate::error::{AnalyticsError, Result};
use crate::schema::{BudgetRecord, BusinessUnit, FinancialRecord};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_VARIANCE_PERIODS: usize = 12;
pub const MAX_VARIANCE_PERIODS: usize = 36;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BudgetVariancePoint {
    pub period_date: NaiveDate,
    pub actual_revenue: f64,
    pub budget_revenue: f64,
    pub revenue_variance_pct: f64,
    pub actual_net_profit: f64,
    pub budget_net_profit: f64,
    pub profit_variance_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BudgetVarianceSummary {
    pub company_unit: BusinessUnit,
    pub periods: Vec<BudgetVariancePoint>,
    pub actual_revenue: f64,
    pub budget_revenue: f64,
    pub revenue_difference: f64,
    pub revenue_variance_pct: f64,
    pub actual_net_profit: f64,
    pub budget_net_profit: f64,
    pub profit_difference: f64,
    pub profit_variance_pct: f64,
}

/// Relative deviation of actual from budget, in percent of the budget's magnitude.
pub fn variance_pct(actual: f64, budget: f64) -> f64 {
    if budget != 0.0 {
        100.0 * (actual - budget) / budget.abs()
    } else {
        0.0
    }
}

/// Actual vs budget for the `last_n` most recent months where both exist.
pub fn budget_variance(
    financials: &[FinancialRecord],
    budgets: &[BudgetRecord],
    unit: BusinessUnit,
    last_n: usize,
) -> Result<BudgetVarianceSummary> {
    if last_n == 0 || last_n > MAX_VARIANCE_PERIODS {
        return Err(AnalyticsError::invalid_parameter(
            "periods",
            format!("must be between 1 and {} (got {})", MAX_VARIANCE_PERIODS, last_n),
        ));
    }

    let budget_by_date: BTreeMap<NaiveDate, &BudgetRecord> = budgets
        .iter()
        .filter(|b| b.business_unit == unit)
        .map(|b| (b.period_date, b))
        .collect();

    let mut matched: Vec<(&FinancialRecord, &BudgetRecord)> = financials
        .iter()
        .filter(|r| r.business_unit() == unit)
        .filter_map(|r| budget_by_date.get(&r.period_date()).map(|b| (r, *b)))
        .collect();
    matched.sort_by_key(|(r, _)| r.period_date());

    if matched.is_empty() {
        return Err(AnalyticsError::NotFound(format!(
            "no periods with both actual and budget figures for {}",
            unit
        )));
    }

    let skip = matched.len().saturating_sub(last_n);
    let periods: Vec<BudgetVariancePoint> = matched
        .into_iter()
        .skip(skip)
        .map(|(actual, budget)| BudgetVariancePoint {
            period_date: actual.period_date(),
            actual_revenue: actual.revenue(),
            budget_revenue: budget.budget_revenue,
            revenue_variance_pct: variance_pct(actual.revenue(), budget.budget_revenue),
            actual_net_profit: actual.net_profit(),
            budget_net_profit: budget.budget_net_profit,
            profit_variance_pct: variance_pct(actual.net_profit(), budget.budget_net_profit),
        })
        .collect();

    let actual_revenue: f64 = periods.iter().map(|p| p.actual_revenue).sum();
    let budget_revenue: f64 = periods.iter().map(|p| p.budget_revenue).sum();
    let actual_net_profit: f64 = periods.iter().map(|p| p.actual_net_profit).sum();
    let budget_net_profit: f64 = periods.iter().map(|p| p.budget_net_profit).sum();

    Ok(BudgetVarianceSummary {
        company_unit: unit,
        periods,
        actual_revenue,
        budget_revenue,
        revenue_difference: actual_revenue - budget_revenue,
        revenue_variance_pct: variance_pct(actual_revenue, budget_revenue),
        actual_net_profit,
        budget_net_profit,
        profit_difference: actual_net_profit - budget_net_profit,
        profit_variance_pct: variance_pct(actual_net_profit, budget_net_profit),
    })
}
