use crate::error::{AnalyticsError, Result};
use crate::schema::{percentage_of, BusinessUnit, CashFlowRecord, FinancialRecord};
use crate::utils::{sub_calendar_months, sub_days};
use chrono::NaiveDate;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Fallback cash position as a fraction of current-window revenue when no
/// cash flow record exists. An estimate, not a balance.
pub const CASH_POSITION_REVENUE_RATIO: f64 = 0.15;

/// How a window of N months is measured back from the as-of date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// N calendar months back, clamping to the last valid day.
    #[default]
    CalendarMonths,
    /// N * 30 days back. Drifts against the calendar over long windows.
    ThirtyDay,
}

impl FromStr for WindowMode {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "calendar" | "calendar_months" => Ok(WindowMode::CalendarMonths),
            "thirty_day" | "30_day" => Ok(WindowMode::ThirtyDay),
            other => Err(AnalyticsError::InvalidConfiguration(format!(
                "unknown window mode '{}', expected 'calendar' or 'thirty_day'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KpiRequest {
    pub window_months: u32,
    pub business_unit: BusinessUnit,
    pub as_of: NaiveDate,
}

/// The current window `[start, end]` and the preceding half-open window
/// `[previous_start, start)` of equal length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KpiWindows {
    pub previous_start: NaiveDate,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl KpiWindows {
    pub fn in_current(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn in_previous(&self, date: NaiveDate) -> bool {
        date >= self.previous_start && date < self.start
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KpiSummary {
    pub total_revenue: f64,
    pub revenue_growth_pct: f64,
    pub total_profit: f64,
    pub profit_growth_pct: f64,
    pub net_margin_pct: f64,
    pub margin_change_pp: f64,
    pub cash_position: f64,
    /// True when `cash_position` is the revenue-based estimate rather than a recorded balance.
    pub cash_position_estimated: bool,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

#[derive(Debug, Clone, Copy, Default)]
struct WindowTotals {
    revenue: f64,
    profit: f64,
    periods: usize,
}

impl WindowTotals {
    fn add(&mut self, record: &FinancialRecord) {
        self.revenue += record.revenue();
        self.profit += record.net_profit();
        self.periods += 1;
    }

    fn net_margin(&self) -> f64 {
        percentage_of(self.profit, self.revenue)
    }
}

fn growth_pct(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        100.0 * (current - previous) / previous
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KpiAggregator {
    mode: WindowMode,
}

impl KpiAggregator {
    pub fn new(mode: WindowMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> WindowMode {
        self.mode
    }

    pub fn windows(&self, window_months: u32, as_of: NaiveDate) -> Result<KpiWindows> {
        if window_months == 0 {
            return Err(AnalyticsError::invalid_parameter(
                "period_months",
                "window must cover at least one month",
            ));
        }

        let (start, previous_start) = match self.mode {
            WindowMode::CalendarMonths => {
                let start = sub_calendar_months(as_of, window_months)?;
                (start, sub_calendar_months(start, window_months)?)
            }
            WindowMode::ThirtyDay => {
                let days = u64::from(window_months) * 30;
                let start = sub_days(as_of, days)?;
                (start, sub_days(start, days)?)
            }
        };

        Ok(KpiWindows {
            previous_start,
            start,
            end: as_of,
        })
    }

    /// Computes period-over-period KPIs for one unit.
    ///
    /// An empty previous window is a valid "no baseline" state and yields zero
    /// growth; an empty current window is `NotFound`.
    pub fn compute(
        &self,
        financials: &[FinancialRecord],
        cash_flows: &[CashFlowRecord],
        request: &KpiRequest,
    ) -> Result<KpiSummary> {
        let windows = self.windows(request.window_months, request.as_of)?;
        let unit = request.business_unit;

        let mut current = WindowTotals::default();
        let mut previous = WindowTotals::default();
        for record in financials.iter().filter(|r| r.business_unit() == unit) {
            let date = record.period_date();
            if windows.in_current(date) {
                current.add(record);
            } else if windows.in_previous(date) {
                previous.add(record);
            }
        }

        if current.periods == 0 {
            return Err(AnalyticsError::NotFound(format!(
                "no financial records for {} between {} and {}",
                unit, windows.start, windows.end
            )));
        }

        debug!(
            "KPI windows for {}: current {} periods ({}..={}), previous {} periods ({}..{})",
            unit,
            current.periods,
            windows.start,
            windows.end,
            previous.periods,
            windows.previous_start,
            windows.start
        );

        let net_margin_pct = current.net_margin();
        let (revenue_growth_pct, profit_growth_pct, margin_change_pp) = if previous.periods > 0 {
            (
                growth_pct(current.revenue, previous.revenue),
                growth_pct(current.profit, previous.profit),
                net_margin_pct - previous.net_margin(),
            )
        } else {
            (0.0, 0.0, 0.0)
        };

        let latest_balance = cash_flows
            .iter()
            .filter(|c| c.business_unit() == unit && c.period_date() <= request.as_of)
            .max_by_key(|c| c.period_date());
        let (cash_position, cash_position_estimated) = match latest_balance {
            Some(record) => (record.cash_balance(), false),
            None => (current.revenue * CASH_POSITION_REVENUE_RATIO, true),
        };

        let summary = KpiSummary {
            total_revenue: current.revenue,
            revenue_growth_pct,
            total_profit: current.profit,
            profit_growth_pct,
            net_margin_pct,
            margin_change_pp,
            cash_position,
            cash_position_estimated,
            period_start: windows.start,
            period_end: windows.end,
        };
        ensure_finite(&summary)?;

        Ok(summary)
    }
}

/// Convenience wrapper using calendar-month windows.
pub fn compute_kpis(
    financials: &[FinancialRecord],
    cash_flows: &[CashFlowRecord],
    window_months: u32,
    business_unit: BusinessUnit,
    as_of: NaiveDate,
) -> Result<KpiSummary> {
    KpiAggregator::default().compute(
        financials,
        cash_flows,
        &KpiRequest {
            window_months,
            business_unit,
            as_of,
        },
    )
}

fn ensure_finite(summary: &KpiSummary) -> Result<()> {
    let fields = [
        ("total_revenue", summary.total_revenue),
        ("revenue_growth_pct", summary.revenue_growth_pct),
        ("total_profit", summary.total_profit),
        ("profit_growth_pct", summary.profit_growth_pct),
        ("net_margin_pct", summary.net_margin_pct),
        ("margin_change_pp", summary.margin_change_pp),
        ("cash_position", summary.cash_position),
    ];

    match fields.iter().find(|(_, value)| !value.is_finite()) {
        Some((name, value)) => Err(AnalyticsError::Computation(format!(
            "{} evaluated to {}",
            name, value
        ))),
        None => Ok(()),
    }
}
