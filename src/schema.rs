use crate::error::{AnalyticsError, Result};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
    Default,
)]
#[serde(rename_all = "snake_case")]
pub enum BusinessUnit {
    #[schemars(description = "Group-level figures covering every region")]
    #[default]
    Consolidated,

    #[schemars(description = "North American operations")]
    NorthAmerica,

    #[schemars(description = "European operations")]
    Europe,

    #[schemars(description = "Asia-Pacific operations")]
    AsiaPacific,
}

impl BusinessUnit {
    pub const ALL: [BusinessUnit; 4] = [
        BusinessUnit::Consolidated,
        BusinessUnit::NorthAmerica,
        BusinessUnit::Europe,
        BusinessUnit::AsiaPacific,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessUnit::Consolidated => "consolidated",
            BusinessUnit::NorthAmerica => "north_america",
            BusinessUnit::Europe => "europe",
            BusinessUnit::AsiaPacific => "asia_pacific",
        }
    }

    /// Share of the consolidated revenue base a regional unit carries.
    pub fn revenue_share(&self) -> f64 {
        match self {
            BusinessUnit::Consolidated => 1.0,
            BusinessUnit::NorthAmerica => 0.45,
            BusinessUnit::Europe => 0.30,
            BusinessUnit::AsiaPacific => 0.25,
        }
    }

    pub fn index(&self) -> u64 {
        match self {
            BusinessUnit::Consolidated => 0,
            BusinessUnit::NorthAmerica => 1,
            BusinessUnit::Europe => 2,
            BusinessUnit::AsiaPacific => 3,
        }
    }
}

impl fmt::Display for BusinessUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BusinessUnit {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        BusinessUnit::ALL
            .into_iter()
            .find(|unit| unit.as_str() == s.trim())
            .ok_or_else(|| {
                AnalyticsError::invalid_parameter(
                    "company_unit",
                    format!(
                        "unknown business unit '{}', expected one of consolidated, north_america, europe, asia_pacific",
                        s
                    ),
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    #[default]
    Monthly,
    Quarterly,
    Yearly,
}

/// The seven base P&L fields every derived figure is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PnlComponents {
    pub revenue: f64,
    pub cogs: f64,
    pub salaries: f64,
    pub marketing: f64,
    pub rd_expense: f64,
    pub operations: f64,
    pub other_expenses: f64,
}

impl PnlComponents {
    pub fn total_expenses(&self) -> f64 {
        self.cogs
            + self.salaries
            + self.marketing
            + self.rd_expense
            + self.operations
            + self.other_expenses
    }

    pub fn accumulate(&mut self, other: &PnlComponents) {
        self.revenue += other.revenue;
        self.cogs += other.cogs;
        self.salaries += other.salaries;
        self.marketing += other.marketing;
        self.rd_expense += other.rd_expense;
        self.operations += other.operations;
        self.other_expenses += other.other_expenses;
    }
}

/// One month of P&L activity for one business unit.
///
/// Derived fields are computed once in [`FinancialRecord::new`] and never
/// mutated afterwards; there are no setters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialRecord {
    period_date: NaiveDate,
    #[serde(rename = "company_unit")]
    business_unit: BusinessUnit,
    #[serde(flatten)]
    components: PnlComponents,
    gross_profit: f64,
    total_expenses: f64,
    net_profit: f64,
    gross_margin_pct: f64,
    net_margin_pct: f64,
}

impl FinancialRecord {
    pub fn new(
        period_date: NaiveDate,
        business_unit: BusinessUnit,
        components: PnlComponents,
    ) -> Self {
        let revenue = components.revenue;
        let total_expenses = components.total_expenses();
        let gross_profit = revenue - components.cogs;
        let net_profit = revenue - total_expenses;

        Self {
            period_date,
            business_unit,
            components,
            gross_profit,
            total_expenses,
            net_profit,
            gross_margin_pct: percentage_of(gross_profit, revenue),
            net_margin_pct: percentage_of(net_profit, revenue),
        }
    }

    pub fn period_date(&self) -> NaiveDate {
        self.period_date
    }

    pub fn business_unit(&self) -> BusinessUnit {
        self.business_unit
    }

    pub fn components(&self) -> &PnlComponents {
        &self.components
    }

    pub fn revenue(&self) -> f64 {
        self.components.revenue
    }

    pub fn gross_profit(&self) -> f64 {
        self.gross_profit
    }

    pub fn total_expenses(&self) -> f64 {
        self.total_expenses
    }

    pub fn net_profit(&self) -> f64 {
        self.net_profit
    }

    pub fn gross_margin_pct(&self) -> f64 {
        self.gross_margin_pct
    }

    pub fn net_margin_pct(&self) -> f64 {
        self.net_margin_pct
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRecord {
    pub period_date: NaiveDate,
    #[serde(rename = "company_unit")]
    pub business_unit: BusinessUnit,
    pub budget_revenue: f64,
    pub budget_net_profit: f64,
    pub budget_expenses: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CashFlowComponents {
    pub operating_cash_flow: f64,
    pub investing_cash_flow: f64,
    pub financing_cash_flow: f64,
}

impl CashFlowComponents {
    pub fn net(&self) -> f64 {
        self.operating_cash_flow + self.investing_cash_flow + self.financing_cash_flow
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashFlowRecord {
    period_date: NaiveDate,
    #[serde(rename = "company_unit")]
    business_unit: BusinessUnit,
    #[serde(flatten)]
    flows: CashFlowComponents,
    net_cash_flow: f64,
    cash_balance: f64,
}

impl CashFlowRecord {
    /// Builds the next link of a balance chain: `cash_balance = previous_balance + net`.
    pub fn chained(
        period_date: NaiveDate,
        business_unit: BusinessUnit,
        flows: CashFlowComponents,
        previous_balance: f64,
    ) -> Self {
        let net_cash_flow = flows.net();
        Self {
            period_date,
            business_unit,
            flows,
            net_cash_flow,
            cash_balance: previous_balance + net_cash_flow,
        }
    }

    /// Rehydrates a record whose balance was computed when it was first chained.
    pub fn from_stored(
        period_date: NaiveDate,
        business_unit: BusinessUnit,
        flows: CashFlowComponents,
        cash_balance: f64,
    ) -> Self {
        Self {
            period_date,
            business_unit,
            flows,
            net_cash_flow: flows.net(),
            cash_balance,
        }
    }

    pub fn period_date(&self) -> NaiveDate {
        self.period_date
    }

    pub fn business_unit(&self) -> BusinessUnit {
        self.business_unit
    }

    pub fn flows(&self) -> &CashFlowComponents {
        &self.flows
    }

    pub fn net_cash_flow(&self) -> f64 {
        self.net_cash_flow
    }

    pub fn cash_balance(&self) -> f64 {
        self.cash_balance
    }
}

/// Inclusive, optionally open-ended date filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self> {
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err(AnalyticsError::invalid_parameter(
                    "end_date",
                    format!("end_date {} is before start_date {}", end, start),
                ));
            }
        }
        Ok(Self { start, end })
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

/// Everything the generator produces for one business unit, in ascending date order.
#[derive(Debug, Clone, Default)]
pub struct GeneratedSeries {
    pub financials: Vec<FinancialRecord>,
    pub budgets: Vec<BudgetRecord>,
    pub cash_flows: Vec<CashFlowRecord>,
}

impl GeneratedSeries {
    pub fn len(&self) -> usize {
        self.financials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.financials.is_empty()
    }
}

pub(crate) fn percentage_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        100.0 * part / whole
    } else {
        0.0
    }
}
