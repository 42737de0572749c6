use crate::error::{AnalyticsError, Result};
use crate::schema::{BusinessUnit, CashFlowRecord, FinancialRecord, GeneratedSeries};
use log::warn;
use std::collections::BTreeMap;

/// Checks that every record's derived fields agree with its base fields and
/// that no base amount is negative.
pub fn verify_financial_records(records: &[FinancialRecord], tolerance: f64) -> Result<()> {
    for record in records {
        let c = record.components();
        let date = record.period_date();

        let amounts = [
            ("revenue", c.revenue),
            ("cogs", c.cogs),
            ("salaries", c.salaries),
            ("marketing", c.marketing),
            ("rd_expense", c.rd_expense),
            ("operations", c.operations),
            ("other_expenses", c.other_expenses),
        ];
        for (name, value) in amounts {
            if !value.is_finite() || value < 0.0 {
                return Err(violation(
                    date,
                    format!("{} is {} for {}", name, value, record.business_unit()),
                ));
            }
        }

        let expected_total = c.total_expenses();
        if (record.total_expenses() - expected_total).abs() > tolerance {
            return Err(violation(
                date,
                format!(
                    "total_expenses {} != sum of components {}",
                    record.total_expenses(),
                    expected_total
                ),
            ));
        }

        let expected_net = c.revenue - expected_total;
        if (record.net_profit() - expected_net).abs() > tolerance {
            return Err(violation(
                date,
                format!(
                    "net_profit {} != revenue - total_expenses {}",
                    record.net_profit(),
                    expected_net
                ),
            ));
        }

        if (record.gross_profit() - (c.revenue - c.cogs)).abs() > tolerance {
            return Err(violation(date, "gross_profit != revenue - cogs".to_string()));
        }

        if c.revenue > 0.0 {
            let gross_margin = 100.0 * record.gross_profit() / c.revenue;
            let net_margin = 100.0 * record.net_profit() / c.revenue;
            if (record.gross_margin_pct() - gross_margin).abs() > tolerance
                || (record.net_margin_pct() - net_margin).abs() > tolerance
            {
                return Err(violation(
                    date,
                    "margin does not match its defining ratio".to_string(),
                ));
            }
        }
    }

    Ok(())
}

/// Checks `cash_balance[t] = cash_balance[t-1] + net_cash_flow[t]` per unit,
/// with `starting_balance` standing in for the balance before each unit's first month.
pub fn verify_cash_flow_chain(
    records: &[CashFlowRecord],
    starting_balance: f64,
    tolerance: f64,
) -> Result<()> {
    let mut by_unit: BTreeMap<BusinessUnit, Vec<&CashFlowRecord>> = BTreeMap::new();
    for record in records {
        by_unit.entry(record.business_unit()).or_default().push(record);
    }

    for (unit, mut chain) in by_unit {
        chain.sort_by_key(|r| r.period_date());

        let mut previous_balance = starting_balance;
        let mut previous_date = None;
        for record in chain {
            if previous_date == Some(record.period_date()) {
                return Err(violation(
                    record.period_date(),
                    format!("duplicate cash flow period for {}", unit),
                ));
            }

            let flows = record.flows();
            if (record.net_cash_flow() - flows.net()).abs() > tolerance {
                return Err(violation(
                    record.period_date(),
                    "net_cash_flow != operating + investing + financing".to_string(),
                ));
            }

            let expected = previous_balance + record.net_cash_flow();
            if (record.cash_balance() - expected).abs() > tolerance {
                warn!(
                    "Cash balance chain broken for {} at {}: expected {:.2}, found {:.2}",
                    unit,
                    record.period_date(),
                    expected,
                    record.cash_balance()
                );
                return Err(violation(
                    record.period_date(),
                    format!(
                        "cash_balance {} != previous balance {} + net cash flow {}",
                        record.cash_balance(),
                        previous_balance,
                        record.net_cash_flow()
                    ),
                ));
            }

            previous_balance = record.cash_balance();
            previous_date = Some(record.period_date());
        }
    }

    Ok(())
}

pub fn verify_series(
    series: &GeneratedSeries,
    starting_balance: f64,
    tolerance: f64,
) -> Result<()> {
    verify_financial_records(&series.financials, tolerance)?;
    verify_cash_flow_chain(&series.cash_flows, starting_balance, tolerance)?;

    if series.budgets.len() != series.financials.len()
        || series.cash_flows.len() != series.financials.len()
    {
        let date = series
            .financials
            .first()
            .map(|r| r.period_date())
            .unwrap_or(chrono::NaiveDate::MIN);
        return Err(violation(
            date,
            format!(
                "series lengths differ: {} financial, {} budget, {} cash flow",
                series.financials.len(),
                series.budgets.len(),
                series.cash_flows.len()
            ),
        ));
    }

    Ok(())
}

fn violation(date: chrono::NaiveDate, details: String) -> AnalyticsError {
    AnalyticsError::InvariantViolation { date, details }
}
