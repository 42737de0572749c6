use crate::error::{AnalyticsError, Result};
use crate::schema::{
    BusinessUnit, CashFlowRecord, DateRange, FinancialRecord, PeriodType, PnlComponents,
};
use crate::utils::{quarter_start, year_start};
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub const DEFAULT_PERIOD_LIMIT: usize = 24;
pub const MAX_PERIOD_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodQuery {
    pub business_unit: BusinessUnit,
    pub range: DateRange,
    pub limit: usize,
}

impl PeriodQuery {
    pub fn new(business_unit: BusinessUnit, range: DateRange, limit: usize) -> Result<Self> {
        if limit == 0 || limit > MAX_PERIOD_LIMIT {
            return Err(AnalyticsError::invalid_parameter(
                "limit",
                format!("must be between 1 and {} (got {})", MAX_PERIOD_LIMIT, limit),
            ));
        }
        Ok(Self {
            business_unit,
            range,
            limit,
        })
    }
}

/// Keeps the `limit` most recent items in range, returned oldest first.
fn latest_in_range<T, F>(items: &[T], range: DateRange, limit: usize, date_of: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> NaiveDate,
{
    let mut selected: Vec<&T> = items
        .iter()
        .filter(|i| range.contains(date_of(*i)))
        .collect();
    selected.sort_by_key(|i| std::cmp::Reverse(date_of(*i)));
    selected.truncate(limit);
    selected.reverse();
    selected.into_iter().cloned().collect()
}

/// Lists a unit's monthly records in ascending date order, bounded to the
/// `limit` most recent periods inside the optional range.
///
/// An empty result is not an error: the range is optional.
pub fn list_periods(records: &[FinancialRecord], query: &PeriodQuery) -> Vec<FinancialRecord> {
    let unit_records: Vec<FinancialRecord> = records
        .iter()
        .filter(|r| r.business_unit() == query.business_unit)
        .cloned()
        .collect();
    latest_in_range(&unit_records, query.range, query.limit, |r| r.period_date())
}

pub fn list_cash_flows(records: &[CashFlowRecord], query: &PeriodQuery) -> Vec<CashFlowRecord> {
    let unit_records: Vec<CashFlowRecord> = records
        .iter()
        .filter(|r| r.business_unit() == query.business_unit)
        .cloned()
        .collect();
    latest_in_range(&unit_records, query.range, query.limit, |r| r.period_date())
}

fn bucket_start(date: NaiveDate, period_type: PeriodType) -> NaiveDate {
    match period_type {
        PeriodType::Monthly => date,
        PeriodType::Quarterly => quarter_start(date),
        PeriodType::Yearly => year_start(date),
    }
}

/// Rolls a unit's monthly records up into calendar quarters or years.
///
/// Base fields are summed and derived fields recomputed, so margins are the
/// ratio of the totals rather than an average of monthly margins. Each bucket
/// is dated by its first day. Partial buckets at the range edges are kept.
pub fn rollup(
    records: &[FinancialRecord],
    business_unit: BusinessUnit,
    period_type: PeriodType,
) -> Vec<FinancialRecord> {
    let mut buckets: BTreeMap<NaiveDate, PnlComponents> = BTreeMap::new();

    for record in records.iter().filter(|r| r.business_unit() == business_unit) {
        buckets
            .entry(bucket_start(record.period_date(), period_type))
            .or_default()
            .accumulate(record.components());
    }

    buckets
        .into_iter()
        .map(|(date, components)| FinancialRecord::new(date, business_unit, components))
        .collect()
}
