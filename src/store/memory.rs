use super::{InsertOutcome, RecordStore};
use crate::error::{AnalyticsError, Result};
use crate::schema::{
    BudgetRecord, BusinessUnit, CashFlowRecord, DateRange, FinancialRecord, GeneratedSeries,
};
use std::collections::HashMap;
use std::sync::RwLock;

/// Process-local store; readers share the lock, a unit's insert takes it exclusively.
#[derive(Default)]
pub struct InMemoryStore {
    units: RwLock<HashMap<BusinessUnit, GeneratedSeries>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_unit<T, F>(&self, unit: BusinessUnit, f: F) -> Result<Vec<T>>
    where
        F: FnOnce(&GeneratedSeries) -> Vec<T>,
    {
        let units = self.units.read().map_err(|_| AnalyticsError::StorageLock)?;
        Ok(units.get(&unit).map(f).unwrap_or_default())
    }
}

impl RecordStore for InMemoryStore {
    fn financial_count(&self, unit: BusinessUnit) -> Result<usize> {
        let units = self.units.read().map_err(|_| AnalyticsError::StorageLock)?;
        Ok(units.get(&unit).map_or(0, |series| series.len()))
    }

    fn insert_series(&self, unit: BusinessUnit, series: &GeneratedSeries) -> Result<InsertOutcome> {
        let mut units = self.units.write().map_err(|_| AnalyticsError::StorageLock)?;

        if let Some(existing) = units.get(&unit).filter(|s| !s.is_empty()) {
            return Ok(InsertOutcome::AlreadyPresent(existing.len()));
        }

        let mut stored = series.clone();
        stored.financials.sort_by_key(|r| r.period_date());
        stored.budgets.sort_by_key(|r| r.period_date);
        stored.cash_flows.sort_by_key(|r| r.period_date());
        let inserted = stored.len();
        units.insert(unit, stored);

        Ok(InsertOutcome::Inserted(inserted))
    }

    fn financial_records(
        &self,
        unit: BusinessUnit,
        range: DateRange,
    ) -> Result<Vec<FinancialRecord>> {
        self.read_unit(unit, |series| {
            series
                .financials
                .iter()
                .filter(|r| range.contains(r.period_date()))
                .cloned()
                .collect()
        })
    }

    fn budget_records(&self, unit: BusinessUnit, range: DateRange) -> Result<Vec<BudgetRecord>> {
        self.read_unit(unit, |series| {
            series
                .budgets
                .iter()
                .filter(|r| range.contains(r.period_date))
                .cloned()
                .collect()
        })
    }

    fn cash_flow_records(
        &self,
        unit: BusinessUnit,
        range: DateRange,
    ) -> Result<Vec<CashFlowRecord>> {
        self.read_unit(unit, |series| {
            series
                .cash_flows
                .iter()
                .filter(|r| range.contains(r.period_date()))
                .cloned()
                .collect()
        })
    }
}
