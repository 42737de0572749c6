use crate::budget::{budget_variance, BudgetVarianceSummary};
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::generator::{seed_business_unit, GenerationOutcome};
use crate::kpi::{KpiAggregator, KpiRequest, KpiSummary, WindowMode};
use crate::periods::{list_cash_flows, list_periods, rollup, PeriodQuery};
use crate::schema::{BusinessUnit, CashFlowRecord, DateRange, FinancialRecord, PeriodType};
use crate::store::RecordStore;
use chrono::NaiveDate;
use log::info;
use std::sync::Arc;
use std::thread;

/// Store-backed entry point for every read and the one-time seeding write.
///
/// Nothing is cached: each call re-reads the committed records it needs.
#[derive(Clone)]
pub struct AnalyticsService {
    store: Arc<dyn RecordStore>,
    aggregator: KpiAggregator,
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn RecordStore>, window_mode: WindowMode) -> Self {
        Self {
            store,
            aggregator: KpiAggregator::new(window_mode),
        }
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn window_mode(&self) -> WindowMode {
        self.aggregator.mode()
    }

    /// Seeds every business unit in parallel. Regional units get a scaled copy
    /// of `config` and a seed offset by their index so their series differ.
    pub fn seed_all(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        seed: u64,
        config: &GeneratorConfig,
    ) -> Result<Vec<(BusinessUnit, GenerationOutcome)>> {
        config.validate()?;

        let results: Vec<(BusinessUnit, Result<GenerationOutcome>)> = thread::scope(|scope| {
            let handles: Vec<_> = BusinessUnit::ALL
                .into_iter()
                .map(|unit| {
                    let store = self.store.as_ref();
                    let unit_config = config.scaled(unit.revenue_share());
                    let unit_seed = seed.wrapping_add(unit.index());
                    scope.spawn(move || {
                        (
                            unit,
                            seed_business_unit(store, unit, start, end, unit_seed, &unit_config),
                        )
                    })
                })
                .collect();

            handles
                .into_iter()
                .zip(BusinessUnit::ALL)
                .map(|(handle, unit)| {
                    handle.join().unwrap_or_else(|_| {
                        (
                            unit,
                            Err(crate::error::AnalyticsError::Computation(format!(
                                "generation thread for {} panicked",
                                unit
                            ))),
                        )
                    })
                })
                .collect()
        });

        let mut outcomes = Vec::with_capacity(results.len());
        for (unit, result) in results {
            outcomes.push((unit, result?));
        }

        info!("Seeding complete for {} business units", outcomes.len());
        Ok(outcomes)
    }

    pub fn kpis(
        &self,
        business_unit: BusinessUnit,
        window_months: u32,
        as_of: NaiveDate,
    ) -> Result<KpiSummary> {
        let windows = self.aggregator.windows(window_months, as_of)?;

        let financials = self.store.financial_records(
            business_unit,
            DateRange::new(Some(windows.previous_start), Some(windows.end))?,
        )?;
        let cash_flows = self
            .store
            .cash_flow_records(business_unit, DateRange::new(None, Some(as_of))?)?;

        self.aggregator.compute(
            &financials,
            &cash_flows,
            &KpiRequest {
                window_months,
                business_unit,
                as_of,
            },
        )
    }

    pub fn list_periods(&self, query: &PeriodQuery) -> Result<Vec<FinancialRecord>> {
        let records = self
            .store
            .financial_records(query.business_unit, query.range)?;
        Ok(list_periods(&records, query))
    }

    pub fn list_cash_flows(&self, query: &PeriodQuery) -> Result<Vec<CashFlowRecord>> {
        let records = self
            .store
            .cash_flow_records(query.business_unit, query.range)?;
        Ok(list_cash_flows(&records, query))
    }

    pub fn budget_variance(
        &self,
        business_unit: BusinessUnit,
        last_n: usize,
    ) -> Result<BudgetVarianceSummary> {
        let financials = self
            .store
            .financial_records(business_unit, DateRange::unbounded())?;
        let budgets = self
            .store
            .budget_records(business_unit, DateRange::unbounded())?;
        budget_variance(&financials, &budgets, business_unit, last_n)
    }

    pub fn rollup(
        &self,
        business_unit: BusinessUnit,
        period_type: PeriodType,
        range: DateRange,
    ) -> Result<Vec<FinancialRecord>> {
        let records = self.store.financial_records(business_unit, range)?;
        Ok(rollup(&records, business_unit, period_type))
    }
}
