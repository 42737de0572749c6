use crate::config::GeneratorConfig;
use crate::error::{AnalyticsError, Result};
use crate::integrity;
use crate::schema::*;
use crate::seasonality::{growth_factor, seasonal_factor};
use crate::store::{InsertOutcome, RecordStore};
use crate::utils::month_starts_in_range;
use chrono::{Datelike, NaiveDate};
use log::{debug, info};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// Outcome of [`seed_business_unit`]. A skip is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    Generated { records: usize },
    Skipped { existing: usize },
}

/// Distributions resolved once per run so a bad parameter fails before any draw.
struct Samplers {
    revenue_noise: Normal<f64>,
    expenses: [Normal<f64>; 6],
    budget_revenue: Normal<f64>,
    budget_expense: Normal<f64>,
    depreciation: Normal<f64>,
    capex: Normal<f64>,
    financing: Normal<f64>,
}

impl Samplers {
    fn new(config: &GeneratorConfig) -> Result<Self> {
        let revenue_noise = Normal::new(1.0, config.revenue_noise_sd).map_err(|e| {
            AnalyticsError::InvalidConfiguration(format!("revenue_noise_sd is invalid: {}", e))
        })?;

        let categories = config.expenses.categories();
        let expenses = [
            categories[0].1.distribution(categories[0].0)?,
            categories[1].1.distribution(categories[1].0)?,
            categories[2].1.distribution(categories[2].0)?,
            categories[3].1.distribution(categories[3].0)?,
            categories[4].1.distribution(categories[4].0)?,
            categories[5].1.distribution(categories[5].0)?,
        ];

        Ok(Self {
            revenue_noise,
            expenses,
            budget_revenue: config.budget_revenue_factor.distribution("budget_revenue_factor")?,
            budget_expense: config.budget_expense_factor.distribution("budget_expense_factor")?,
            depreciation: config.depreciation.distribution("depreciation")?,
            capex: config.capex.distribution("capex")?,
            financing: config.financing.distribution("financing")?,
        })
    }
}

pub struct SeriesGenerator {
    config: GeneratorConfig,
    seed: u64,
}

impl SeriesGenerator {
    pub fn new(config: GeneratorConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, seed })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Builds one financial, budget and cash flow record per month touched by
    /// `[start, end]`, each anchored to the first of its month.
    ///
    /// Identical seed, config and range always yield identical series.
    pub fn generate(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        unit: BusinessUnit,
    ) -> Result<GeneratedSeries> {
        let months = month_starts_in_range(start, end);
        if months.is_empty() {
            return Err(AnalyticsError::invalid_parameter(
                "end_date",
                format!("generation range {}..={} contains no months", start, end),
            ));
        }

        let samplers = Samplers::new(&self.config)?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let monthly_base = self.config.annual_revenue_base / 12.0;

        let mut series = GeneratedSeries {
            financials: Vec::with_capacity(months.len()),
            budgets: Vec::with_capacity(months.len()),
            cash_flows: Vec::with_capacity(months.len()),
        };
        let mut previous_balance = self.config.starting_cash_balance;

        for (i, period_date) in months.into_iter().enumerate() {
            let seasonal = seasonal_factor(period_date.month(), self.config.seasonality_amplitude);
            let growth = growth_factor(i, self.config.monthly_growth_rate);
            let random_factor = samplers.revenue_noise.sample(&mut rng);

            let revenue = (monthly_base * seasonal * growth * random_factor).max(0.0);

            let mut ratios = [0.0; 6];
            for (ratio, dist) in ratios.iter_mut().zip(samplers.expenses.iter()) {
                *ratio = dist.sample(&mut rng).max(0.0);
            }

            let record = FinancialRecord::new(
                period_date,
                unit,
                PnlComponents {
                    revenue,
                    cogs: revenue * ratios[0],
                    salaries: revenue * ratios[1],
                    marketing: revenue * ratios[2],
                    rd_expense: revenue * ratios[3],
                    operations: revenue * ratios[4],
                    other_expenses: revenue * ratios[5],
                },
            );

            // One shared draw keeps budget revenue and profit moving together.
            let budget_factor = samplers.budget_revenue.sample(&mut rng);
            let expense_factor = samplers.budget_expense.sample(&mut rng);
            series.budgets.push(BudgetRecord {
                period_date,
                business_unit: unit,
                budget_revenue: record.revenue() * budget_factor,
                budget_net_profit: record.net_profit() * budget_factor,
                budget_expenses: record.total_expenses() * expense_factor,
            });

            let flows = CashFlowComponents {
                operating_cash_flow: record.net_profit() + samplers.depreciation.sample(&mut rng),
                investing_cash_flow: samplers.capex.sample(&mut rng),
                financing_cash_flow: samplers.financing.sample(&mut rng),
            };
            let cash_flow = CashFlowRecord::chained(period_date, unit, flows, previous_balance);
            previous_balance = cash_flow.cash_balance();

            series.cash_flows.push(cash_flow);
            series.financials.push(record);
        }

        debug!(
            "Generated {} months for {} ({} to {}), closing cash balance {:.2}",
            series.len(),
            unit,
            start,
            end,
            previous_balance
        );

        if cfg!(debug_assertions) {
            integrity::verify_series(&series, self.config.starting_cash_balance, 1e-6)?;
        }

        Ok(series)
    }
}

/// Generates and persists a unit's history unless the store already holds it.
///
/// The early count check avoids generating for nothing; the store's own
/// check-then-insert decides the race between concurrent seeders.
pub fn seed_business_unit(
    store: &dyn RecordStore,
    unit: BusinessUnit,
    start: NaiveDate,
    end: NaiveDate,
    seed: u64,
    config: &GeneratorConfig,
) -> Result<GenerationOutcome> {
    let existing = store.financial_count(unit)?;
    if existing > 0 {
        info!(
            "Financial data for {} already exists ({} records), skipping generation",
            unit, existing
        );
        return Ok(GenerationOutcome::Skipped { existing });
    }

    info!("Generating sample financial data for {}...", unit);
    let generator = SeriesGenerator::new(config.clone(), seed)?;
    let series = generator.generate(start, end, unit)?;

    match store.insert_series(unit, &series)? {
        InsertOutcome::Inserted(records) => {
            info!("Generated {} monthly records for {}", records, unit);
            Ok(GenerationOutcome::Generated { records })
        }
        InsertOutcome::AlreadyPresent(existing) => {
            info!(
                "Financial data for {} was written concurrently ({} records), skipping",
                unit, existing
            );
            Ok(GenerationOutcome::Skipped { existing })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_one_record_per_month_anchored_to_first() {
        let generator = SeriesGenerator::new(GeneratorConfig::default(), 42).unwrap();
        let series = generator
            .generate(d(2022, 1, 15), d(2023, 12, 31), BusinessUnit::Consolidated)
            .unwrap();

        assert_eq!(series.financials.len(), 24);
        assert_eq!(series.budgets.len(), 24);
        assert_eq!(series.cash_flows.len(), 24);
        assert_eq!(series.financials[0].period_date(), d(2022, 1, 1));
        assert_eq!(series.financials[23].period_date(), d(2023, 12, 1));
        assert!(series.financials.iter().all(|r| r.period_date().day() == 1));
    }

    #[test]
    fn test_deterministic_for_seed() {
        let a = SeriesGenerator::new(GeneratorConfig::default(), 7)
            .unwrap()
            .generate(d(2023, 1, 1), d(2023, 12, 1), BusinessUnit::Europe)
            .unwrap();
        let b = SeriesGenerator::new(GeneratorConfig::default(), 7)
            .unwrap()
            .generate(d(2023, 1, 1), d(2023, 12, 1), BusinessUnit::Europe)
            .unwrap();
        let c = SeriesGenerator::new(GeneratorConfig::default(), 8)
            .unwrap()
            .generate(d(2023, 1, 1), d(2023, 12, 1), BusinessUnit::Europe)
            .unwrap();

        assert_eq!(a.financials, b.financials);
        assert_eq!(a.budgets, b.budgets);
        assert_eq!(a.cash_flows, b.cash_flows);
        assert_ne!(a.financials, c.financials);
    }

    #[test]
    fn test_noise_free_revenue_follows_seasonality_and_growth() {
        let config = GeneratorConfig {
            annual_revenue_base: 12_000.0,
            revenue_noise_sd: 0.0,
            ..GeneratorConfig::default()
        };
        let series = SeriesGenerator::new(config, 1)
            .unwrap()
            .generate(d(2023, 1, 1), d(2023, 12, 1), BusinessUnit::Consolidated)
            .unwrap();

        for (i, record) in series.financials.iter().enumerate() {
            let expected = 1_000.0
                * seasonal_factor(record.period_date().month(), 0.1)
                * growth_factor(i, 0.005);
            assert!(
                (record.revenue() - expected).abs() < 1e-9,
                "month {} revenue {} expected {}",
                i,
                record.revenue(),
                expected
            );
        }
    }

    #[test]
    fn test_budget_revenue_and_profit_share_one_draw() {
        let series = SeriesGenerator::new(GeneratorConfig::default(), 42)
            .unwrap()
            .generate(d(2023, 1, 1), d(2023, 12, 1), BusinessUnit::Consolidated)
            .unwrap();

        for (actual, budget) in series.financials.iter().zip(series.budgets.iter()) {
            let revenue_factor = budget.budget_revenue / actual.revenue();
            let profit_factor = budget.budget_net_profit / actual.net_profit();
            assert!((revenue_factor - profit_factor).abs() < 1e-9);
        }
    }

    #[test]
    fn test_running_cash_balance() {
        let config = GeneratorConfig::default();
        let series = SeriesGenerator::new(config.clone(), 3)
            .unwrap()
            .generate(d(2022, 1, 1), d(2023, 12, 1), BusinessUnit::AsiaPacific)
            .unwrap();
        let flows = &series.cash_flows;

        assert!(
            (flows[0].cash_balance() - (config.starting_cash_balance + flows[0].net_cash_flow()))
                .abs()
                < 1e-6
        );
        for i in 1..flows.len() {
            let expected = flows[i - 1].cash_balance() + flows[i].net_cash_flow();
            assert!((flows[i].cash_balance() - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let config = GeneratorConfig {
            annual_revenue_base: -5.0,
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            SeriesGenerator::new(config, 42),
            Err(AnalyticsError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_reversed_range_rejected() {
        let generator = SeriesGenerator::new(GeneratorConfig::default(), 42).unwrap();
        assert!(generator
            .generate(d(2024, 1, 1), d(2023, 1, 1), BusinessUnit::Consolidated)
            .is_err());
    }

    #[test]
    fn test_seed_business_unit_is_idempotent() {
        let store = InMemoryStore::new();
        let config = GeneratorConfig::default();

        let first = seed_business_unit(
            &store,
            BusinessUnit::Consolidated,
            d(2023, 1, 1),
            d(2023, 12, 1),
            42,
            &config,
        )
        .unwrap();
        let second = seed_business_unit(
            &store,
            BusinessUnit::Consolidated,
            d(2023, 1, 1),
            d(2023, 12, 1),
            42,
            &config,
        )
        .unwrap();

        assert_eq!(first, GenerationOutcome::Generated { records: 12 });
        assert_eq!(second, GenerationOutcome::Skipped { existing: 12 });
        assert_eq!(store.financial_count(BusinessUnit::Consolidated).unwrap(), 12);
        assert_eq!(store.financial_count(BusinessUnit::Europe).unwrap(), 0);
    }

    #[test]
    fn test_failed_generation_commits_nothing() {
        let store = InMemoryStore::new();
        let config = GeneratorConfig {
            annual_revenue_base: 0.0,
            ..GeneratorConfig::default()
        };

        let result = seed_business_unit(
            &store,
            BusinessUnit::Consolidated,
            d(2023, 1, 1),
            d(2023, 12, 1),
            42,
            &config,
        );
        assert!(result.is_err());
        assert_eq!(store.financial_count(BusinessUnit::Consolidated).unwrap(), 0);
    }
}
