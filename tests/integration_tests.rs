use chrono::{Datelike, NaiveDate};
use financial_analytics::*;
use std::sync::Arc;
use std::thread;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn two_year_history(unit: BusinessUnit, seed: u64) -> GeneratedSeries {
    SeriesGenerator::new(GeneratorConfig::default(), seed)
        .unwrap()
        .generate(d(2022, 1, 1), d(2023, 12, 31), unit)
        .unwrap()
}

fn seeded_service(store: Arc<dyn RecordStore>) -> AnalyticsService {
    let service = AnalyticsService::new(store, WindowMode::CalendarMonths);
    service
        .seed_all(d(2022, 1, 1), d(2023, 12, 1), 42, &GeneratorConfig::default())
        .unwrap();
    service
}

#[test]
fn test_consolidated_history_seed_42() {
    let series = two_year_history(BusinessUnit::Consolidated, 42);

    println!("\n📊 Consolidated history, seed 42");
    for record in &series.financials {
        println!(
            "  {}  revenue {:>14.2}  net {:>14.2}  margin {:>6.2}%",
            record.period_date(),
            record.revenue(),
            record.net_profit(),
            record.net_margin_pct()
        );
    }

    assert_eq!(series.financials.len(), 24);
    assert_eq!(series.budgets.len(), 24);
    assert_eq!(series.cash_flows.len(), 24);

    for (i, record) in series.financials.iter().enumerate() {
        let expected = d(2022 + (i as i32 / 12), (i as u32 % 12) + 1, 1);
        assert_eq!(record.period_date(), expected);
        assert_eq!(record.business_unit(), BusinessUnit::Consolidated);
        assert!(record.revenue() >= 0.0);
    }

    // 50M a year, full seasonal cycles, average growth factor ~1.06.
    let total_revenue: f64 = series.financials.iter().map(|r| r.revenue()).sum();
    println!("  Total revenue: {:.2}", total_revenue);
    assert!(
        total_revenue > 80_000_000.0 && total_revenue < 130_000_000.0,
        "total revenue {} outside the plausible band",
        total_revenue
    );

    verify_financial_records(&series.financials, 1e-6).unwrap();
    verify_cash_flow_chain(&series.cash_flows, 10_000_000.0, 1e-6).unwrap();
}

#[test]
fn test_generation_is_reproducible() {
    let first = two_year_history(BusinessUnit::Europe, 7);
    let second = two_year_history(BusinessUnit::Europe, 7);
    let other = two_year_history(BusinessUnit::Europe, 8);

    assert_eq!(first.financials, second.financials);
    assert_eq!(first.budgets, second.budgets);
    assert_eq!(first.cash_flows, second.cash_flows);
    assert_ne!(first.financials, other.financials);
}

#[test]
fn test_running_cash_balance_from_starting_balance() {
    let series = two_year_history(BusinessUnit::Consolidated, 42);

    let mut balance = 10_000_000.0;
    for record in &series.cash_flows {
        let flows = record.flows();
        let net = flows.operating_cash_flow + flows.investing_cash_flow + flows.financing_cash_flow;
        assert!((record.net_cash_flow() - net).abs() < 1e-6);
        balance += net;
        assert!((record.cash_balance() - balance).abs() < 1e-6);
    }
}

#[test]
fn test_kpis_over_seeded_memory_store() {
    let service = seeded_service(Arc::new(InMemoryStore::new()));

    let summary = service
        .kpis(BusinessUnit::Consolidated, 12, d(2023, 12, 31))
        .unwrap();

    println!("\n📈 Consolidated KPIs (12 months to 2023-12-31)");
    println!("  Revenue:        {:.2}", summary.total_revenue);
    println!("  Revenue growth: {:.2}%", summary.revenue_growth_pct);
    println!("  Profit:         {:.2}", summary.total_profit);
    println!("  Profit growth:  {:.2}%", summary.profit_growth_pct);
    println!("  Net margin:     {:.2}%", summary.net_margin_pct);
    println!("  Margin change:  {:.2}pp", summary.margin_change_pp);
    println!("  Cash position:  {:.2}", summary.cash_position);

    let financials = service
        .store()
        .financial_records(BusinessUnit::Consolidated, DateRange::unbounded())
        .unwrap();
    let expected_revenue: f64 = financials
        .iter()
        .filter(|r| r.period_date().year() == 2023)
        .map(|r| r.revenue())
        .sum();

    assert!((summary.total_revenue - expected_revenue).abs() < 1e-3);
    assert!(summary.revenue_growth_pct > -15.0 && summary.revenue_growth_pct < 30.0);
    assert_eq!(summary.period_start, d(2022, 12, 31));
    assert_eq!(summary.period_end, d(2023, 12, 31));

    let cash = service
        .store()
        .cash_flow_records(BusinessUnit::Consolidated, DateRange::unbounded())
        .unwrap();
    let latest = cash.last().unwrap();
    assert!(!summary.cash_position_estimated);
    assert!((summary.cash_position - latest.cash_balance()).abs() < 1e-6);
}

#[test]
fn test_kpis_outside_history_is_not_found() {
    let service = seeded_service(Arc::new(InMemoryStore::new()));

    let result = service.kpis(BusinessUnit::Consolidated, 6, d(2030, 6, 30));
    assert!(matches!(result, Err(AnalyticsError::NotFound(_))));
}

#[test]
fn test_kpis_without_baseline_report_zero_growth() {
    let service = seeded_service(Arc::new(InMemoryStore::new()));

    // The previous window ends before the first generated month.
    let summary = service
        .kpis(BusinessUnit::NorthAmerica, 12, d(2022, 12, 31))
        .unwrap();
    assert_eq!(summary.revenue_growth_pct, 0.0);
    assert_eq!(summary.profit_growth_pct, 0.0);
    assert_eq!(summary.margin_change_pp, 0.0);
}

#[test]
fn test_sqlite_matches_memory_store() {
    let memory = seeded_service(Arc::new(InMemoryStore::new()));
    let sqlite = seeded_service(Arc::new(SqliteStore::open_in_memory().unwrap()));

    for unit in BusinessUnit::ALL {
        let a = memory
            .store()
            .financial_records(unit, DateRange::unbounded())
            .unwrap();
        let b = sqlite
            .store()
            .financial_records(unit, DateRange::unbounded())
            .unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.period_date(), y.period_date());
            assert!((x.net_profit() - y.net_profit()).abs() < 1e-6);
        }

        let kpi_a = memory.kpis(unit, 12, d(2023, 12, 31)).unwrap();
        let kpi_b = sqlite.kpis(unit, 12, d(2023, 12, 31)).unwrap();
        assert!((kpi_a.total_revenue - kpi_b.total_revenue).abs() < 1e-3);
        assert!((kpi_a.cash_position - kpi_b.cash_position).abs() < 1e-3);
    }
}

#[test]
fn test_sqlite_file_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("analytics.db");

    {
        let store = SqliteStore::open(&path).unwrap();
        let outcome = seed_business_unit(
            &store,
            BusinessUnit::Consolidated,
            d(2022, 1, 1),
            d(2023, 12, 1),
            42,
            &GeneratorConfig::default(),
        )
        .unwrap();
        assert_eq!(outcome, GenerationOutcome::Generated { records: 24 });
    }

    let reopened = SqliteStore::open(&path).unwrap();
    assert_eq!(reopened.financial_count(BusinessUnit::Consolidated).unwrap(), 24);

    let outcome = seed_business_unit(
        &reopened,
        BusinessUnit::Consolidated,
        d(2022, 1, 1),
        d(2023, 12, 1),
        42,
        &GeneratorConfig::default(),
    )
    .unwrap();
    assert_eq!(outcome, GenerationOutcome::Skipped { existing: 24 });

    let cash = reopened
        .cash_flow_records(BusinessUnit::Consolidated, DateRange::unbounded())
        .unwrap();
    verify_cash_flow_chain(&cash, 10_000_000.0, 1e-6).unwrap();
}

#[test]
fn test_concurrent_seeding_has_one_winner() {
    let store: Arc<dyn RecordStore> = Arc::new(SqliteStore::open_in_memory().unwrap());

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                seed_business_unit(
                    store.as_ref(),
                    BusinessUnit::Europe,
                    d(2023, 1, 1),
                    d(2023, 12, 1),
                    100 + i,
                    &GeneratorConfig::default().scaled(0.30),
                )
                .unwrap()
            })
        })
        .collect();

    let outcomes: Vec<GenerationOutcome> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();
    let generated = outcomes
        .iter()
        .filter(|o| matches!(o, GenerationOutcome::Generated { .. }))
        .count();

    assert_eq!(generated, 1);
    assert_eq!(store.financial_count(BusinessUnit::Europe).unwrap(), 12);
}

#[test]
fn test_period_listing_and_rollup() {
    let service = seeded_service(Arc::new(InMemoryStore::new()));

    let range = DateRange::new(Some(d(2023, 1, 1)), Some(d(2023, 12, 31))).unwrap();
    let query = PeriodQuery::new(BusinessUnit::AsiaPacific, range, 100).unwrap();
    let periods = service.list_periods(&query).unwrap();
    assert_eq!(periods.len(), 12);
    assert!(periods
        .windows(2)
        .all(|w| w[0].period_date() < w[1].period_date()));

    let quarters = service
        .rollup(BusinessUnit::AsiaPacific, PeriodType::Quarterly, range)
        .unwrap();
    assert_eq!(quarters.len(), 4);

    let monthly_total: f64 = periods.iter().map(|r| r.revenue()).sum();
    let quarterly_total: f64 = quarters.iter().map(|r| r.revenue()).sum();
    assert!((monthly_total - quarterly_total).abs() < 1e-3);
    verify_financial_records(&quarters, 1e-6).unwrap();
}

#[test]
fn test_budget_variance_end_to_end() {
    let service = seeded_service(Arc::new(InMemoryStore::new()));

    let summary = service
        .budget_variance(BusinessUnit::Consolidated, 12)
        .unwrap();

    println!("\n💰 Budget variance, last 12 months");
    for point in &summary.periods {
        println!(
            "  {}  revenue {:>7.2}%  profit {:>7.2}%",
            point.period_date, point.revenue_variance_pct, point.profit_variance_pct
        );
    }

    assert_eq!(summary.periods.len(), 12);
    assert_eq!(summary.periods[0].period_date, d(2023, 1, 1));
    // Budget revenue is drawn around 110% of actual, so actual lands ~9% under.
    assert!(summary.revenue_variance_pct < 0.0 && summary.revenue_variance_pct > -20.0);
}

#[test]
fn test_generator_config_from_partial_json() {
    let config = GeneratorConfig::from_json_str(
        r#"{ "annual_revenue_base": 12000000.0, "seasonality_amplitude": 0.0 }"#,
    )
    .unwrap();

    assert_eq!(config.annual_revenue_base, 12_000_000.0);
    assert_eq!(config.monthly_growth_rate, GeneratorConfig::default().monthly_growth_rate);

    let bad = GeneratorConfig::from_json_str(r#"{ "seasonality_amplitude": 3.0 }"#);
    assert!(matches!(bad, Err(AnalyticsError::InvalidConfiguration(_))));
}

#[test]
fn test_schema_generation() {
    let schema = GeneratorConfig::schema_as_json().unwrap();
    assert!(schema.contains("annual_revenue_base"));
    assert!(schema.contains("starting_cash_balance"));
}
