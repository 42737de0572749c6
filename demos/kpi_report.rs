use chrono::NaiveDate;
use financial_analytics::*;
use std::sync::Arc;

fn main() {
    println!("📊 Financial KPI Report Demo\n");
    println!("Seeds two years of history for every business unit, then compares");
    println!("the last 12 months against the 12 months before.\n");

    let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
    let as_of = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();

    let service =
        AnalyticsService::new(Arc::new(InMemoryStore::new()), WindowMode::CalendarMonths);

    if let Err(e) = service.seed_all(start, end, 42, &GeneratorConfig::default()) {
        eprintln!("❌ Error: {}", e);
        return;
    }

    for unit in BusinessUnit::ALL {
        match service.kpis(unit, 12, as_of) {
            Ok(kpis) => {
                println!("🏢 {} ({} to {})", unit, kpis.period_start, kpis.period_end);
                println!(
                    "  Revenue:        ${:>14.2}  ({:+.2}%)",
                    kpis.total_revenue, kpis.revenue_growth_pct
                );
                println!(
                    "  Net Profit:     ${:>14.2}  ({:+.2}%)",
                    kpis.total_profit, kpis.profit_growth_pct
                );
                println!(
                    "  Net Margin:      {:>14.2}%  ({:+.2}pp)",
                    kpis.net_margin_pct, kpis.margin_change_pp
                );
                println!("  Cash Position:  ${:>14.2}", kpis.cash_position);
            }
            Err(e) => {
                eprintln!("❌ Error for {}: {}", unit, e);
                continue;
            }
        }

        if let Ok(variance) = service.budget_variance(unit, 12) {
            println!(
                "  Budget:         revenue {:+.2}%, profit {:+.2}%",
                variance.revenue_variance_pct, variance.profit_variance_pct
            );
        }
        println!();
    }

    println!("📅 Consolidated quarters:");
    match service.rollup(
        BusinessUnit::Consolidated,
        PeriodType::Quarterly,
        DateRange::unbounded(),
    ) {
        Ok(quarters) => {
            for quarter in quarters {
                println!(
                    "  {}: revenue ${:>14.2}, net margin {:>6.2}%",
                    quarter.period_date(),
                    quarter.revenue(),
                    quarter.net_margin_pct()
                );
            }
        }
        Err(e) => eprintln!("❌ Error: {}", e),
    }
}
