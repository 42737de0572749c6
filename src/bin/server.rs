use anyhow::Context;
use chrono::Utc;
use financial_analytics::api::{router, AppState};
use financial_analytics::config::ServerConfig;
use financial_analytics::service::AnalyticsService;
use financial_analytics::store::SqliteStore;
use financial_analytics::utils::{first_of_month, sub_calendar_months};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "financial_analytics=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().context("Failed to read server configuration")?;
    let generator_config = config
        .generator_config()
        .context("Failed to load generator configuration")?;

    info!("Opening database at {}", config.database_path);
    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("Failed to open database {}", config.database_path))?;
    let service = AnalyticsService::new(Arc::new(store), config.window_mode);
    info!("KPI windows use {:?} mode", service.window_mode());

    let end = config
        .history_end
        .unwrap_or_else(|| first_of_month(Utc::now().date_naive()));
    let start = sub_calendar_months(end, config.history_months.saturating_sub(1))?;

    let seeding = service.clone();
    let seed = config.seed;
    let outcomes = tokio::task::spawn_blocking(move || {
        seeding.seed_all(start, end, seed, &generator_config)
    })
    .await
    .context("Seeding task panicked")??;
    for (unit, outcome) in outcomes {
        info!("{}: {:?}", unit, outcome);
    }

    let app = router(AppState::new(service));
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Financial Analytics API listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
