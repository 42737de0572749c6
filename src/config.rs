use crate::error::{AnalyticsError, Result};
use rand_distr::Normal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NormalParams {
    #[schemars(description = "Mean of the normal distribution")]
    pub mean: f64,

    #[schemars(description = "Standard deviation of the normal distribution. Must be >= 0.")]
    pub sd: f64,
}

impl NormalParams {
    pub const fn new(mean: f64, sd: f64) -> Self {
        Self { mean, sd }
    }

    pub fn distribution(&self, name: &str) -> Result<Normal<f64>> {
        Normal::new(self.mean, self.sd).map_err(|e| {
            AnalyticsError::InvalidConfiguration(format!(
                "{} distribution (mean {}, sd {}) is invalid: {}",
                name, self.mean, self.sd, e
            ))
        })
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !self.mean.is_finite() || !self.sd.is_finite() || self.sd < 0.0 {
            return Err(AnalyticsError::InvalidConfiguration(format!(
                "{} requires a finite mean and a non-negative finite sd (got mean {}, sd {})",
                name, self.mean, self.sd
            )));
        }
        Ok(())
    }

    fn scaled(&self, share: f64) -> Self {
        Self::new(self.mean * share, self.sd * share)
    }
}

/// Expense categories expressed as fractions of monthly revenue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ExpenseProfile {
    #[schemars(description = "Cost of goods sold as a fraction of revenue")]
    pub cogs: NormalParams,
    pub salaries: NormalParams,
    pub marketing: NormalParams,
    #[schemars(description = "Research and development as a fraction of revenue")]
    pub rd_expense: NormalParams,
    pub operations: NormalParams,
    pub other_expenses: NormalParams,
}

impl Default for ExpenseProfile {
    fn default() -> Self {
        Self {
            cogs: NormalParams::new(0.35, 0.02),
            salaries: NormalParams::new(0.25, 0.01),
            marketing: NormalParams::new(0.08, 0.02),
            rd_expense: NormalParams::new(0.12, 0.01),
            operations: NormalParams::new(0.06, 0.01),
            other_expenses: NormalParams::new(0.04, 0.01),
        }
    }
}

impl ExpenseProfile {
    pub(crate) fn categories(&self) -> [(&'static str, NormalParams); 6] {
        [
            ("cogs", self.cogs),
            ("salaries", self.salaries),
            ("marketing", self.marketing),
            ("rd_expense", self.rd_expense),
            ("operations", self.operations),
            ("other_expenses", self.other_expenses),
        ]
    }
}

/// Parameters for the synthetic series generator.
///
/// Every field has a default, so a JSON override only needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GeneratorConfig {
    #[schemars(description = "Annual revenue the monthly series is scaled from. Must be > 0.")]
    pub annual_revenue_base: f64,

    #[schemars(
        description = "Amplitude of the sinusoidal seasonal factor 1 + a*sin(2*pi*month/12). Range 0.0 to 1.0."
    )]
    pub seasonality_amplitude: f64,

    #[schemars(description = "Linear monthly growth: month i is scaled by 1 + i*rate")]
    pub monthly_growth_rate: f64,

    #[schemars(description = "Standard deviation of the multiplicative revenue noise around 1.0")]
    pub revenue_noise_sd: f64,

    #[schemars(description = "Per-category expense ratios, drawn independently each month")]
    pub expenses: ExpenseProfile,

    #[schemars(
        description = "Multiplier applied to actual revenue and net profit to form the budget. One draw per month is shared by both."
    )]
    pub budget_revenue_factor: NormalParams,

    #[schemars(description = "Multiplier applied to actual total expenses to form the budget")]
    pub budget_expense_factor: NormalParams,

    #[schemars(description = "Non-cash add-back to net profit for operating cash flow")]
    pub depreciation: NormalParams,

    #[schemars(description = "Investing cash flow per month, typically negative")]
    pub capex: NormalParams,

    #[schemars(description = "Financing cash flow per month")]
    pub financing: NormalParams,

    #[schemars(description = "Cash balance before the first generated month")]
    pub starting_cash_balance: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            annual_revenue_base: 50_000_000.0,
            seasonality_amplitude: 0.1,
            monthly_growth_rate: 0.005,
            revenue_noise_sd: 0.08,
            expenses: ExpenseProfile::default(),
            budget_revenue_factor: NormalParams::new(1.10, 0.05),
            budget_expense_factor: NormalParams::new(0.95, 0.03),
            depreciation: NormalParams::new(500_000.0, 100_000.0),
            capex: NormalParams::new(-200_000.0, 50_000.0),
            financing: NormalParams::new(-100_000.0, 200_000.0),
            starting_cash_balance: 10_000_000.0,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.annual_revenue_base.is_finite() || self.annual_revenue_base <= 0.0 {
            return Err(AnalyticsError::InvalidConfiguration(format!(
                "annual_revenue_base must be a positive finite amount (got {})",
                self.annual_revenue_base
            )));
        }

        if !(0.0..=1.0).contains(&self.seasonality_amplitude) {
            return Err(AnalyticsError::InvalidConfiguration(format!(
                "seasonality_amplitude must be between 0.0 and 1.0 (got {})",
                self.seasonality_amplitude
            )));
        }

        if !self.monthly_growth_rate.is_finite() || self.monthly_growth_rate <= -1.0 {
            return Err(AnalyticsError::InvalidConfiguration(format!(
                "monthly_growth_rate must be finite and greater than -1.0 (got {})",
                self.monthly_growth_rate
            )));
        }

        if !self.revenue_noise_sd.is_finite() || self.revenue_noise_sd < 0.0 {
            return Err(AnalyticsError::InvalidConfiguration(format!(
                "revenue_noise_sd must be a non-negative finite value (got {})",
                self.revenue_noise_sd
            )));
        }

        if !self.starting_cash_balance.is_finite() {
            return Err(AnalyticsError::InvalidConfiguration(
                "starting_cash_balance must be finite".to_string(),
            ));
        }

        for (name, params) in self.expenses.categories() {
            params.validate(name)?;
        }
        self.budget_revenue_factor.validate("budget_revenue_factor")?;
        self.budget_expense_factor.validate("budget_expense_factor")?;
        self.depreciation.validate("depreciation")?;
        self.capex.validate("capex")?;
        self.financing.validate("financing")?;

        Ok(())
    }

    /// Derives the configuration of a unit carrying `share` of this one's volume.
    ///
    /// Ratios and multipliers are unchanged; absolute amounts scale.
    pub fn scaled(&self, share: f64) -> Self {
        Self {
            annual_revenue_base: self.annual_revenue_base * share,
            depreciation: self.depreciation.scaled(share),
            capex: self.capex.scaled(share),
            financing: self.financing.scaled(share),
            starting_cash_balance: self.starting_cash_balance * share,
            ..self.clone()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: GeneratorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(GeneratorConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::json_schema())
    }
}

#[cfg(feature = "server")]
pub use server::ServerConfig;

#[cfg(feature = "server")]
mod server {
    use crate::error::{AnalyticsError, Result};
    use crate::kpi::WindowMode;
    use crate::utils::parse_month;
    use chrono::NaiveDate;
    use std::env;
    use std::path::PathBuf;

    use super::GeneratorConfig;

    #[derive(Debug, Clone)]
    pub struct ServerConfig {
        pub bind_addr: String,
        pub database_path: String,
        pub seed: u64,
        pub history_months: u32,
        /// Last generated month; the current month when unset.
        pub history_end: Option<NaiveDate>,
        pub generator_config_path: Option<PathBuf>,
        pub window_mode: WindowMode,
    }

    impl Default for ServerConfig {
        fn default() -> Self {
            Self {
                bind_addr: "0.0.0.0:8001".to_string(),
                database_path: "financial_analytics.db".to_string(),
                seed: 42,
                history_months: 24,
                history_end: None,
                generator_config_path: None,
                window_mode: WindowMode::CalendarMonths,
            }
        }
    }

    impl ServerConfig {
        pub fn from_env() -> Result<Self> {
            dotenvy::dotenv().ok();
            Self::from_lookup(|key| env::var(key).ok())
        }

        pub fn from_lookup<F>(lookup: F) -> Result<Self>
        where
            F: Fn(&str) -> Option<String>,
        {
            let mut config = Self::default();

            if let Some(addr) = lookup("ANALYTICS_BIND_ADDR") {
                config.bind_addr = addr;
            }
            if let Some(path) = lookup("ANALYTICS_DATABASE_PATH") {
                config.database_path = path;
            }
            if let Some(seed) = lookup("ANALYTICS_SEED") {
                config.seed = seed.trim().parse().map_err(|_| {
                    AnalyticsError::InvalidConfiguration(format!(
                        "ANALYTICS_SEED must be an unsigned integer (got '{}')",
                        seed
                    ))
                })?;
            }
            if let Some(months) = lookup("ANALYTICS_HISTORY_MONTHS") {
                config.history_months = months
                    .trim()
                    .parse()
                    .ok()
                    .filter(|m| *m > 0)
                    .ok_or_else(|| {
                        AnalyticsError::InvalidConfiguration(format!(
                            "ANALYTICS_HISTORY_MONTHS must be a positive integer (got '{}')",
                            months
                        ))
                    })?;
            }
            if let Some(end) = lookup("ANALYTICS_HISTORY_END") {
                config.history_end = Some(parse_month(&end)?);
            }
            if let Some(path) = lookup("ANALYTICS_GENERATOR_CONFIG") {
                config.generator_config_path = Some(PathBuf::from(path));
            }
            if let Some(mode) = lookup("ANALYTICS_WINDOW_MODE") {
                config.window_mode = mode.parse()?;
            }

            Ok(config)
        }

        pub fn generator_config(&self) -> Result<GeneratorConfig> {
            let config = match &self.generator_config_path {
                Some(path) => GeneratorConfig::from_json_file(path)?,
                None => GeneratorConfig::default(),
            };
            config.validate()?;
            Ok(config)
        }
    }
}
