// Runtime configuration from the environment (and an optional .env file)

use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::analytics::{EngineConfig, PeriodBasis};

pub const DEFAULT_DB_PATH: &str = "statement-analytics.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub bind_addr: String,
    pub log_level: String,
    pub engine: EngineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: PathBuf::from(DEFAULT_DB_PATH),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            engine: EngineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads `.env` if present, then reads `ANALYTICS_*` variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, with an injectable variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let rolling_window: usize = parse_var(&var, "ANALYTICS_ROLLING_WINDOW")?
            .unwrap_or(defaults.engine.rolling_window);
        if rolling_window == 0 {
            return Err(anyhow!("ANALYTICS_ROLLING_WINDOW must be at least 1"));
        }

        let top_categories: usize = parse_var(&var, "ANALYTICS_TOP_CATEGORIES")?
            .unwrap_or(defaults.engine.top_categories);

        let period_basis = match var("ANALYTICS_PERIOD_BASIS") {
            Some(raw) => raw
                .parse::<PeriodBasis>()
                .map_err(|e| anyhow!("ANALYTICS_PERIOD_BASIS: {}", e))?,
            None => defaults.engine.period_basis,
        };

        Ok(AppConfig {
            database_path: var("ANALYTICS_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            bind_addr: var("ANALYTICS_BIND_ADDR").unwrap_or(defaults.bind_addr),
            log_level: var("ANALYTICS_LOG_LEVEL").unwrap_or(defaults.log_level),
            engine: EngineConfig {
                rolling_window,
                top_categories,
                period_basis,
            },
        })
    }
}

fn parse_var<T, F>(var: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{} has invalid value '{}'", key, raw))
        })
        .transpose()
}
