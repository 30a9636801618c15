// Statement Analytics - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod analytics;
pub mod config;
pub mod error;
pub mod filter;
pub mod import;
pub mod logging;
pub mod models;
pub mod period;
pub mod store;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use analytics::{
    AnalyticsEngine, CategoryTrend, DashboardAnalytics, DashboardSummary, EngineConfig,
    PeriodBasis, RollingPoint, TrendDirection, YearOverYear,
};
pub use config::AppConfig;
pub use error::{AnalyticsError, Result};
pub use filter::{AnalyticsFilter, FilterParams, TransactionQuery};
pub use import::{import_csv, import_rows, read_statement_rows, ImportReport, StatementRow};
pub use logging::init_tracing;
pub use models::{
    Card, Statement, Transaction, TransactionRecord, TransactionType, User, UserId, UNCATEGORIZED,
};
pub use period::Period;
pub use store::sqlite::setup_database;
pub use store::{InMemoryStore, SqliteStore, TransactionStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
