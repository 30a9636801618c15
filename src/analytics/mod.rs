// 📊 Aggregation Engine - dashboard analytics over one user's transactions
//
// Every operation is a read: fetch rows for the resolved user, then transform
// them in memory. Independent store queries are issued concurrently.
//
// Sign convention: debits add their magnitude, credits subtract theirs.
// Net spend is never clamped; a negative total is a net inflow.

pub mod rolling;
pub mod summary;
pub mod trends;
pub mod yoy;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{AnalyticsError, Result};
use crate::filter::{AnalyticsFilter, TransactionQuery};
use crate::models::{category_label, sort_category_labels, TransactionRecord, UserId};
use crate::period::Period;
use crate::store::TransactionStore;

pub use rolling::{compute_rolling_average, RollingPoint};
pub use summary::{compute_summary, CardSpend, CategorySpend, DashboardSummary, StoreCounts};
pub use trends::{compute_category_trends, CategoryTrend, PeriodTotal, TrendDirection};
pub use yoy::{compute_year_over_year, YearOverYear, YearSeries};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Which date places a transaction in a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeriodBasis {
    /// The owning statement's billing month
    #[default]
    Statement,
    /// The calendar month of the transaction date
    Transaction,
}

impl PeriodBasis {
    pub fn period_of(&self, record: &TransactionRecord) -> Period {
        match self {
            PeriodBasis::Statement => record.statement_period(),
            PeriodBasis::Transaction => Period::from_date(record.date),
        }
    }
}

impl FromStr for PeriodBasis {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "statement" => Ok(PeriodBasis::Statement),
            "transaction" => Ok(PeriodBasis::Transaction),
            other => Err(format!("unknown period basis: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Trailing window for rolling averages, in periods
    pub rolling_window: usize,
    /// How many categories the summary ranks
    pub top_categories: usize,
    pub period_basis: PeriodBasis,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            rolling_window: 3,
            top_categories: 5,
            period_basis: PeriodBasis::Statement,
        }
    }
}

// ============================================================================
// SHARED ARITHMETIC
// ============================================================================

/// (current − prior) / |prior| × 100, or None when prior is zero or the
/// result does not fit in a Decimal
pub fn percent_change(current: Decimal, prior: Decimal) -> Option<f64> {
    if prior.is_zero() {
        return None;
    }
    current
        .checked_sub(prior)?
        .checked_div(prior.abs())?
        .checked_mul(Decimal::ONE_HUNDRED)?
        .to_f64()
}

/// Running totals saturate at the Decimal bounds instead of panicking
pub(crate) fn accumulate(total: &mut Decimal, amount: Decimal) {
    *total = total.saturating_add(amount);
}

/// Contiguous periods from the first to the last record, empty when no records
pub(crate) fn period_grid(records: &[TransactionRecord], basis: PeriodBasis) -> Vec<Period> {
    let mut periods = records.iter().map(|r| basis.period_of(r));
    let Some(first) = periods.next() else {
        return Vec::new();
    };

    let (start, end) = periods.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
    Period::range_inclusive(start, end)
}

/// Net spend per period, gap-filled over the record grid
pub(crate) fn net_by_period(records: &[TransactionRecord], basis: PeriodBasis) -> Vec<PeriodTotal> {
    let mut totals: HashMap<Period, Decimal> = HashMap::new();
    for record in records {
        accumulate(
            totals.entry(basis.period_of(record)).or_insert(Decimal::ZERO),
            record.net_contribution(),
        );
    }

    period_grid(records, basis)
        .into_iter()
        .map(|period| PeriodTotal {
            period_key: period,
            total: totals.get(&period).copied().unwrap_or(Decimal::ZERO),
        })
        .collect()
}

/// Sorted distinct labels, sentinel bucket last
pub fn normalize_categories(raw: &[Option<String>]) -> Vec<String> {
    let unique: BTreeSet<String> = raw
        .iter()
        .map(|c| category_label(c.as_deref()).to_string())
        .collect();
    let mut labels: Vec<String> = unique.into_iter().collect();
    sort_category_labels(&mut labels);
    labels
}

// ============================================================================
// ENGINE
// ============================================================================

/// Category trends + summary from one fan-out
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAnalytics {
    pub trends: Vec<CategoryTrend>,
    pub summary: DashboardSummary,
}

/// Stateless per request; cheap to clone and share across handlers.
#[derive(Clone)]
pub struct AnalyticsEngine {
    store: Arc<dyn TransactionStore>,
    config: EngineConfig,
}

impl AnalyticsEngine {
    pub fn new(store: Arc<dyn TransactionStore>, config: EngineConfig) -> Self {
        AnalyticsEngine { store, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TransactionStore> {
        &self.store
    }

    /// Map a caller-supplied identity to a known user. Missing, blank and
    /// unknown identities are all Unauthorized; there is no fallback user.
    #[instrument(skip(self))]
    pub async fn resolve_identity(&self, raw: Option<&str>) -> Result<UserId> {
        let raw = raw
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AnalyticsError::Unauthorized("no caller identity".to_string()))?;

        let user_id = UserId::new(raw);
        let known = self
            .store
            .user_exists(&user_id)
            .await
            .map_err(AnalyticsError::StoreUnavailable)?;

        if known {
            Ok(user_id)
        } else {
            Err(AnalyticsError::Unauthorized(format!("unknown user '{}'", raw)))
        }
    }

    async fn fetch(&self, query: &TransactionQuery) -> Result<Vec<TransactionRecord>> {
        self.store
            .fetch_transactions(query)
            .await
            .map_err(AnalyticsError::StoreUnavailable)
    }

    /// Rows and counts are independent reads, so they run concurrently
    async fn fetch_with_counts(
        &self,
        query: &TransactionQuery,
    ) -> Result<(Vec<TransactionRecord>, StoreCounts)> {
        let (records, cards, statements) = tokio::try_join!(
            self.store.fetch_transactions(query),
            self.store.count_cards(query),
            self.store.count_statements(query),
        )
        .map_err(AnalyticsError::StoreUnavailable)?;

        Ok((records, StoreCounts { cards, statements }))
    }

    #[instrument(skip(self, filter), fields(user_id = %user_id))]
    pub async fn category_trends(
        &self,
        user_id: &UserId,
        filter: &AnalyticsFilter,
    ) -> Result<Vec<CategoryTrend>> {
        let records = self.fetch(&filter.scoped_to(user_id)).await?;
        let trends = compute_category_trends(&records, self.config.period_basis);
        debug!(rows = records.len(), categories = trends.len(), "Computed category trends");
        Ok(trends)
    }

    /// `window` overrides the configured size; the filter's category narrows the rows
    #[instrument(skip(self, filter), fields(user_id = %user_id))]
    pub async fn rolling_average(
        &self,
        user_id: &UserId,
        filter: &AnalyticsFilter,
        window: Option<usize>,
    ) -> Result<Vec<RollingPoint>> {
        let window = window.unwrap_or(self.config.rolling_window);
        if window == 0 {
            return Err(AnalyticsError::invalid_filter("window", "must be at least 1"));
        }

        let records = self.fetch(&filter.scoped_to(user_id)).await?;
        let series = compute_rolling_average(&records, self.config.period_basis, window);
        debug!(rows = records.len(), points = series.len(), window, "Computed rolling average");
        Ok(series)
    }

    #[instrument(skip(self, filter), fields(user_id = %user_id))]
    pub async fn year_over_year(
        &self,
        user_id: &UserId,
        filter: &AnalyticsFilter,
    ) -> Result<Vec<YearOverYear>> {
        let records = self.fetch(&filter.scoped_to(user_id)).await?;
        let series = compute_year_over_year(&records, self.config.period_basis);
        debug!(rows = records.len(), categories = series.len(), "Computed year-over-year");
        Ok(series)
    }

    #[instrument(skip(self, filter), fields(user_id = %user_id))]
    pub async fn summary(&self, user_id: &UserId, filter: &AnalyticsFilter) -> Result<DashboardSummary> {
        let (records, counts) = self.fetch_with_counts(&filter.scoped_to(user_id)).await?;
        Ok(compute_summary(
            &records,
            counts,
            filter.as_of,
            self.config.top_categories,
            self.config.period_basis,
        ))
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn categories(&self, user_id: &UserId) -> Result<Vec<String>> {
        let raw = self
            .store
            .distinct_categories(user_id)
            .await
            .map_err(AnalyticsError::StoreUnavailable)?;
        Ok(normalize_categories(&raw))
    }

    /// Trends and summary over the same fetched rows
    #[instrument(skip(self, filter), fields(user_id = %user_id))]
    pub async fn dashboard(&self, user_id: &UserId, filter: &AnalyticsFilter) -> Result<DashboardAnalytics> {
        let (records, counts) = self.fetch_with_counts(&filter.scoped_to(user_id)).await?;
        let basis = self.config.period_basis;

        let analytics = DashboardAnalytics {
            trends: compute_category_trends(&records, basis),
            summary: compute_summary(&records, counts, filter.as_of, self.config.top_categories, basis),
        };
        debug!(rows = records.len(), "Computed dashboard analytics");
        Ok(analytics)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::models::{Transaction, TransactionType, UNCATEGORIZED};

    fn engine(store: impl TransactionStore + 'static) -> AnalyticsEngine {
        AnalyticsEngine::new(Arc::new(store), EngineConfig::default())
    }

    #[test]
    fn test_percent_change() {
        assert_eq!(percent_change(dec("80"), dec("100")), Some(-20.0));
        assert_eq!(percent_change(dec("150"), dec("100")), Some(50.0));
        // Negative prior uses its magnitude
        assert_eq!(percent_change(dec("-50"), dec("-100")), Some(50.0));
        assert_eq!(percent_change(dec("80"), dec("0")), None);
        assert_eq!(percent_change(dec("0"), dec("0.00")), None);

        let third = percent_change(dec("4"), dec("3")).unwrap();
        assert!((third - 33.333333).abs() < 1e-4);
        assert!(third.is_finite());
    }

    #[test]
    fn test_percent_change_overflow_is_none() {
        assert_eq!(percent_change(Decimal::MAX, dec("0.01")), None);
        assert_eq!(percent_change(Decimal::MIN, dec("1")), None);
    }

    #[test]
    fn test_accumulate_saturates() {
        let mut total = Decimal::MAX;
        accumulate(&mut total, dec("1"));
        assert_eq!(total, Decimal::MAX);

        let mut total = dec("10.50");
        accumulate(&mut total, dec("-0.50"));
        assert_eq!(total, dec("10"));
    }

    #[test]
    fn test_period_grid_fills_gaps() {
        let records = vec![
            debit(2024, 3, "-1", None),
            debit(2023, 11, "-1", None),
        ];
        let grid = period_grid(&records, PeriodBasis::Statement);
        assert_eq!(grid.len(), 5);
        assert_eq!(grid.first().unwrap().to_string(), "2023-11");
        assert_eq!(grid.last().unwrap().to_string(), "2024-03");

        assert!(period_grid(&[], PeriodBasis::Statement).is_empty());
    }

    #[test]
    fn test_period_basis() {
        let mut record = debit(2024, 2, "-10", None);
        // Bought in late January, billed on the February statement
        record.date = chrono::NaiveDate::from_ymd_opt(2024, 1, 28).unwrap();

        assert_eq!(PeriodBasis::Statement.period_of(&record).to_string(), "2024-02");
        assert_eq!(PeriodBasis::Transaction.period_of(&record).to_string(), "2024-01");
        assert_eq!("Transaction".parse::<PeriodBasis>().unwrap(), PeriodBasis::Transaction);
        assert!("weekly".parse::<PeriodBasis>().is_err());
    }

    #[test]
    fn test_normalize_categories() {
        let raw = vec![
            None,
            Some(String::new()),
            Some("Travel".to_string()),
            Some("Dining".to_string()),
        ];
        assert_eq!(normalize_categories(&raw), vec!["Dining", "Travel", UNCATEGORIZED]);
    }

    #[tokio::test]
    async fn test_scenario_trends_and_summary() {
        let engine = engine(scenario_store());
        let user = UserId::new("u");
        let filter = AnalyticsFilter::default();

        let trends = engine.category_trends(&user, &filter).await.unwrap();
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].category, UNCATEGORIZED);
        let totals: Vec<(String, Decimal)> = trends[0]
            .periods
            .iter()
            .map(|p| (p.period_key.to_string(), p.total))
            .collect();
        assert_eq!(
            totals,
            vec![
                ("2024-01".to_string(), dec("100")),
                ("2024-02".to_string(), dec("80")),
            ]
        );
        assert_eq!(trends[0].trend_direction, TrendDirection::Down);

        let summary = engine.summary(&user, &filter).await.unwrap();
        assert_eq!(summary.current_period.map(|p| p.to_string()), Some("2024-02".to_string()));
        assert_eq!(summary.current_total, dec("80"));
        assert_eq!(summary.prior_total, dec("100"));
        assert_eq!(summary.percent_change, Some(-20.0));
        assert_eq!(summary.transaction_count, 5);
        assert_eq!(summary.card_count, 1);
        assert_eq!(summary.statement_count, 2);
    }

    #[tokio::test]
    async fn test_empty_user_gets_empty_results() {
        let engine = engine(scenario_store());
        let filter = AnalyticsFilter::default();

        // "empty" exists without data, "ghost" does not exist at all
        for id in ["empty", "ghost"] {
            let user = UserId::new(id);
            assert!(engine.category_trends(&user, &filter).await.unwrap().is_empty());
            assert!(engine.rolling_average(&user, &filter, None).await.unwrap().is_empty());
            assert!(engine.year_over_year(&user, &filter).await.unwrap().is_empty());
            assert!(engine.categories(&user).await.unwrap().is_empty());

            let summary = engine.summary(&user, &filter).await.unwrap();
            assert_eq!(summary.transaction_count, 0);
            assert_eq!(summary.current_total, Decimal::ZERO);
            assert_eq!(summary.percent_change, None);
            assert!(summary.top_categories.is_empty());
            assert!(summary.by_card.is_empty());
        }
    }

    #[tokio::test]
    async fn test_rolling_average_with_category_filter() {
        let engine = engine(scenario_store());
        let user = UserId::new("u");

        let filter = AnalyticsFilter {
            category: Some(UNCATEGORIZED.to_string()),
            ..AnalyticsFilter::default()
        };
        let series = engine.rolling_average(&user, &filter, Some(2)).await.unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].rolling_average, dec("100"));
        assert_eq!(series[1].rolling_average, dec("90"));

        let no_match = AnalyticsFilter {
            category: Some("Travel".to_string()),
            ..AnalyticsFilter::default()
        };
        assert!(engine.rolling_average(&user, &no_match, None).await.unwrap().is_empty());

        match engine.rolling_average(&user, &filter, Some(0)).await {
            Err(AnalyticsError::InvalidFilter { field, .. }) => assert_eq!(field, "window"),
            other => panic!("expected InvalidFilter, got {:?}", other.map(|s| s.len())),
        }
    }

    #[tokio::test]
    async fn test_sentinel_filter_agrees_with_sentinel_trend() {
        let mut store = scenario_store();
        store
            .add_transaction(Transaction {
                id: "t6".to_string(),
                statement_id: "feb".to_string(),
                date: chrono::NaiveDate::from_ymd_opt(2024, 2, 20).unwrap(),
                description: "LABELLED".to_string(),
                amount: dec("-10.00"),
                transaction_type: TransactionType::Debit,
                category: Some(UNCATEGORIZED.to_string()),
            })
            .unwrap();
        let engine = engine(store);
        let user = UserId::new("u");

        assert_eq!(engine.categories(&user).await.unwrap(), vec![UNCATEGORIZED]);

        let trends = engine.category_trends(&user, &AnalyticsFilter::default()).await.unwrap();
        assert_eq!(trends[0].periods[1].total, dec("90"));

        let filter = AnalyticsFilter {
            category: Some(UNCATEGORIZED.to_string()),
            ..AnalyticsFilter::default()
        };
        let series = engine.rolling_average(&user, &filter, Some(1)).await.unwrap();
        assert_eq!(series[1].raw_total, dec("90"));
    }

    #[tokio::test]
    async fn test_dashboard_matches_individual_operations() {
        let engine = engine(scenario_store());
        let user = UserId::new("u");
        let filter = AnalyticsFilter::default();

        let dashboard = engine.dashboard(&user, &filter).await.unwrap();
        assert_eq!(dashboard.trends, engine.category_trends(&user, &filter).await.unwrap());
        assert_eq!(dashboard.summary, engine.summary(&user, &filter).await.unwrap());
    }

    #[tokio::test]
    async fn test_operations_are_idempotent() {
        let engine = engine(scenario_store());
        let user = UserId::new("u");
        let filter = AnalyticsFilter::default();

        let first = serde_json::to_string(&engine.dashboard(&user, &filter).await.unwrap()).unwrap();
        let second = serde_json::to_string(&engine.dashboard(&user, &filter).await.unwrap()).unwrap();
        assert_eq!(first, second);

        let yoy_a = serde_json::to_string(&engine.year_over_year(&user, &filter).await.unwrap()).unwrap();
        let yoy_b = serde_json::to_string(&engine.year_over_year(&user, &filter).await.unwrap()).unwrap();
        assert_eq!(yoy_a, yoy_b);
    }

    #[tokio::test]
    async fn test_resolve_identity() {
        let engine = engine(scenario_store());

        assert_eq!(engine.resolve_identity(Some(" u ")).await.unwrap(), UserId::new("u"));
        for raw in [None, Some(""), Some("   "), Some("default-user")] {
            assert!(matches!(
                engine.resolve_identity(raw).await,
                Err(AnalyticsError::Unauthorized(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let engine = engine(UnreachableStore);
        let user = UserId::new("u");
        let filter = AnalyticsFilter::default();

        assert!(matches!(
            engine.category_trends(&user, &filter).await,
            Err(AnalyticsError::StoreUnavailable(_))
        ));
        assert!(matches!(
            engine.dashboard(&user, &filter).await,
            Err(AnalyticsError::StoreUnavailable(_))
        ));
        assert!(matches!(
            engine.categories(&user).await,
            Err(AnalyticsError::StoreUnavailable(_))
        ));
    }
}
