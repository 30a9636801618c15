// Category trends: per-category net spend per period, plus a last-vs-previous indicator.
//
// Every category series covers the same contiguous grid (first to last period
// across all categories), zero-filled, so sparklines line up without gaps.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::{accumulate, percent_change, period_grid, PeriodBasis};
use crate::models::{sort_category_labels, TransactionRecord};
use crate::period::Period;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodTotal {
    pub period_key: Period,
    pub total: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTrend {
    pub category: String,
    pub periods: Vec<PeriodTotal>,
    pub trend_direction: TrendDirection,
    /// |percent change| of the last period against the one before; None when
    /// there is no previous period or it totals zero
    pub trend_magnitude: Option<f64>,
}

pub fn compute_category_trends(records: &[TransactionRecord], basis: PeriodBasis) -> Vec<CategoryTrend> {
    let grid = period_grid(records, basis);
    if grid.is_empty() {
        return Vec::new();
    }

    let mut by_category: BTreeMap<String, HashMap<Period, Decimal>> = BTreeMap::new();
    for record in records {
        let total = by_category
            .entry(record.category_label().to_string())
            .or_default()
            .entry(basis.period_of(record))
            .or_insert(Decimal::ZERO);
        accumulate(total, record.net_contribution());
    }

    let mut labels: Vec<String> = by_category.keys().cloned().collect();
    sort_category_labels(&mut labels);

    labels
        .into_iter()
        .map(|category| {
            let totals = &by_category[&category];
            let periods: Vec<PeriodTotal> = grid
                .iter()
                .map(|period| PeriodTotal {
                    period_key: *period,
                    total: totals.get(period).copied().unwrap_or(Decimal::ZERO),
                })
                .collect();

            let (trend_direction, trend_magnitude) = trend_of(&periods);
            CategoryTrend {
                category,
                periods,
                trend_direction,
                trend_magnitude,
            }
        })
        .collect()
}

fn trend_of(periods: &[PeriodTotal]) -> (TrendDirection, Option<f64>) {
    let [.., previous, last] = periods else {
        return (TrendDirection::Flat, None);
    };

    let direction = match last.total.cmp(&previous.total) {
        std::cmp::Ordering::Greater => TrendDirection::Up,
        std::cmp::Ordering::Less => TrendDirection::Down,
        std::cmp::Ordering::Equal => TrendDirection::Flat,
    };

    (direction, percent_change(last.total, previous.total).map(f64::abs))
}
