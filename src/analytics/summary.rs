// Dashboard summary: current vs prior period, top categories, per-card totals, counts.
//
// The current period comes from the data (or an explicit `as_of`), never from
// the wall clock, so the same store state always yields the same summary.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::{accumulate, percent_change, PeriodBasis};
use crate::models::TransactionRecord;
use crate::period::Period;

/// Counts that come from separate store queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub cards: usize,
    pub statements: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySpend {
    pub category: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSpend {
    pub card_id: String,
    pub name: String,
    pub color: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub current_period: Option<Period>,
    pub prior_period: Option<Period>,
    pub current_total: Decimal,
    pub prior_total: Decimal,
    /// None when the prior total is zero
    pub percent_change: Option<f64>,
    pub top_categories: Vec<CategorySpend>,
    pub by_card: Vec<CardSpend>,
    pub transaction_count: usize,
    pub card_count: usize,
    pub statement_count: usize,
}

pub fn compute_summary(
    records: &[TransactionRecord],
    counts: StoreCounts,
    as_of: Option<Period>,
    top_n: usize,
    basis: PeriodBasis,
) -> DashboardSummary {
    let mut period_totals: HashMap<Period, Decimal> = HashMap::new();
    let mut category_totals: BTreeMap<&str, Decimal> = BTreeMap::new();
    let mut card_totals: HashMap<&str, CardSpend> = HashMap::new();

    for record in records {
        let net = record.net_contribution();

        accumulate(period_totals.entry(basis.period_of(record)).or_insert(Decimal::ZERO), net);
        accumulate(category_totals.entry(record.category_label()).or_insert(Decimal::ZERO), net);

        let card = card_totals
            .entry(record.card_id.as_str())
            .or_insert_with(|| CardSpend {
                card_id: record.card_id.clone(),
                name: record.card_name.clone(),
                color: record.card_color.clone(),
                total: Decimal::ZERO,
            });
        accumulate(&mut card.total, net);
    }

    let current_period = as_of.or_else(|| period_totals.keys().max().copied());
    let prior_period = current_period.map(Period::pred);

    let total_for = |period: Option<Period>| {
        period
            .and_then(|p| period_totals.get(&p).copied())
            .unwrap_or(Decimal::ZERO)
    };
    let current_total = total_for(current_period);
    let prior_total = total_for(prior_period);

    // Highest spend first, ties by label
    let mut top_categories: Vec<CategorySpend> = category_totals
        .into_iter()
        .map(|(category, total)| CategorySpend {
            category: category.to_string(),
            total,
        })
        .collect();
    top_categories.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
    top_categories.truncate(top_n);

    let mut by_card: Vec<CardSpend> = card_totals.into_values().collect();
    by_card.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.card_id.cmp(&b.card_id)));

    DashboardSummary {
        current_period,
        prior_period,
        current_total,
        prior_total,
        percent_change: percent_change(current_total, prior_total),
        top_categories,
        by_card,
        transaction_count: records.len(),
        card_count: counts.cards,
        statement_count: counts.statements,
    }
}
