// Year-over-year: each category's net spend laid out as 12-month rows per year,
// so the same calendar month lines up across years.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use super::{accumulate, PeriodBasis};
use crate::models::{sort_category_labels, TransactionRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearSeries {
    pub year: i32,
    /// January first; months without transactions are zero
    pub months: [Decimal; 12],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearOverYear {
    pub category: String,
    /// Only years in which the category has transactions, ascending
    pub years: Vec<YearSeries>,
}

pub fn compute_year_over_year(records: &[TransactionRecord], basis: PeriodBasis) -> Vec<YearOverYear> {
    let mut by_category: BTreeMap<String, BTreeMap<i32, [Decimal; 12]>> = BTreeMap::new();

    for record in records {
        let period = basis.period_of(record);
        let months = by_category
            .entry(record.category_label().to_string())
            .or_default()
            .entry(period.year)
            .or_insert([Decimal::ZERO; 12]);
        accumulate(&mut months[period.month_index()], record.net_contribution());
    }

    let mut labels: Vec<String> = by_category.keys().cloned().collect();
    sort_category_labels(&mut labels);

    labels
        .into_iter()
        .filter_map(|category| {
            let years = by_category.remove(&category)?;
            Some(YearOverYear {
                category,
                years: years
                    .into_iter()
                    .map(|(year, months)| YearSeries { year, months })
                    .collect(),
            })
        })
        .collect()
}
