// Rolling average: trailing mean of net spend per period.
//
// Shrinking window: until N periods exist, the mean covers every period so
// far. The first period is never dropped, so the output is exactly as long
// as the raw series.

use rust_decimal::Decimal;
use serde::Serialize;

use super::{accumulate, net_by_period, PeriodBasis};
use crate::models::TransactionRecord;
use crate::period::Period;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingPoint {
    pub period_key: Period,
    /// Rounded to minor-unit precision
    pub rolling_average: Decimal,
    pub raw_total: Decimal,
}

/// `window` must be at least 1
pub fn compute_rolling_average(
    records: &[TransactionRecord],
    basis: PeriodBasis,
    window: usize,
) -> Vec<RollingPoint> {
    let raw = net_by_period(records, basis);
    let window = window.max(1);

    raw.iter()
        .enumerate()
        .map(|(i, point)| {
            let start = (i + 1).saturating_sub(window);
            let span = &raw[start..=i];
            let mut sum = Decimal::ZERO;
            for p in span {
                accumulate(&mut sum, p.total);
            }

            RollingPoint {
                period_key: point.period_key,
                rolling_average: (sum / Decimal::from(span.len())).round_dp(2),
                raw_total: point.total,
            }
        })
        .collect()
}
