// 🔎 Filter Builder - caller-supplied parameters → validated, user-scoped queries
//
// Raw parameters arrive as strings (query string, CLI). They are validated here,
// before any store query runs. The user scope is attached separately from the
// resolved identity so no parameter can widen it.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{AnalyticsError, Result};
use crate::models::{category_label, TransactionRecord, UserId};
use crate::period::Period;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Largest accepted rolling window, in periods
pub const MAX_ROLLING_WINDOW: usize = 36;

// ============================================================================
// RAW PARAMETERS
// ============================================================================

/// Unvalidated filter parameters, e.g. `?from=2024-01-01&cards=a,b`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterParams {
    pub from: Option<String>,
    pub to: Option<String>,
    /// Comma-separated card ids
    pub cards: Option<String>,
    pub category: Option<String>,
    /// Reference period for the summary, "YYYY-MM"
    pub as_of: Option<String>,
    /// Rolling window size
    pub window: Option<String>,
}

// ============================================================================
// VALIDATED FILTER
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub card_ids: Vec<String>,
    pub category: Option<String>,
    pub as_of: Option<Period>,
}

impl AnalyticsFilter {
    /// Validate raw parameters. Errors name the failing field.
    pub fn from_params(params: &FilterParams) -> Result<Self> {
        let from = parse_date("from", params.from.as_deref())?;
        let to = parse_date("to", params.to.as_deref())?;

        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(AnalyticsError::invalid_filter(
                    "to",
                    format!("{} is before from={}", to, from),
                ));
            }
        }

        let card_ids = match non_blank(params.cards.as_deref()) {
            Some(raw) => {
                let ids: Vec<String> = raw.split(',').map(|id| id.trim().to_string()).collect();
                if ids.iter().any(|id| id.is_empty()) {
                    return Err(AnalyticsError::invalid_filter(
                        "cards",
                        "empty card id in comma-separated list",
                    ));
                }
                ids
            }
            None => Vec::new(),
        };

        let category = match &params.category {
            Some(raw) if raw.trim().is_empty() => {
                return Err(AnalyticsError::invalid_filter("category", "must not be blank"));
            }
            Some(raw) => Some(raw.trim().to_string()),
            None => None,
        };

        let as_of = match non_blank(params.as_of.as_deref()) {
            Some(raw) => Some(
                raw.parse::<Period>()
                    .map_err(|reason| AnalyticsError::invalid_filter("as_of", reason))?,
            ),
            None => None,
        };

        Ok(AnalyticsFilter {
            from,
            to,
            card_ids,
            category,
            as_of,
        })
    }

    /// Attach the resolved identity. This is the only way to build a query.
    pub fn scoped_to(&self, user_id: &UserId) -> TransactionQuery {
        TransactionQuery {
            user_id: user_id.clone(),
            from: self.from,
            to: self.to,
            card_ids: self.card_ids.clone(),
            category: self.category.clone(),
        }
    }
}

/// Rolling window from the raw `window` parameter, `None` when absent
pub fn parse_window(raw: Option<&str>) -> Result<Option<usize>> {
    let Some(raw) = non_blank(raw) else {
        return Ok(None);
    };

    let window: usize = raw
        .parse()
        .map_err(|_| AnalyticsError::invalid_filter("window", format!("'{}' is not a number", raw)))?;

    if window == 0 || window > MAX_ROLLING_WINDOW {
        return Err(AnalyticsError::invalid_filter(
            "window",
            format!("must be between 1 and {}", MAX_ROLLING_WINDOW),
        ));
    }

    Ok(Some(window))
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>> {
    match non_blank(raw) {
        Some(value) => NaiveDate::parse_from_str(value, DATE_FORMAT)
            .map(Some)
            .map_err(|_| {
                AnalyticsError::invalid_filter(field, format!("expected YYYY-MM-DD, got '{}'", value))
            }),
        None => Ok(None),
    }
}

// ============================================================================
// STORE QUERY
// ============================================================================

/// Predicate handed to a store: owner + date range + card selection + category
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionQuery {
    pub user_id: UserId,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub card_ids: Vec<String>,
    /// `UNCATEGORIZED` selects rows without a category
    pub category: Option<String>,
}

impl TransactionQuery {
    /// Query for everything a user owns
    pub fn for_user(user_id: &UserId) -> Self {
        AnalyticsFilter::default().scoped_to(user_id)
    }

    pub fn includes_card(&self, card_id: &str) -> bool {
        self.card_ids.is_empty() || self.card_ids.iter().any(|id| id == card_id)
    }

    pub fn includes_date(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }

    /// Compares labels, so the sentinel also picks up NULL and blank categories
    pub fn includes_category(&self, category: Option<&str>) -> bool {
        match &self.category {
            None => true,
            Some(wanted) => category_label(category) == wanted.as_str(),
        }
    }

    /// Everything except ownership, which the store enforces through its joins
    pub fn matches(&self, record: &TransactionRecord) -> bool {
        self.includes_card(&record.card_id)
            && self.includes_date(record.date)
            && self.includes_category(record.category.as_deref())
    }
}
