// Entity models - users own cards, cards own statements, statements own transactions
//
// The aggregation engine only ever reads `TransactionRecord`, the joined view
// produced by a store for one user.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::period::Period;

/// Label used for transactions without a category
pub const UNCATEGORIZED: &str = "Uncategorized";

// ============================================================================
// IDENTITY
// ============================================================================

/// Resolved identity of the caller. Every store query is scoped by one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// ENTITIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub user_id: String,
    pub name: String,
    /// Chart color, e.g. "#4F46E5"
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub id: String,
    pub card_id: String,
    /// Billing period anchor date
    pub statement_date: NaiveDate,
    pub year: i32,
    pub month: u32,
}

impl Statement {
    pub fn period(&self) -> Period {
        Period {
            year: self.year,
            month: self.month,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Credit,
    Debit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Credit => "CREDIT",
            TransactionType::Debit => "DEBIT",
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CREDIT" => Ok(TransactionType::Credit),
            "DEBIT" => Ok(TransactionType::Debit),
            other => Err(format!("unknown transaction type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub statement_id: String,
    pub date: NaiveDate,
    pub description: String,
    /// Signed amount as printed on the statement
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub category: Option<String>,
}

impl Transaction {
    /// Fields that make two rows the same purchase, ignoring identity
    pub fn content_key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.statement_id,
            self.date,
            self.amount,
            self.transaction_type.as_str(),
            self.description
        )
    }

    /// Hash used to skip re-imported rows.
    /// Identity = id (UUID), Deduplication = hash
    ///
    /// `occurrence` numbers identical rows within one import (0, 1, ...), so two
    /// real purchases with the same content both survive while a re-import of
    /// the same file still collides.
    pub fn compute_idempotency_hash(&self, occurrence: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}|{}", self.content_key(), occurrence));
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// READ VIEW
// ============================================================================

/// Transaction joined with its statement and card, as the engine sees it
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub id: String,
    pub statement_id: String,
    pub card_id: String,
    pub card_name: String,
    pub card_color: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub category: Option<String>,
    pub statement_year: i32,
    pub statement_month: u32,
}

impl TransactionRecord {
    /// Debits count as positive spend, credits net against them
    pub fn net_contribution(&self) -> Decimal {
        let magnitude = self.amount.abs();
        match self.transaction_type {
            TransactionType::Debit => magnitude,
            TransactionType::Credit => -magnitude,
        }
    }

    pub fn category_label(&self) -> &str {
        category_label(self.category.as_deref())
    }

    pub fn statement_period(&self) -> Period {
        Period {
            year: self.statement_year,
            month: self.statement_month,
        }
    }
}

/// Blank and missing categories both land in the sentinel bucket
pub fn category_label(category: Option<&str>) -> &str {
    match category {
        Some(name) if !name.trim().is_empty() => name.trim(),
        _ => UNCATEGORIZED,
    }
}

/// Lexicographic order with the sentinel bucket last
pub fn sort_category_labels(labels: &mut [String]) {
    labels.sort_by(|a, b| {
        (a.as_str() == UNCATEGORIZED, a.as_str()).cmp(&(b.as_str() == UNCATEGORIZED, b.as_str()))
    });
}
