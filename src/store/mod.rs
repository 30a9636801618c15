// Relational store seam
//
// The engine receives an `Arc<dyn TransactionStore>` at construction. Every
// method is a read scoped to one user; implementations must never return rows
// owned by another user.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::filter::TransactionQuery;
use crate::models::{TransactionRecord, UserId};

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Whether the identity maps to a known user
    async fn user_exists(&self, user_id: &UserId) -> Result<bool>;

    /// Joined transaction rows matching the query, ordered by date then id
    async fn fetch_transactions(&self, query: &TransactionQuery) -> Result<Vec<TransactionRecord>>;

    /// Cards owned by the user within the query's card selection
    async fn count_cards(&self, query: &TransactionQuery) -> Result<usize>;

    /// Statements on the selected cards whose statement date falls in the range
    async fn count_statements(&self, query: &TransactionQuery) -> Result<usize>;

    /// Distinct raw categories across the user's transactions (None = uncategorized)
    async fn distinct_categories(&self, user_id: &UserId) -> Result<Vec<Option<String>>>;
}
